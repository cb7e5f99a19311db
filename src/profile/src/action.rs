//! Request actions and their path parameters
//!
//! An [`Action`] is a data-only request template. Its path may contain a single
//! `{placeholder}` segment which is filled from a [`PathParam`] every time the
//! action is rendered, so one action can exercise several server code paths.

use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};

/// HTTP methods an action can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl Default for HttpMethod {
    fn default() -> Self {
        HttpMethod::Get
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the randomized path segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PathParam {
    /// Uniformly chosen from a fixed set of literal values
    OneOf { values: Vec<u64> },

    /// Uniformly chosen integer in `[min, max]`, both ends inclusive
    Range { min: u64, max: u64 },
}

impl PathParam {
    pub fn one_of(values: &[u64]) -> Self {
        PathParam::OneOf {
            values: values.to_vec(),
        }
    }

    pub fn range(min: u64, max: u64) -> Self {
        PathParam::Range { min, max }
    }

    /// Draw a value. Returns `None` for an empty `OneOf` or an inverted range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u64> {
        match self {
            PathParam::OneOf { values } => values.choose(rng).copied(),
            PathParam::Range { min, max } if min <= max => Some(rng.gen_range(*min..=*max)),
            PathParam::Range { .. } => None,
        }
    }

    /// Whether `value` is a possible outcome of [`PathParam::sample`]
    pub fn contains(&self, value: u64) -> bool {
        match self {
            PathParam::OneOf { values } => values.contains(&value),
            PathParam::Range { min, max } => (*min..=*max).contains(&value),
        }
    }

    fn validate(&self, action: &str) -> Result<()> {
        match self {
            PathParam::OneOf { values } if values.is_empty() => Err(
                ProfileError::invalid_action(action, "one_of parameter has no values"),
            ),
            PathParam::Range { min, max } if min > max => Err(ProfileError::invalid_action(
                action,
                format!("range parameter is inverted ({} > {})", min, max),
            )),
            _ => Ok(()),
        }
    }
}

/// A named HTTP request template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Label used for selection, statistics and logs
    pub name: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Request path, optionally containing one `{placeholder}` segment
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<PathParam>,

    /// JSON payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Action {
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
            param: None,
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Get, path)
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Post, path)
    }

    pub fn with_param(mut self, param: PathParam) -> Self {
        self.param = Some(param);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a JSON body and the matching `content-type` header
    pub fn with_json_body(self, body: serde_json::Value) -> Self {
        let mut action = self.with_header("content-type", "application/json");
        action.body = Some(body);
        action
    }

    /// Check that the template is renderable.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::invalid_action(&self.name, "name is empty"));
        }

        if !self.path.starts_with('/') {
            return Err(ProfileError::invalid_action(
                &self.name,
                format!("path '{}' must start with '/'", self.path),
            ));
        }

        let placeholders = self.path.matches('{').count();
        if placeholders > 1 {
            return Err(ProfileError::invalid_action(
                &self.name,
                "path contains more than one placeholder",
            ));
        }

        match (placeholder_span(&self.path), &self.param) {
            (Some(_), Some(param)) => param.validate(&self.name),
            (None, None) if placeholders == 0 => Ok(()),
            (None, None) => Err(ProfileError::invalid_action(
                &self.name,
                "path contains an unterminated placeholder",
            )),
            (Some(_), None) => Err(ProfileError::invalid_action(
                &self.name,
                "path has a placeholder but no parameter",
            )),
            (None, Some(_)) => Err(ProfileError::invalid_action(
                &self.name,
                "parameter given but path has no placeholder",
            )),
        }
    }

    /// Produce a concrete request, drawing the path parameter if there is one.
    pub fn render<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RenderedRequest> {
        let path = match (&self.param, placeholder_span(&self.path)) {
            (Some(param), Some((start, end))) => {
                let value = param.sample(rng).ok_or_else(|| {
                    ProfileError::invalid_action(&self.name, "parameter has no possible value")
                })?;
                format!("{}{}{}", &self.path[..start], value, &self.path[end..])
            }
            (None, None) => self.path.clone(),
            _ => {
                return Err(ProfileError::invalid_action(
                    &self.name,
                    "path placeholder and parameter do not match",
                ))
            }
        };

        let body = self
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ProfileError::invalid_action(&self.name, e.to_string()))?;

        Ok(RenderedRequest {
            action: self.name.clone(),
            method: self.method,
            path,
            body,
            headers: self
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }
}

/// A fully resolved request, ready for a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRequest {
    pub action: String,
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
}

impl RenderedRequest {
    /// Last path segment parsed as an integer, if any
    pub fn trailing_number(&self) -> Option<u64> {
        self.path.rsplit('/').next()?.parse().ok()
    }
}

/// Byte span of `{...}` in `path`, closing brace included
fn placeholder_span(path: &str) -> Option<(usize, usize)> {
    let start = path.find('{')?;
    let end = path[start..].find('}')? + start + 1;
    Some((start, end))
}
