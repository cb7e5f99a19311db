//! Named traffic profiles
//!
//! A [`Catalog`] is a baseline action plus a weighted action set. The two
//! built-in catalogs drive the same engine and differ only in data:
//!
//! - `demo` targets the generic error and byte-size endpoints
//! - `hello` targets the application's `/hello` endpoint

use std::collections::BTreeMap;

use serde_json::json;

use crate::action::{Action, PathParam};
use crate::error::{ProfileError, Result};
use crate::weighted::{WeightedAction, WeightedActionSet};

/// Client error codes requested by the `clientErrors` actions
pub const CLIENT_ERROR_CODES: [u64; 3] = [400, 403, 404];

/// Server error codes requested by the `serverErrors` actions
pub const SERVER_ERROR_CODES: [u64; 2] = [500, 503];

/// Smallest response size requested by `responseSize`
pub const MIN_RESPONSE_SIZE: u64 = 100;

/// Largest response size requested by `responseSize`
pub const MAX_RESPONSE_SIZE: u64 = 500_000;

/// Names accepted by [`Catalog::builtin`]
pub const BUILTIN_CATALOGS: [&str; 2] = ["demo", "hello"];

/// Baseline action name shared by the built-in catalogs
pub const INDEX_ACTION: &str = "index";

#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    baseline: Action,
    actions: WeightedActionSet,
}

impl Catalog {
    pub fn new(
        name: impl Into<String>,
        baseline: Action,
        actions: WeightedActionSet,
    ) -> Result<Self> {
        baseline.validate()?;
        Ok(Self {
            name: name.into(),
            baseline,
            actions,
        })
    }

    /// Look up a built-in catalog by name
    pub fn builtin(name: &str) -> Result<Self> {
        match name {
            "demo" => Self::demo(),
            "hello" => Self::hello(),
            other => Err(ProfileError::UnknownCatalog(other.to_string())),
        }
    }

    /// Generic error and byte-size endpoints
    pub fn demo() -> Result<Self> {
        let actions = WeightedActionSet::from_pairs([
            (index(), 3),
            (
                Action::get("clientErrors", "/httpbin/status/{code}")
                    .with_param(PathParam::one_of(&CLIENT_ERROR_CODES)),
                6,
            ),
            (
                Action::get("serverErrors", "/httpbin/status/{code}")
                    .with_param(PathParam::one_of(&SERVER_ERROR_CODES)),
                4,
            ),
            (
                Action::get("responseSize", "/httpbin/bytes/{n}")
                    .with_param(PathParam::range(MIN_RESPONSE_SIZE, MAX_RESPONSE_SIZE)),
                2,
            ),
        ])?;

        Self::new("demo", index(), actions)
    }

    /// Application `/hello` endpoint, GET and POST
    pub fn hello() -> Result<Self> {
        let actions = WeightedActionSet::from_pairs([
            (index(), 1),
            (Action::get("helloWorld", "/hello"), 6),
            (
                Action::post("sayHello", "/hello").with_json_body(json!({ "who": "John" })),
                6,
            ),
            (
                Action::get("clientErrors", "/errors/{code}")
                    .with_param(PathParam::one_of(&CLIENT_ERROR_CODES)),
                3,
            ),
            (
                Action::get("serverErrors", "/errors/{code}")
                    .with_param(PathParam::one_of(&SERVER_ERROR_CODES)),
                2,
            ),
        ])?;

        Self::new("hello", index(), actions)
    }

    /// Custom catalog whose baseline is the `index` entry when present,
    /// `GET /` otherwise.
    pub fn custom(name: impl Into<String>, entries: Vec<WeightedAction>) -> Result<Self> {
        let baseline = entries
            .iter()
            .find(|e| e.action.name == INDEX_ACTION)
            .map(|e| e.action.clone())
            .unwrap_or_else(index);
        Self::new(name, baseline, WeightedActionSet::new(entries)?)
    }

    /// Copy of this catalog with some weights replaced by action name
    pub fn with_weights(&self, overrides: &BTreeMap<String, u32>) -> Result<Self> {
        Ok(Self {
            name: self.name.clone(),
            baseline: self.baseline.clone(),
            actions: self.actions.with_weights(overrides)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Action performed once when a session starts
    pub fn baseline(&self) -> &Action {
        &self.baseline
    }

    pub fn actions(&self) -> &WeightedActionSet {
        &self.actions
    }
}

fn index() -> Action {
    Action::get(INDEX_ACTION, "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::HttpMethod;

    fn weights(catalog: &Catalog) -> Vec<(String, u32)> {
        catalog
            .actions()
            .iter()
            .map(|e| (e.action.name.clone(), e.weight))
            .collect()
    }

    #[test]
    fn test_demo_catalog_weights() {
        let catalog = Catalog::demo().unwrap();
        assert_eq!(catalog.name(), "demo");
        assert_eq!(catalog.actions().total_weight(), 15);
        assert_eq!(
            weights(&catalog),
            vec![
                ("index".to_string(), 3),
                ("clientErrors".to_string(), 6),
                ("serverErrors".to_string(), 4),
                ("responseSize".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_hello_catalog_weights() {
        let catalog = Catalog::hello().unwrap();
        assert_eq!(catalog.actions().total_weight(), 18);
        assert_eq!(
            weights(&catalog),
            vec![
                ("index".to_string(), 1),
                ("helloWorld".to_string(), 6),
                ("sayHello".to_string(), 6),
                ("clientErrors".to_string(), 3),
                ("serverErrors".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_builtin_baseline_is_index() {
        for name in BUILTIN_CATALOGS {
            let catalog = Catalog::builtin(name).unwrap();
            assert_eq!(catalog.baseline().name, INDEX_ACTION);
            assert_eq!(catalog.baseline().method, HttpMethod::Get);
            assert_eq!(catalog.baseline().path, "/");
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert_eq!(
            Catalog::builtin("nope").unwrap_err(),
            ProfileError::UnknownCatalog("nope".to_string())
        );
    }

    #[test]
    fn test_say_hello_payload() {
        let catalog = Catalog::hello().unwrap();
        let say_hello = &catalog.actions().get("sayHello").unwrap().action;

        assert_eq!(say_hello.method, HttpMethod::Post);
        assert_eq!(say_hello.body, Some(json!({ "who": "John" })));
        assert_eq!(
            say_hello.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_custom_catalog_baseline() {
        let with_index = Catalog::custom(
            "custom",
            vec![
                WeightedAction::new(Action::get("index", "/home"), 1),
                WeightedAction::new(Action::get("other", "/other"), 1),
            ],
        )
        .unwrap();
        assert_eq!(with_index.baseline().path, "/home");

        let without_index = Catalog::custom(
            "custom",
            vec![WeightedAction::new(Action::get("other", "/other"), 1)],
        )
        .unwrap();
        assert_eq!(without_index.baseline().path, "/");
    }

    #[test]
    fn test_all_zero_override_rejected() {
        let catalog = Catalog::hello().unwrap();
        let overrides: BTreeMap<String, u32> = weights(&catalog)
            .into_iter()
            .map(|(name, _)| (name, 0))
            .collect();

        assert_eq!(
            catalog.with_weights(&overrides).unwrap_err(),
            ProfileError::NoPositiveWeight
        );
    }
}
