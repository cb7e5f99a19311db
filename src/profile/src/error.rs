//! Error types for traffic profiles

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProfileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("Weighted action set is empty")]
    EmptyActionSet,

    #[error("No action has a positive weight")]
    NoPositiveWeight,

    #[error("Duplicate action name: {0}")]
    DuplicateAction(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Unknown catalog: {0}")]
    UnknownCatalog(String),

    #[error("Invalid action '{action}': {reason}")]
    InvalidAction { action: String, reason: String },
}

impl ProfileError {
    pub(crate) fn invalid_action(action: &str, reason: impl Into<String>) -> Self {
        ProfileError::InvalidAction {
            action: action.to_string(),
            reason: reason.into(),
        }
    }
}
