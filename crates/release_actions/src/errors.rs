//! Error types for release action parameters.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised while reading release action inputs.
///
/// Building parameters is infallible once the inputs are typed; the only
/// failures come from turning raw strings into those types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration { input: String, reason: String },
}

impl ActionError {
    pub(crate) fn invalid_duration(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;
