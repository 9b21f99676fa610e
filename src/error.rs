//! Error taxonomy for the pipeline engine.
//!
//! Two layers: `StoreError` at the data-store boundary (transport and query
//! failures), `EngineError` at the engine boundary (what callers see).
//! Audit-record failures are deliberately NOT part of this taxonomy: the
//! primary transition commits independently of the advisory side-effect, so
//! they surface as an outcome field plus a warn log (see `transition`).

use thiserror::Error;

/// Errors from the data-store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("query rejected: {0}")]
    Query(String),

    #[error("response decode failed: {0}")]
    Decode(String),
}

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Read-path failure. The previous in-memory collection stays untouched.
    #[error("data access failed: {0}")]
    DataAccess(#[from] StoreError),

    /// Write failure on a lifecycle operation. The transition is aborted and
    /// no refresh is triggered.
    #[error("transition failed: {0}")]
    Transition(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Short message for the user-facing notification toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            EngineError::DataAccess(_) => "Failed to load opportunities",
            EngineError::Transition(_) => "Failed to mark opportunity as won",
            EngineError::Config(_) => "Configuration problem: check ~/.dealboard/config.json",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_converts_to_data_access() {
        let err: EngineError = StoreError::Transport("connection refused".into()).into();
        assert!(matches!(err, EngineError::DataAccess(_)));
        assert_eq!(err.user_message(), "Failed to load opportunities");
    }

    #[test]
    fn test_error_messages_include_cause() {
        let err = EngineError::Transition("update rejected".into());
        assert!(err.to_string().contains("update rejected"));
    }
}
