//! Error types for console sessions.
//!
//! The session layer is a thin orchestrator: evaluator, extractor and audit
//! failures are carried through unchanged inside [`SessionError`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session is registered under the given id.
    #[error("Session not found: {id}")]
    NotFound {
        /// The requested id.
        id: String,
    },

    /// The given string is not a well-formed session id.
    #[error("Invalid session id: '{id}'")]
    InvalidId {
        /// The rejected input.
        id: String,
    },

    /// A session was requested with no candidate bindings.
    #[error("Cannot create a session without bindings")]
    NoBindings,

    /// A binding index outside the candidate list.
    #[error("Binding index {index} out of range (session has {len} bindings)")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of candidate bindings.
        len: usize,
    },

    /// The evaluator failed.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The context extractor failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The audit sink failed.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates an invalid id error.
    #[must_use]
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId { id: id.into() }
    }

    /// True when the caller should start a new session.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidId { .. })
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::NotFound { id } => {
                map.insert("type".to_string(), serde_json::json!("SessionNotFound"));
                map.insert("id".to_string(), serde_json::json!(id));
            }
            Self::InvalidId { id } => {
                map.insert("type".to_string(), serde_json::json!("InvalidSessionId"));
                map.insert("id".to_string(), serde_json::json!(id));
            }
            Self::NoBindings => {
                map.insert("type".to_string(), serde_json::json!("NoBindings"));
            }
            Self::IndexOutOfRange { index, len } => {
                map.insert("type".to_string(), serde_json::json!("IndexOutOfRange"));
                map.insert("index".to_string(), serde_json::json!(index));
                map.insert("len".to_string(), serde_json::json!(len));
            }
            Self::Evaluation(err) => {
                map.insert("type".to_string(), serde_json::json!("EvaluationError"));
                map.insert("kind".to_string(), serde_json::json!(err.kind));
                map.insert("backtrace".to_string(), serde_json::json!(err.backtrace));
            }
            Self::Extract(err) => {
                map.insert("type".to_string(), serde_json::json!("ExtractError"));
                map.insert("path".to_string(), serde_json::json!(err.path));
            }
            Self::Audit(_) => {
                map.insert("type".to_string(), serde_json::json!("AuditError"));
            }
            Self::Config(_) => {
                map.insert("type".to_string(), serde_json::json!("ConfigError"));
            }
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// A structured failure raised by an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct EvaluationError {
    /// Error class or category (e.g. "NameError").
    pub kind: String,
    /// Human readable message.
    pub message: String,
    /// Frames of the failing evaluation, innermost first.
    #[serde(default)]
    pub backtrace: Vec<String>,
}

impl EvaluationError {
    /// Creates a new evaluation error.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            backtrace: Vec::new(),
        }
    }

    /// Sets the backtrace.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: Vec<String>) -> Self {
        self.backtrace = backtrace;
        self
    }

    /// Renders the error the way a console prints it.
    ///
    /// The first line is `Kind: message`, followed by one tab-indented
    /// `from <frame>` line per backtrace entry.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = format!("{}: {}\n", self.kind, self.message);
        for frame in &self.backtrace {
            out.push_str("\tfrom ");
            out.push_str(frame);
            out.push('\n');
        }
        out
    }
}

/// Error raised when a value cannot be extracted from a binding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot inspect '{path}': {reason}")]
pub struct ExtractError {
    /// The object path that was requested.
    pub path: String,
    /// Why extraction failed.
    pub reason: String,
}

impl ExtractError {
    /// Creates a new extract error.
    #[must_use]
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors related to audit persistence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// The backend rejected the record.
    #[error("Audit write to '{record_type}' failed: {reason}")]
    WriteFailed {
        /// Target record type.
        record_type: String,
        /// Backend supplied reason.
        reason: String,
    },

    /// The backend is not reachable.
    #[error("Audit backend unavailable: {0}")]
    Unavailable(String),
}

impl AuditError {
    /// Creates a write failed error.
    #[must_use]
    pub fn write_failed(record_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            record_type: record_type.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_error_report() {
        let err = EvaluationError::new("NameError", "undefined local variable `y`")
            .with_backtrace(vec!["(console):1".to_string(), "app.rb:12".to_string()]);

        assert_eq!(
            err.report(),
            "NameError: undefined local variable `y`\n\tfrom (console):1\n\tfrom app.rb:12\n"
        );
        assert_eq!(err.to_string(), "NameError: undefined local variable `y`");
    }

    #[test]
    fn test_evaluation_error_is_transparent() {
        let err: SessionError = EvaluationError::new("ZeroDivisionError", "divided by 0").into();
        assert_eq!(err.to_string(), "ZeroDivisionError: divided by 0");
        assert!(matches!(err, SessionError::Evaluation(ref e) if e.kind == "ZeroDivisionError"));
    }

    #[test]
    fn test_not_found_to_dict() {
        let err = SessionError::not_found("abc");
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "SessionNotFound");
        assert_eq!(dict.get("id").unwrap(), "abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_index_out_of_range_message() {
        let err = SessionError::IndexOutOfRange { index: 4, len: 2 };
        assert!(err.to_string().contains("index 4"));
        assert!(!err.is_not_found());
        assert_eq!(err.to_dict().get("len").unwrap(), 2);
    }

    #[test]
    fn test_audit_error_display() {
        let err = AuditError::write_failed("ConsoleHistory", "disk full");
        assert_eq!(err.to_string(), "Audit write to 'ConsoleHistory' failed: disk full");
    }
}
