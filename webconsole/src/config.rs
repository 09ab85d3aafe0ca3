//! Console configuration.

use crate::audit::AuditConfig;
use crate::errors::SessionError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the session layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Evaluation history target. Auditing is off when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditConfig>,
}

impl ConsoleConfig {
    /// Creates a configuration with auditing disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables auditing.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditConfig) -> Self {
        self.audit = Some(audit);
        self
    }

    /// True when an audit target is configured.
    #[must_use]
    pub fn audit_enabled(&self) -> bool {
        self.audit.is_some()
    }

    /// Parses a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, SessionError> {
        serde_json::from_str(raw).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }
}
