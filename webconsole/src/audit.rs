//! Audit history for evaluations.
//!
//! When configured, every successful evaluation appends one record to an
//! external append-only sink. The record type and column names come from
//! [`AuditConfig`]; the sink decides how and where records are stored.

use crate::errors::AuditError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Names the record type and columns evaluation history is written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Record type (table, model or stream name).
    #[serde(default = "default_record_type")]
    pub record_type: String,
    /// Column receiving the submitted input.
    #[serde(default = "default_input_column")]
    pub input_column: String,
    /// Column receiving the evaluator output.
    #[serde(default = "default_result_column")]
    pub result_column: String,
    /// Column receiving the acting user's id.
    #[serde(default = "default_actor_id_column")]
    pub actor_id_column: String,
}

fn default_record_type() -> String {
    "ConsoleHistory".to_string()
}

fn default_input_column() -> String {
    "input".to_string()
}

fn default_result_column() -> String {
    "result".to_string()
}

fn default_actor_id_column() -> String {
    "actor_id".to_string()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            record_type: default_record_type(),
            input_column: default_input_column(),
            result_column: default_result_column(),
            actor_id_column: default_actor_id_column(),
        }
    }
}

impl AuditConfig {
    /// Creates a config targeting `record_type` with default column names.
    #[must_use]
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            ..Self::default()
        }
    }

    /// Sets the three column names.
    #[must_use]
    pub fn with_columns(
        mut self,
        input: impl Into<String>,
        result: impl Into<String>,
        actor_id: impl Into<String>,
    ) -> Self {
        self.input_column = input.into();
        self.result_column = result.into();
        self.actor_id_column = actor_id.into();
        self
    }
}

/// One row of evaluation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Target record type.
    pub record_type: String,
    /// Column values keyed by column name.
    pub columns: serde_json::Map<String, serde_json::Value>,
    /// When the evaluation completed.
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Returns the value of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.columns.get(column)
    }
}

/// Append-only destination for audit records.
#[cfg_attr(test, mockall::automock)]
pub trait AuditSink: Send + Sync {
    /// Appends one record.
    fn create(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// A configured audit pipeline: column mapping plus sink.
#[derive(Clone)]
pub struct AuditLog {
    config: AuditConfig,
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    /// Creates a new audit log.
    #[must_use]
    pub fn new(config: AuditConfig, sink: Arc<dyn AuditSink>) -> Self {
        Self { config, sink }
    }

    /// Returns the column mapping.
    #[must_use]
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Builds the record for one evaluation.
    #[must_use]
    pub fn build_record(&self, input: &str, output: &str, actor: Option<&str>) -> AuditRecord {
        let mut columns = serde_json::Map::new();
        columns.insert(self.config.input_column.clone(), serde_json::json!(input));
        columns.insert(self.config.result_column.clone(), serde_json::json!(output));
        columns.insert(self.config.actor_id_column.clone(), serde_json::json!(actor));

        AuditRecord {
            record_type: self.config.record_type.clone(),
            columns,
            recorded_at: Utc::now(),
        }
    }

    /// Appends the record for one evaluation.
    pub fn record(&self, input: &str, output: &str, actor: Option<&str>) -> Result<(), AuditError> {
        let record = self.build_record(input, output, actor);
        self.sink.create(&record).inspect_err(|err| {
            warn!(
                record_type = %self.config.record_type,
                error = %err,
                "Audit write failed"
            );
        })?;
        debug!(record_type = %self.config.record_type, "Audit record appended");
        Ok(())
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A sink that keeps records in memory.
#[derive(Debug, Default)]
pub struct CollectingAuditSink {
    records: parking_lot::RwLock<Vec<AuditRecord>>,
}

impl CollectingAuditSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected records.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    /// Returns the number of collected records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no records have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Clears all collected records.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl AuditSink for CollectingAuditSink {
    fn create(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records.write().push(record.clone());
        Ok(())
    }
}

/// A sink that writes records to the tracing framework.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAuditSink;

impl AuditSink for LoggingAuditSink {
    fn create(&self, record: &AuditRecord) -> Result<(), AuditError> {
        info!(
            record_type = %record.record_type,
            columns = %serde_json::Value::Object(record.columns.clone()),
            recorded_at = %record.recorded_at.to_rfc3339(),
            "Console evaluation"
        );
        Ok(())
    }
}
