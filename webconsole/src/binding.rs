//! Collaborator seams: evaluators, extractors, exception mappers and captures.
//!
//! A binding `B` is an opaque captured execution context. The session layer
//! never looks inside it; it only hands it to the collaborators below.

use crate::errors::{EvaluationError, ExtractError};
use std::collections::HashMap;
use std::fmt;

/// Capture key holding a preserved exception.
pub const EXCEPTION_KEY: &str = "__web_console_exception";

/// Capture key holding a single preserved binding.
pub const BINDING_KEY: &str = "__web_console_binding";

/// Evaluates code fragments against one binding.
///
/// An evaluator may keep state between calls (locals defined by earlier
/// input). That state belongs to this evaluator only.
pub trait Evaluator: Send {
    /// Evaluates `input` and returns its textual result.
    fn evaluate(&mut self, input: &str) -> Result<String, EvaluationError>;

    /// Releases anything the evaluator holds.
    ///
    /// Called exactly once, right before the session drops the evaluator:
    /// on a switch, or when the session itself is dropped.
    fn release(&mut self) {}
}

/// Builds evaluators bound to a binding.
pub trait EvaluatorFactory<B>: Send + Sync {
    /// Creates a fresh evaluator for `binding`.
    fn create(&self, binding: &B) -> Box<dyn Evaluator>;
}

impl<B, F> EvaluatorFactory<B> for F
where
    F: Fn(&B) -> Box<dyn Evaluator> + Send + Sync,
{
    fn create(&self, binding: &B) -> Box<dyn Evaluator> {
        self(binding)
    }
}

/// Describes values reachable from a binding.
pub trait ContextExtractor<B>: Send + Sync {
    /// Returns descriptive data for the object at `path`.
    fn extract(&self, binding: &B, path: &str) -> Result<serde_json::Value, ExtractError>;
}

/// One exception of a chain together with its candidate bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedException<B> {
    /// Identifier the client uses to select this exception.
    pub exception_id: Option<String>,
    /// Candidate bindings, one per frame, outermost frame first.
    pub bindings: Vec<B>,
}

impl<B> MappedException<B> {
    /// Wraps bindings that do not belong to any exception.
    #[must_use]
    pub fn anonymous(bindings: Vec<B>) -> Self {
        Self {
            exception_id: None,
            bindings,
        }
    }

    /// Creates a mapped exception with an id.
    #[must_use]
    pub fn new(exception_id: impl Into<String>, bindings: Vec<B>) -> Self {
        Self {
            exception_id: Some(exception_id.into()),
            bindings,
        }
    }

    /// True if this entry carries the given exception id.
    #[must_use]
    pub fn is(&self, exception_id: &str) -> bool {
        self.exception_id.as_deref() == Some(exception_id)
    }
}

/// Turns a caught exception into candidate bindings.
pub trait ExceptionMapper<B, X>: Send + Sync {
    /// Maps `exception` and each of its causes, outermost exception first.
    fn follow(&self, exception: &X) -> Vec<MappedException<B>>;
}

/// A value preserved in a capture.
#[derive(Debug, Clone)]
pub enum Preserved<B, X> {
    /// A caught exception.
    Exception(X),
    /// A single binding.
    Binding(B),
}

/// Request-scoped key-value storage a session can be created from.
///
/// Only [`EXCEPTION_KEY`] and [`BINDING_KEY`] are consulted by the factory;
/// other keys are carried along untouched.
pub struct Capture<B, X> {
    entries: HashMap<String, Preserved<B, X>>,
}

impl<B, X> Default for Capture<B, X> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<B, X> Capture<B, X> {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preserves an exception under [`EXCEPTION_KEY`].
    #[must_use]
    pub fn with_exception(mut self, exception: X) -> Self {
        self.insert(EXCEPTION_KEY, Preserved::Exception(exception));
        self
    }

    /// Preserves a binding under [`BINDING_KEY`].
    #[must_use]
    pub fn with_binding(mut self, binding: B) -> Self {
        self.insert(BINDING_KEY, Preserved::Binding(binding));
        self
    }

    /// Stores a value under an arbitrary key.
    pub fn insert(&mut self, key: impl Into<String>, value: Preserved<B, X>) {
        self.entries.insert(key.into(), value);
    }

    /// Looks up a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Preserved<B, X>> {
        self.entries.get(key)
    }

    /// The preserved exception, if any.
    #[must_use]
    pub fn exception(&self) -> Option<&X> {
        match self.get(EXCEPTION_KEY) {
            Some(Preserved::Exception(exception)) => Some(exception),
            _ => None,
        }
    }

    /// The preserved binding, if any.
    #[must_use]
    pub fn binding(&self) -> Option<&B> {
        match self.get(BINDING_KEY) {
            Some(Preserved::Binding(binding)) => Some(binding),
            _ => None,
        }
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<B, X> fmt::Debug for Capture<B, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("Capture").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_lookup_by_well_known_keys() {
        let capture: Capture<&str, String> = Capture::new()
            .with_exception("boom".to_string())
            .with_binding("frame");

        assert_eq!(capture.exception().map(String::as_str), Some("boom"));
        assert_eq!(capture.binding(), Some(&"frame"));
    }

    #[test]
    fn test_capture_ignores_mismatched_variant() {
        let mut capture: Capture<&str, String> = Capture::new();
        capture.insert(EXCEPTION_KEY, Preserved::Binding("frame"));

        assert!(capture.exception().is_none());
        assert!(capture.binding().is_none());
        assert!(!capture.is_empty());
    }

    #[test]
    fn test_empty_capture() {
        let capture: Capture<u8, u8> = Capture::new();
        assert!(capture.is_empty());
        assert_eq!(format!("{capture:?}"), "Capture { keys: [] }");
    }

    #[test]
    fn test_mapped_exception_ids() {
        let mapped = MappedException::new("42", vec![1, 2]);
        assert!(mapped.is("42"));
        assert!(!mapped.is("7"));
        assert!(!MappedException::anonymous(vec![1]).is("42"));
    }

    #[test]
    fn test_closure_is_an_evaluator_factory() {
        struct Echo;
        impl Evaluator for Echo {
            fn evaluate(&mut self, input: &str) -> Result<String, EvaluationError> {
                Ok(input.to_string())
            }
        }

        let factory = |_: &u8| -> Box<dyn Evaluator> { Box::new(Echo) };
        let mut evaluator = EvaluatorFactory::create(&factory, &0);
        assert_eq!(evaluator.evaluate("hi").unwrap(), "hi");
    }
}
