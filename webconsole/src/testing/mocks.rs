//! In-memory collaborators for exercising sessions.

use crate::audit::{AuditRecord, AuditSink};
use crate::binding::{
    ContextExtractor, Evaluator, EvaluatorFactory, ExceptionMapper, MappedException,
};
use crate::errors::{AuditError, EvaluationError, ExtractError};
use crate::factory::SessionFactory;
use crate::registry::SessionRegistry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A binding backed by a map of integer locals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapBinding {
    /// Frame label, used in backtraces.
    pub frame: String,
    /// Local variables visible in this frame.
    pub locals: BTreeMap<String, i64>,
}

impl MapBinding {
    /// Creates a binding with no locals.
    #[must_use]
    pub fn new(frame: impl Into<String>) -> Self {
        Self {
            frame: frame.into(),
            locals: BTreeMap::new(),
        }
    }

    /// Adds a local.
    #[must_use]
    pub fn with_local(mut self, name: impl Into<String>, value: i64) -> Self {
        self.locals.insert(name.into(), value);
        self
    }
}

/// Evaluates `a + b + ...` sums and `name = expr` assignments.
///
/// Assigned names live in the evaluator, not in the binding, and shadow the
/// binding's locals.
#[derive(Debug)]
pub struct ScriptedEvaluator {
    binding: MapBinding,
    locals: BTreeMap<String, i64>,
    released: Option<Arc<AtomicUsize>>,
}

impl ScriptedEvaluator {
    /// Creates an evaluator over a snapshot of `binding`.
    #[must_use]
    pub fn new(binding: &MapBinding) -> Self {
        Self {
            binding: binding.clone(),
            locals: BTreeMap::new(),
            released: None,
        }
    }

    /// Counts calls to [`Evaluator::release`] in `counter`.
    #[must_use]
    pub fn with_release_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.released = Some(counter);
        self
    }

    fn error(&self, kind: &str, message: String) -> EvaluationError {
        EvaluationError::new(kind, message)
            .with_backtrace(vec!["(console):1".to_string(), self.binding.frame.clone()])
    }

    fn term(&self, term: &str) -> Result<i64, EvaluationError> {
        let term = term.trim();
        if let Ok(value) = term.parse::<i64>() {
            return Ok(value);
        }
        if !is_identifier(term) {
            return Err(self.error("SyntaxError", format!("unexpected '{term}'")));
        }
        self.locals
            .get(term)
            .or_else(|| self.binding.locals.get(term))
            .copied()
            .ok_or_else(|| {
                self.error(
                    "NameError",
                    format!("undefined local variable or method `{term}`"),
                )
            })
    }

    fn sum(&self, expr: &str) -> Result<i64, EvaluationError> {
        expr.split('+').try_fold(0i64, |acc, term| {
            let value = self.term(term)?;
            acc.checked_add(value)
                .ok_or_else(|| self.error("RangeError", "integer overflow".to_string()))
        })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(&mut self, input: &str) -> Result<String, EvaluationError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok("nil".to_string());
        }

        if let Some((name, expr)) = input.split_once('=') {
            let name = name.trim();
            if is_identifier(name) {
                let value = self.sum(expr)?;
                self.locals.insert(name.to_string(), value);
                return Ok(value.to_string());
            }
        }

        self.sum(input).map(|value| value.to_string())
    }

    fn release(&mut self) {
        self.locals.clear();
        if let Some(counter) = &self.released {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Evaluator factory producing [`ScriptedEvaluator`]s.
#[must_use]
pub fn scripted_evaluators() -> Arc<dyn EvaluatorFactory<MapBinding>> {
    Arc::new(|binding: &MapBinding| -> Box<dyn Evaluator> {
        Box::new(ScriptedEvaluator::new(binding))
    })
}

/// Like [`scripted_evaluators`], counting released evaluators in `counter`.
#[must_use]
pub fn release_counting_evaluators(
    counter: Arc<AtomicUsize>,
) -> Arc<dyn EvaluatorFactory<MapBinding>> {
    Arc::new(move |binding: &MapBinding| -> Box<dyn Evaluator> {
        Box::new(ScriptedEvaluator::new(binding).with_release_counter(Arc::clone(&counter)))
    })
}

/// Extracts locals from a [`MapBinding`].
///
/// An empty path describes the whole frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapExtractor;

impl ContextExtractor<MapBinding> for MapExtractor {
    fn extract(&self, binding: &MapBinding, path: &str) -> Result<serde_json::Value, ExtractError> {
        let path = path.trim();
        if path.is_empty() {
            return Ok(serde_json::json!({
                "frame": binding.frame,
                "locals": binding.locals,
            }));
        }

        binding
            .locals
            .get(path)
            .map(|value| {
                serde_json::json!({
                    "name": path,
                    "type": "Integer",
                    "value": value,
                })
            })
            .ok_or_else(|| ExtractError::new(path, "no such local"))
    }
}

/// Shared [`MapExtractor`].
#[must_use]
pub fn map_extractor() -> Arc<dyn ContextExtractor<MapBinding>> {
    Arc::new(MapExtractor)
}

/// An exception with one binding per frame and an optional cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameException {
    /// Exception id.
    pub id: String,
    /// Frame bindings, outermost first.
    pub frames: Vec<MapBinding>,
    /// The exception that caused this one.
    pub cause: Option<Box<FrameException>>,
}

impl FrameException {
    /// Creates an exception without a cause.
    #[must_use]
    pub fn new(id: impl Into<String>, frames: Vec<MapBinding>) -> Self {
        Self {
            id: id.into(),
            frames,
            cause: None,
        }
    }

    /// Sets the cause.
    #[must_use]
    pub fn with_cause(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// Maps a [`FrameException`] and its causes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMapper;

impl ExceptionMapper<MapBinding, FrameException> for FrameMapper {
    fn follow(&self, exception: &FrameException) -> Vec<MappedException<MapBinding>> {
        let mut chain = Vec::new();
        let mut current = Some(exception);
        while let Some(exception) = current {
            chain.push(MappedException::new(&exception.id, exception.frames.clone()));
            current = exception.cause.as_deref();
        }
        chain
    }
}

/// An audit sink whose backend is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn create(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Err(AuditError::Unavailable("audit store offline".to_string()))
    }
}

/// A factory over a fresh registry using the collaborators above.
#[must_use]
pub fn factory() -> SessionFactory<MapBinding, FrameException> {
    SessionFactory::new(
        Arc::new(SessionRegistry::new()),
        scripted_evaluators(),
        map_extractor(),
        Arc::new(FrameMapper),
    )
}
