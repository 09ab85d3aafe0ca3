//! The session entity: one console conversation over a set of bindings.

use crate::audit::AuditLog;
use crate::binding::{ContextExtractor, Evaluator, EvaluatorFactory, MappedException};
use crate::errors::SessionError;
use crate::id::SessionId;
use crate::observability::EvalTimer;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The evaluator currently in use and the binding it is bound to.
struct ActiveBinding {
    /// Position in the exception chain.
    exception: usize,
    /// Position in that exception's bindings.
    index: usize,
    evaluator: Box<dyn Evaluator>,
}

/// A server-resident evaluation session.
///
/// The candidate bindings are fixed at creation. Exactly one evaluator is
/// live at a time and it is always bound to the current binding. Calls on
/// the same session are serialized by an internal lock.
pub struct Session<B> {
    id: SessionId,
    /// Outermost exception first; `chain[0].bindings` is never empty.
    chain: Vec<MappedException<B>>,
    state: Mutex<ActiveBinding>,
    evaluators: Arc<dyn EvaluatorFactory<B>>,
    extractor: Arc<dyn ContextExtractor<B>>,
    audit: Option<AuditLog>,
    created_at: DateTime<Utc>,
}

impl<B> Session<B> {
    /// Builds an unregistered session bound to the first binding of `chain`.
    pub(crate) fn new(
        chain: Vec<MappedException<B>>,
        evaluators: Arc<dyn EvaluatorFactory<B>>,
        extractor: Arc<dyn ContextExtractor<B>>,
        audit: Option<AuditLog>,
    ) -> Result<Self, SessionError> {
        let first = chain
            .first()
            .and_then(|primary| primary.bindings.first())
            .ok_or(SessionError::NoBindings)?;
        let evaluator = evaluators.create(first);

        Ok(Self {
            id: SessionId::generate(),
            state: Mutex::new(ActiveBinding {
                exception: 0,
                index: 0,
                evaluator,
            }),
            chain,
            evaluators,
            extractor,
            audit,
            created_at: Utc::now(),
        })
    }

    /// The session's external handle.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// When the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Candidate bindings of the primary exception.
    #[must_use]
    pub fn candidate_contexts(&self) -> &[B] {
        &self.chain[0].bindings
    }

    /// The full exception chain, outermost first.
    #[must_use]
    pub fn exceptions(&self) -> &[MappedException<B>] {
        &self.chain
    }

    /// Index of the current binding within its exception.
    ///
    /// Indexes `candidate_contexts()` while `current_exception()` is 0.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.lock().index
    }

    /// Position in `exceptions()` of the exception the current binding
    /// belongs to. 0 is the primary exception.
    #[must_use]
    pub fn current_exception(&self) -> usize {
        self.state.lock().exception
    }

    /// `(current_exception(), current_index())` read under one lock.
    #[must_use]
    pub fn current_position(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.exception, state.index)
    }

    /// The binding the evaluator is bound to.
    #[must_use]
    pub fn current_binding(&self) -> &B {
        let (exception, index) = self.current_position();
        &self.chain[exception].bindings[index]
    }

    /// True when auditing is configured for this session.
    #[must_use]
    pub fn audited(&self) -> bool {
        self.audit.is_some()
    }

    /// Evaluates `input` against the current binding.
    ///
    /// `actor` identifies who submitted the input and is only used for the
    /// audit record. Evaluator failures are returned unchanged and are not
    /// audited. A failed audit write fails the whole call.
    pub fn evaluate(&self, input: &str, actor: Option<&str>) -> Result<String, SessionError> {
        let mut state = self.state.lock();
        let timer = EvalTimer::start();

        let output = state.evaluator.evaluate(input).inspect_err(|err| {
            debug!(
                session_id = %self.id,
                kind = %err.kind,
                elapsed_ms = timer.elapsed_ms(),
                "Evaluation failed"
            );
        })?;

        debug!(
            session_id = %self.id,
            binding = state.index,
            elapsed_ms = timer.elapsed_ms(),
            "Evaluated input"
        );

        if let Some(audit) = &self.audit {
            audit.record(input, &output, actor)?;
        }
        drop(state);

        Ok(output)
    }

    /// Re-binds the session to `candidate_contexts()[index]`.
    ///
    /// The previous evaluator and everything defined in it is discarded.
    /// Switching to the current index rebuilds the evaluator.
    pub fn switch_binding(&self, index: usize) -> Result<(), SessionError> {
        self.select(0, index)
    }

    /// Re-binds the session to a frame of a chained exception.
    ///
    /// Unknown exception ids select the primary exception.
    pub fn switch_binding_in(&self, exception_id: &str, index: usize) -> Result<(), SessionError> {
        let exception = self
            .chain
            .iter()
            .position(|mapped| mapped.is(exception_id))
            .unwrap_or_else(|| {
                warn!(
                    session_id = %self.id,
                    exception_id,
                    "Unknown exception id, using primary exception"
                );
                0
            });
        self.select(exception, index)
    }

    /// Describes the value at `path` in the current binding.
    pub fn inspect(&self, path: &str) -> Result<serde_json::Value, SessionError> {
        Ok(self.extractor.extract(self.current_binding(), path)?)
    }

    fn select(&self, exception: usize, index: usize) -> Result<(), SessionError> {
        let bindings = &self.chain[exception].bindings;
        let binding = bindings.get(index).ok_or(SessionError::IndexOutOfRange {
            index,
            len: bindings.len(),
        })?;

        let fresh = self.evaluators.create(binding);
        let mut previous = {
            let mut state = self.state.lock();
            state.exception = exception;
            state.index = index;
            std::mem::replace(&mut state.evaluator, fresh)
        };
        previous.release();

        debug!(session_id = %self.id, exception, index, "Switched binding");
        Ok(())
    }
}

impl<B> Drop for Session<B> {
    fn drop(&mut self) {
        self.state.get_mut().evaluator.release();
        debug!(session_id = %self.id, "Released session evaluator");
    }
}

impl<B> fmt::Debug for Session<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("exceptions", &self.chain.len())
            .field("bindings", &self.chain[0].bindings.len())
            .field("current_exception", &state.exception)
            .field("current_index", &state.index)
            .field("audited", &self.audit.is_some())
            .field("created_at", &self.created_at)
            .finish()
    }
}
