//! Session construction and registration.

use crate::audit::{AuditLog, AuditSink};
use crate::binding::{Capture, ContextExtractor, EvaluatorFactory, ExceptionMapper, MappedException};
use crate::config::ConsoleConfig;
use crate::errors::SessionError;
use crate::registry::SessionRegistry;
use crate::session::Session;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds sessions and registers them in a shared registry.
///
/// Holds the collaborators every session needs: an evaluator factory, a
/// context extractor, an exception mapper and, optionally, an audit log.
pub struct SessionFactory<B, X> {
    registry: Arc<SessionRegistry<B>>,
    evaluators: Arc<dyn EvaluatorFactory<B>>,
    extractor: Arc<dyn ContextExtractor<B>>,
    mapper: Arc<dyn ExceptionMapper<B, X>>,
    audit: Option<AuditLog>,
}

impl<B, X> SessionFactory<B, X> {
    /// Creates a factory with auditing disabled.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry<B>>,
        evaluators: Arc<dyn EvaluatorFactory<B>>,
        extractor: Arc<dyn ContextExtractor<B>>,
        mapper: Arc<dyn ExceptionMapper<B, X>>,
    ) -> Self {
        Self {
            registry,
            evaluators,
            extractor,
            mapper,
            audit: None,
        }
    }

    /// Sets the audit log used by every session created afterwards.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Applies a configuration.
    ///
    /// Auditing is enabled only when the config has an `audit` section.
    #[must_use]
    pub fn with_config(mut self, config: &ConsoleConfig, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = config
            .audit
            .clone()
            .map(|audit_config| AuditLog::new(audit_config, sink));
        self
    }

    /// The registry sessions are published to.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry<B>> {
        &self.registry
    }

    /// Creates and registers a session over `contexts`.
    ///
    /// The session starts on `contexts[0]`.
    pub fn create_from_contexts(&self, contexts: Vec<B>) -> Result<Arc<Session<B>>, SessionError> {
        self.create_from_chain(vec![MappedException::anonymous(contexts)])
    }

    /// Creates and registers a session over an exception chain.
    ///
    /// The primary exception's bindings become the candidate contexts.
    pub fn create_from_chain(
        &self,
        chain: Vec<MappedException<B>>,
    ) -> Result<Arc<Session<B>>, SessionError> {
        let session = Arc::new(Session::new(
            chain,
            Arc::clone(&self.evaluators),
            Arc::clone(&self.extractor),
            self.audit.clone(),
        )?);
        self.registry.register(Arc::clone(&session));

        info!(
            session_id = %session.id(),
            bindings = session.candidate_contexts().len(),
            exceptions = session.exceptions().len(),
            audited = session.audited(),
            "Console session created"
        );
        Ok(session)
    }

    /// Creates a session from a request capture.
    ///
    /// A preserved exception wins over a preserved binding. Returns
    /// `Ok(None)` and registers nothing when the capture holds neither.
    pub fn create_from_capture(
        &self,
        capture: &Capture<B, X>,
    ) -> Result<Option<Arc<Session<B>>>, SessionError>
    where
        B: Clone,
    {
        if let Some(exception) = capture.exception() {
            let chain = self.mapper.follow(exception);
            debug!(exceptions = chain.len(), "Mapped captured exception");
            return self.create_from_chain(chain).map(Some);
        }

        if let Some(binding) = capture.binding() {
            return self.create_from_contexts(vec![binding.clone()]).map(Some);
        }

        debug!(capture = ?capture, "Capture holds no exception or binding");
        Ok(None)
    }
}

impl<B, X> std::fmt::Debug for SessionFactory<B, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("registry", &self.registry)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditConfig, CollectingAuditSink};
    use crate::testing::{factory, FrameException, MapBinding};

    #[test]
    fn test_create_from_contexts_registers() {
        let factory = factory();
        let session = factory
            .create_from_contexts(vec![MapBinding::new("a"), MapBinding::new("b")])
            .unwrap();

        let found = factory.registry().find(session.id().as_str()).unwrap();
        assert!(Arc::ptr_eq(&found, &session));
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.candidate_contexts().len(), 2);
    }

    #[test]
    fn test_create_from_empty_contexts_registers_nothing() {
        let factory = factory();
        let err = factory.create_from_contexts(Vec::new()).unwrap_err();

        assert!(matches!(err, SessionError::NoBindings));
        assert!(factory.registry().is_empty());
    }

    #[test]
    fn test_capture_with_single_binding() {
        let factory = factory();
        let capture = Capture::new().with_binding(MapBinding::new("console"));

        let session = factory.create_from_capture(&capture).unwrap().unwrap();
        assert_eq!(session.candidate_contexts(), &[MapBinding::new("console")]);
        assert_eq!(session.exceptions()[0].exception_id, None);
    }

    #[test]
    fn test_capture_with_nothing_is_none() {
        let factory = factory();
        let capture: Capture<MapBinding, FrameException> = Capture::new();

        assert!(factory.create_from_capture(&capture).unwrap().is_none());
        assert!(factory.registry().is_empty());
    }

    #[test]
    fn test_capture_exception_without_frames() {
        let factory = factory();
        let capture = Capture::new().with_exception(FrameException::new("1", Vec::new()));

        assert!(matches!(
            factory.create_from_capture(&capture),
            Err(SessionError::NoBindings)
        ));
        assert!(factory.registry().is_empty());
    }

    #[test]
    fn test_with_config_without_audit_section() {
        let sink = Arc::new(CollectingAuditSink::new());
        let factory = factory().with_config(&ConsoleConfig::new(), sink.clone());

        let session = factory.create_from_contexts(vec![MapBinding::new("a")]).unwrap();
        session.evaluate("1+1", Some("u")).unwrap();

        assert!(!session.audited());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_with_config_enables_audit() {
        let sink = Arc::new(CollectingAuditSink::new());
        let config = ConsoleConfig::new().with_audit(AuditConfig::new("History"));
        let factory = factory().with_config(&config, sink.clone());

        let session = factory.create_from_contexts(vec![MapBinding::new("a")]).unwrap();
        session.evaluate("1+1", Some("u")).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].record_type, "History");
    }
}
