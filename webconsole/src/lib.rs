//! # Webconsole
//!
//! Server-resident interactive evaluation sessions.
//!
//! A session is created when an error page or live console captures an
//! execution context. It is registered under a random id and lets later
//! requests carrying that id:
//!
//! - **Evaluate** code fragments against the current binding
//! - **Switch** between candidate bindings (one per stack frame)
//! - **Inspect** values reachable from the current binding
//! - **Audit** each evaluation to an external append-only sink
//!
//! Evaluation, introspection and exception mapping are supplied by the host
//! through the traits in [`binding`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use webconsole::prelude::*;
//!
//! let registry = Arc::new(SessionRegistry::new());
//! let factory = SessionFactory::new(registry.clone(), evaluators, extractor, mapper)
//!     .with_config(&config, audit_sink);
//!
//! // On an unhandled exception
//! let capture = Capture::new().with_exception(exception);
//! if let Some(session) = factory.create_from_capture(&capture)? {
//!     render_console(session.id());
//! }
//!
//! // On a later request
//! let session = registry.find(&id)?;
//! let output = session.evaluate("user.name", Some(actor_id))?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod audit;
pub mod binding;
pub mod config;
pub mod errors;
pub mod factory;
pub mod id;
pub mod observability;
pub mod registry;
pub mod session;
pub mod testing;

pub use audit::{AuditConfig, AuditLog, AuditRecord, AuditSink};
pub use binding::{Capture, ContextExtractor, Evaluator, EvaluatorFactory, ExceptionMapper};
pub use config::ConsoleConfig;
pub use errors::SessionError;
pub use factory::SessionFactory;
pub use id::SessionId;
pub use registry::SessionRegistry;
pub use session::Session;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::{
        AuditConfig, AuditLog, AuditRecord, AuditSink, CollectingAuditSink, LoggingAuditSink,
    };
    pub use crate::binding::{
        Capture, ContextExtractor, Evaluator, EvaluatorFactory, ExceptionMapper,
        MappedException, Preserved, BINDING_KEY, EXCEPTION_KEY,
    };
    pub use crate::config::ConsoleConfig;
    pub use crate::errors::{AuditError, EvaluationError, ExtractError, SessionError};
    pub use crate::factory::SessionFactory;
    pub use crate::id::SessionId;
    pub use crate::observability::init_tracing;
    pub use crate::registry::SessionRegistry;
    pub use crate::session::Session;
    pub use std::sync::Arc;
}
