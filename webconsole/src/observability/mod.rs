//! Observability utilities.

mod tracing;

pub use tracing::{init_tracing, EvalTimer, DEFAULT_FILTER};
