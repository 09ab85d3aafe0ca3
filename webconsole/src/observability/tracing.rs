//! Tracing subscriber setup and evaluation timing.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset and no directive is given.
pub const DEFAULT_FILTER: &str = "webconsole=info";

/// Installs a formatted tracing subscriber for the process.
///
/// `directives` takes precedence over `RUST_LOG`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_tracing(directives: Option<&str>) -> bool {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Measures one evaluation.
#[derive(Debug)]
pub struct EvalTimer {
    start: Instant,
}

impl EvalTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_timer() {
        let timer = EvalTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(Some("webconsole=debug"));
        assert!(!init_tracing(None));
    }
}
