//! Logging setup.
//!
//! Logs go to **stderr**; stdout belongs to the host process. The filter is
//! read from `RUST_LOG` and falls back to `info`:
//!
//! ```bash
//! RUST_LOG=hemmer_provider_hcloud=debug ./provider   # API calls and action polling
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Install the global subscriber at `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_FILTER);
}

/// Install the global subscriber with a different default level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Install the global subscriber unless one is already set.
///
/// Returns `false` if a subscriber was already installed.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(filter(DEFAULT_FILTER))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    // The global subscriber can be set once per process, so only the filter
    // syntax is checked here.
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        assert!(EnvFilter::try_new("hemmer_provider_hcloud=debug").is_ok());
        assert!(EnvFilter::try_new("warn,hemmer_provider_hcloud::hcloud=trace").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
