//! Tracing setup for `taskwave` using `tracing` + `tracing-subscriber`.
//!
//! Log verbosity is taken from the `TASKWAVE_LOG` environment variable using
//! the usual `EnvFilter` syntax (e.g. `info`, `taskwave=debug`), defaulting
//! to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted for the log filter.
pub const LOG_ENV_VAR: &str = "TASKWAVE_LOG";

/// Install the global tracing subscriber.
///
/// Call once at startup; later calls return an error from the subscriber
/// registry rather than panicking, so embedding applications that already
/// installed their own subscriber can ignore the result.
pub fn init() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
