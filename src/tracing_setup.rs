//! Logging bootstrap
//!
//! Installs the process-wide tracing subscriber. The fmt writer serializes
//! events, so concurrent workers get line-atomic output. This is the sink
//! the lock table's observation events go through.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging for the service.
///
/// Log level comes from `RUST_LOG` (default: info). Calling this more than
/// once leaves the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_safe_to_call_twice() {
        init_tracing();
        init_tracing();
    }
}
