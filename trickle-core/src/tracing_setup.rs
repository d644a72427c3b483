//! Tracing setup for Trickle consumers and tests.
//!
//! Generators log through `tracing`; nothing is printed until a subscriber
//! is installed. Tests call [`init_test_tracing`] to see producer activity.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber routed through the test writer.
///
/// `RUST_LOG` takes precedence over `level`. Safe to call from every test:
/// when a global subscriber already exists the call does nothing and
/// returns `false`.
pub fn init_test_tracing(level: Level) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_test_writer()
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Tracing initialized: level={}", level);
    }
    installed
}
