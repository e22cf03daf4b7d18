//! Logging and tracing setup for the provider.
//!
//! Logs go to **stderr** so they never mix with whatever the lifecycle host
//! reads from stdout. Filtering follows `RUST_LOG`.
//!
//! # Quick Start
//!
//! ```ignore
//! use peripheral_provider::{init_logging, PeripheralProvider, ProviderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = PeripheralProvider::new(&ProviderConfig::from_env()?)?;
//!     tracing::info!("Provider ready");
//!     Ok(())
//! }
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Request and response lines from the runners client
//! RUST_LOG=peripheral_provider::client=debug ./my-host
//!
//! # Everything the provider logs
//! RUST_LOG=peripheral_provider=trace ./my-host
//! ```

use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter};

/// The subscriber every initializer installs: an `EnvFilter` read from
/// `RUST_LOG` (falling back to `default_level`) over a compact stderr layer.
fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    Registry::default().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize the default logging subscriber at `info` level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level.
///
/// `default_level` is used when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Useful in tests, where several cases may race to install a subscriber.
pub fn try_init_logging() -> bool {
    subscriber("info").try_init().is_ok()
}
