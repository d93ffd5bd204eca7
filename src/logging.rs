use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

use crate::error::{ListingsError, Result};

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"listings_sdk=info"`) when the variable is unset.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| ListingsError::InvalidArgument(format!("failed to initialize tracing: {}", e)))
}
