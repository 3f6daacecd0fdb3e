//! Tracing subscriber setup for harness binaries and test runs

use tracing_subscriber::EnvFilter;

use crate::{HarnessError, Result};

/// Install a fmt subscriber with the given filter directives, e.g.
/// `"firmware_harness=debug"`.
///
/// A subscriber that is already installed is left in place.
///
/// # Errors
///
/// [`HarnessError::Value`] if `filter` is not a valid directive list.
pub fn init(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| HarnessError::invalid_value(format!("invalid log filter {:?}: {}", filter, e)))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    Ok(())
}

/// Install a fmt subscriber configured from `RUST_LOG`, defaulting to `info`.
pub fn try_init_from_env() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init("firmware_harness=debug").unwrap();
        init("warn").unwrap();
        try_init_from_env();
    }

    #[test]
    fn invalid_filter_is_value_error() {
        let result = init("firmware_harness=notalevel");
        assert!(matches!(result, Err(HarnessError::Value { .. })));
    }
}
