//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client works with zero configuration.

use plume_shared::constants::{DEFAULT_PAGE_LIMIT, DEFAULT_SWEEP_INTERVAL, DEFAULT_WRITE_CHUNK_SIZE};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Number of items requested per page.
    /// Env: `PLUME_PAGE_LIMIT`
    /// Default: `25`
    pub page_limit: u32,

    /// Maximum number of record writes sent in one `applyWrites` call.
    /// Env: `PLUME_WRITE_CHUNK_SIZE`
    /// Default: `10`
    pub write_chunk_size: usize,

    /// Merges between two automatic finalizer sweeps (0 = manual only).
    /// Env: `PLUME_SWEEP_INTERVAL`
    /// Default: `64`
    pub sweep_interval: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            write_chunk_size: DEFAULT_WRITE_CHUNK_SIZE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("PLUME_PAGE_LIMIT") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.page_limit = n,
                _ => tracing::warn!(value = %val, "Invalid PLUME_PAGE_LIMIT, using default"),
            }
        }

        if let Some(val) = lookup("PLUME_WRITE_CHUNK_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.write_chunk_size = n,
                _ => tracing::warn!(value = %val, "Invalid PLUME_WRITE_CHUNK_SIZE, using default"),
            }
        }

        if let Some(val) = lookup("PLUME_SWEEP_INTERVAL") {
            if let Ok(n) = val.parse::<u32>() {
                config.sweep_interval = n;
            } else {
                tracing::warn!(value = %val, "Invalid PLUME_SWEEP_INTERVAL, using default");
            }
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter.

        config
    }
}
