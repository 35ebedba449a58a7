//! # plume-client
//!
//! Query and mutation layer on top of [`plume_cache`].
//!
//! Query functions fetch through a [`Transport`], merge the response into the
//! [`EntityCache`](plume_cache::EntityCache) under one version tag and store
//! the resulting page in the [`QueryClient`]. Mutations turn their outcome
//! into an [`Effect`], whose [`MutationPlan`] says which cached results to
//! patch, reset, invalidate or refetch.

pub mod config;
pub mod error;
pub mod models;
pub mod mutations;
pub mod queries;
pub mod query;
pub mod state;
pub mod transport;
pub mod updaters;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use models::QueryData;
pub use query::{QueryClient, QueryFilter, QueryKey};
pub use state::ClientState;
pub use transport::{Transport, WriteOp};
pub use updaters::{Effect, MutationPlan, Reduce};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("plume_client=debug,plume_cache=info,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
