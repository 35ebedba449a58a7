//! Client state shared by query functions and mutations.

use plume_cache::EntityCache;

use crate::config::ClientConfig;
use crate::query::{QueryClient, QueryKey};
use crate::transport::Transport;
use crate::updaters::{Effect, MutationPlan};

/// Central client state.
///
/// Owns the entity cache and the query cache for every signed-in account;
/// entries are scoped by session DID, never by separate instances.
pub struct ClientState<T> {
    /// Network collaborator used by queries and mutations.
    pub transport: T,

    /// Live entities, one identity map per kind.
    pub cache: EntityCache,

    /// Fetched results by query key.
    pub queries: QueryClient,

    pub config: ClientConfig,
}

impl<T: Transport> ClientState<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            cache: EntityCache::with_sweep_interval(config.sweep_interval),
            queries: QueryClient::new(),
            config,
        }
    }

    /// Apply `effect` to both caches. Returns the queries to refetch.
    pub fn apply_effect(&self, effect: &Effect) -> Vec<QueryKey> {
        let plan = effect.plan();
        self.apply_plan(effect, plan)
    }

    /// Run `plan`: evict, reset, patch with `effect`, then invalidate.
    pub fn apply_plan(&self, effect: &Effect, plan: MutationPlan) -> Vec<QueryKey> {
        for uri in &plan.evict_posts {
            self.cache.remove_cached_post(effect.session(), uri);
        }
        for filter in &plan.reset {
            self.queries.reset_queries(filter);
        }
        for filter in &plan.patch {
            self.queries.set_queries_data(filter, |data| data.reduce(effect));
        }
        for filter in &plan.invalidate {
            self.queries.invalidate_queries(filter);
        }
        plan.refetch
    }
}
