//! The query cache: fetched results addressed by [`QueryKey`].
//!
//! Entries are replaced, never mutated in place, so a caller holding an old
//! [`QueryData`] keeps a consistent snapshot. A fetch runs under an
//! [`AbortHandle`]; cancelling or resetting the key drops the fetch future
//! before it can merge anything.

mod key;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use futures::future::{AbortHandle, Abortable};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::models::QueryData;

pub use key::*;

struct InFlight {
    id: u64,
    handle: AbortHandle,
}

#[derive(Default)]
struct QueryEntry {
    data: Option<QueryData>,
    stale: bool,
    updated_at: Option<DateTime<Utc>>,
    fetch: Option<InFlight>,
}

/// Snapshot of one entry's status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub has_data: bool,
    pub is_stale: bool,
    pub is_fetching: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct QueryClient {
    entries: RefCell<BTreeMap<QueryKey, QueryEntry>>,
    next_fetch: Cell<u64>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_query_data(&self, key: &QueryKey) -> Option<QueryData> {
        self.entries.borrow().get(key).and_then(|e| e.data.clone())
    }

    pub fn query_state(&self, key: &QueryKey) -> Option<QueryState> {
        self.entries.borrow().get(key).map(|e| QueryState {
            has_data: e.data.is_some(),
            is_stale: e.stale,
            is_fetching: e.fetch.is_some(),
            updated_at: e.updated_at,
        })
    }

    /// Missing entries count as stale.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .borrow()
            .get(key)
            .map_or(true, |e| e.data.is_none() || e.stale)
    }

    /// Keys of all entries matching `filter`, in key order.
    pub fn keys(&self, filter: &QueryFilter) -> Vec<QueryKey> {
        self.entries
            .borrow()
            .keys()
            .filter(|k| filter.matches(k))
            .cloned()
            .collect()
    }

    /// Replace the data under `key` with what `update` returns. Returning
    /// `None`, or the same allocation, leaves the entry untouched.
    pub fn set_query_data(
        &self,
        key: &QueryKey,
        update: impl FnOnce(Option<&QueryData>) -> Option<QueryData>,
    ) -> bool {
        let current = self.get_query_data(key);
        let Some(next) = update(current.as_ref()) else {
            return false;
        };
        if current.is_some_and(|c| c.ptr_eq(&next)) {
            return false;
        }

        self.store(key, next);
        true
    }

    /// Apply `update` to every entry matching `filter` that holds data.
    /// Returns how many entries changed.
    pub fn set_queries_data(
        &self,
        filter: &QueryFilter,
        update: impl Fn(&QueryData) -> QueryData,
    ) -> usize {
        let matching: Vec<(QueryKey, QueryData)> = self
            .entries
            .borrow()
            .iter()
            .filter(|(k, _)| filter.matches(k))
            .filter_map(|(k, e)| e.data.clone().map(|d| (k.clone(), d)))
            .collect();

        let mut changed = 0;
        for (key, data) in matching {
            let next = update(&data);
            if !next.ptr_eq(&data) {
                self.store(&key, next);
                changed += 1;
            }
        }

        if changed > 0 {
            debug!(?filter, changed, "Patched cached queries");
        }
        changed
    }

    /// Drop matching entries, cancelling their fetches.
    pub fn reset_queries(&self, filter: &QueryFilter) -> usize {
        let mut entries = self.entries.borrow_mut();
        let keys: Vec<QueryKey> = entries.keys().filter(|k| filter.matches(k)).cloned().collect();

        for key in &keys {
            if let Some(fetch) = entries.remove(key).and_then(|e| e.fetch) {
                fetch.handle.abort();
            }
        }

        if !keys.is_empty() {
            debug!(?filter, count = keys.len(), "Reset queries");
        }
        keys.len()
    }

    /// Mark matching entries stale so the next read refetches them.
    pub fn invalidate_queries(&self, filter: &QueryFilter) -> usize {
        let mut count = 0;
        for (_, entry) in self.entries.borrow_mut().iter_mut().filter(|(k, _)| filter.matches(k)) {
            entry.stale = true;
            count += 1;
        }

        if count > 0 {
            debug!(?filter, count, "Invalidated queries");
        }
        count
    }

    /// Abort in-flight fetches of matching entries. Cached data is kept.
    pub fn cancel_queries(&self, filter: &QueryFilter) -> usize {
        let mut count = 0;
        for (_, entry) in self.entries.borrow_mut().iter_mut().filter(|(k, _)| filter.matches(k)) {
            if let Some(fetch) = entry.fetch.take() {
                fetch.handle.abort();
                count += 1;
            }
        }
        count
    }

    /// Run `fetch` and store its result under `key`.
    ///
    /// A newer fetch for the same key cancels this one. On error or
    /// cancellation the cached data is left as it was.
    pub async fn fetch_query<F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<QueryData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData>>,
    {
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.begin_fetch(key, handle);

        match Abortable::new(fetch(), registration).await {
            Ok(Ok(data)) => {
                if self.end_fetch(key, id) {
                    self.store(key, data.clone());
                }
                Ok(data)
            }
            Ok(Err(e)) => {
                self.end_fetch(key, id);
                warn!(key = %key, error = %e, "Fetch failed");
                Err(e)
            }
            Err(_aborted) => {
                self.end_fetch(key, id);
                warn!(key = %key, "Fetch cancelled");
                Err(ClientError::Cancelled)
            }
        }
    }

    /// Cached data if fresh, otherwise a fetch.
    pub async fn ensure_query_data<F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<QueryData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData>>,
    {
        if !self.is_stale(key) {
            if let Some(data) = self.get_query_data(key) {
                return Ok(data);
            }
        }
        self.fetch_query(key, fetch).await
    }

    fn store(&self, key: &QueryKey, data: QueryData) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key.clone()).or_default();
        entry.data = Some(data);
        entry.stale = false;
        entry.updated_at = Some(Utc::now());
    }

    fn begin_fetch(&self, key: &QueryKey, handle: AbortHandle) -> u64 {
        let id = self.next_fetch.get() + 1;
        self.next_fetch.set(id);

        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key.clone()).or_default();
        if let Some(previous) = entry.fetch.replace(InFlight { id, handle }) {
            previous.handle.abort();
        }
        id
    }

    /// Clears the in-flight marker if it still belongs to fetch `id`.
    fn end_fetch(&self, key: &QueryKey, id: u64) -> bool {
        let mut entries = self.entries.borrow_mut();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };

        let current = entry.fetch.as_ref().is_some_and(|f| f.id == id);
        if current {
            entry.fetch = None;
        }
        if entry.data.is_none() && entry.fetch.is_none() {
            entries.remove(key);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use futures::channel::oneshot;
    use plume_shared::{AtUri, Did};

    use super::*;
    use crate::models::ListMembership;

    fn me() -> Did {
        Did::parse("did:plc:me").unwrap()
    }

    fn memberships(n: usize) -> QueryData {
        let items = (0..n)
            .map(|i| ListMembership {
                actor: Did::parse("did:plc:abc").unwrap(),
                list_uri: AtUri::parse(format!("at://did:plc:me/app.bsky.graph.list/{i}")).unwrap(),
                item_uri: AtUri::parse(format!("at://did:plc:me/app.bsky.graph.listitem/{i}")).unwrap(),
            })
            .collect();
        QueryData::ListMemberships(Rc::new(items))
    }

    fn count(data: &QueryData) -> usize {
        match data {
            QueryData::ListMemberships(items) => items.len(),
            _ => panic!("unexpected data"),
        }
    }

    #[test]
    fn test_set_query_data_skips_identical_value() {
        let client = QueryClient::new();
        let key = QueryKey::list_memberships(&me());
        let data = memberships(1);

        assert!(client.set_query_data(&key, |_| Some(data.clone())));
        let stamp = client.query_state(&key).unwrap().updated_at;

        assert!(!client.set_query_data(&key, |current| current.cloned()));
        assert!(!client.set_query_data(&key, |_| None));
        assert_eq!(client.query_state(&key).unwrap().updated_at, stamp);
    }

    #[test]
    fn test_set_queries_data_counts_changes() {
        let client = QueryClient::new();
        let a = QueryKey::profile_lists(&me(), "a");
        let b = QueryKey::profile_lists(&me(), "b");
        client.set_query_data(&a, |_| Some(memberships(1)));
        client.set_query_data(&b, |_| Some(memberships(2)));

        let filter = QueryFilter::prefix(QueryKey::scope(GET_PROFILE_LISTS, &me()));
        let changed = client.set_queries_data(&filter, |d| {
            if count(d) == 2 {
                memberships(3)
            } else {
                d.clone()
            }
        });
        assert_eq!(changed, 1);
        assert_eq!(count(&client.get_query_data(&b).unwrap()), 3);
    }

    #[test]
    fn test_invalidate_and_reset() {
        let client = QueryClient::new();
        let key = QueryKey::list_memberships(&me());
        client.set_query_data(&key, |_| Some(memberships(1)));
        assert!(!client.is_stale(&key));

        assert_eq!(client.invalidate_queries(&QueryFilter::exact(key.clone())), 1);
        assert!(client.is_stale(&key));
        assert!(client.get_query_data(&key).is_some());

        assert_eq!(client.reset_queries(&QueryFilter::exact(key.clone())), 1);
        assert!(client.get_query_data(&key).is_none());
        assert!(client.query_state(&key).is_none());
    }

    #[tokio::test]
    async fn test_fetch_query_stores_result() {
        let client = QueryClient::new();
        let key = QueryKey::list_memberships(&me());

        let data = client.fetch_query(&key, || async { Ok(memberships(2)) }).await.unwrap();
        assert_eq!(count(&data), 2);
        assert!(client.get_query_data(&key).unwrap().ptr_eq(&data));
        assert!(!client.query_state(&key).unwrap().is_fetching);

        // Fresh data is served without fetching again.
        let cached = client
            .ensure_query_data(&key, || async { Ok(memberships(5)) })
            .await
            .unwrap();
        assert!(cached.ptr_eq(&data));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_data() {
        let client = QueryClient::new();
        let key = QueryKey::list_memberships(&me());
        client.set_query_data(&key, |_| Some(memberships(1)));

        let err = client
            .fetch_query(&key, || async { Err(ClientError::MissingData("boom".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingData(_)));
        assert_eq!(count(&client.get_query_data(&key).unwrap()), 1);
    }

    #[tokio::test]
    async fn test_cancel_drops_pending_fetch() {
        let client = QueryClient::new();
        let key = QueryKey::list_memberships(&me());
        let (tx, rx) = oneshot::channel::<()>();
        let ran_to_end = Cell::new(false);

        let fetch = client.fetch_query(&key, || async {
            let _ = rx.await;
            ran_to_end.set(true);
            Ok(memberships(1))
        });
        let cancel = async {
            tokio::task::yield_now().await;
            assert!(client.query_state(&key).unwrap().is_fetching);
            assert_eq!(client.cancel_queries(&QueryFilter::exact(key.clone())), 1);
            let _ = tx.send(());
        };

        let (result, ()) = futures::join!(fetch, cancel);
        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert!(!ran_to_end.get());
        assert!(client.get_query_data(&key).is_none());
    }
}
