/// Separator between the session and the entity id inside an [`EntityKey`](crate::EntityKey).
pub const ENTITY_KEY_SEPARATOR: char = '|';

/// URI scheme prefix for AT Protocol record URIs.
pub const AT_URI_SCHEME: &str = "at://";

/// Collection NSIDs for the records this client writes.
pub const COLLECTION_POST: &str = "app.bsky.feed.post";
pub const COLLECTION_LIST: &str = "app.bsky.graph.list";
pub const COLLECTION_LIST_ITEM: &str = "app.bsky.graph.listitem";

/// Default number of items requested per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 25;

/// Maximum number of writes sent in one `applyWrites` call.
pub const DEFAULT_WRITE_CHUNK_SIZE: usize = 10;

/// Default number of merges between two automatic finalizer sweeps.
pub const DEFAULT_SWEEP_INTERVAL: u32 = 64;

/// Value of `associated.chat.allowIncoming` when the server omits it.
pub const DEFAULT_CHAT_ALLOW_INCOMING: &str = "following";
