//! Storage abstraction for Notebook Harness.
//!
//! The [`CollectionStore`] trait defines the full document-collection
//! contract the adapter presents: collection CRUD, record CRUD, vector-style
//! search, cache-backed filter/scroll/count, index no-ops, and lifecycle
//! operations. Implementations must be `Send + Sync` to work with async
//! runtimes.
//!
//! | Group | Methods |
//! |-------|---------|
//! | Collections | `create_collection`, `drop_collection`, `collection_exists`, `list_collections`, `collection_info` |
//! | Records | `insert`, `update`, `upsert`, `delete`, `get`, `exists` |
//! | Batch | `batch_insert`, `batch_upsert`, `batch_delete`, `remove_by_uri` |
//! | Query | `search`, `filter`, `scroll`, `count` |
//! | Index | `create_index`, `drop_index` |
//! | Lifecycle | `clear`, `optimize`, `close`, `health_check`, `stats` |

pub mod cache;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::filter::Filter;
use crate::models::{CollectionInfo, Record, RecordDraft, StoreStats};

/// Outcome of an update, which is implemented as delete-then-reinsert and
/// is therefore not atomic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The record was replaced.
    Applied,
    /// No record with that id exists in the cache.
    Missing,
    /// The old record was deleted but reinsertion failed; the record is
    /// gone from both the cache and the external store.
    Lost,
    /// The update failed before the old record was removed; nothing
    /// changed.
    Failed,
}

/// Parameters for [`CollectionStore::search`].
///
/// The vector parameters exist for interface compatibility only; this
/// backend ignores them and extracts free text from `filter` instead.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query_vector: Option<Vec<f32>>,
    pub sparse_query_vector: Option<HashMap<String, f32>>,
    /// Raw filter payload; may carry the query text.
    pub filter: Option<Value>,
    pub limit: usize,
    pub offset: usize,
    pub output_fields: Option<Vec<String>>,
    pub with_vector: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        SearchRequest {
            query_vector: None,
            sparse_query_vector: None,
            filter: None,
            limit: 10,
            offset: 0,
            output_fields: None,
            with_vector: false,
        }
    }
}

/// Parameters for [`CollectionStore::filter`].
#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub filter: Filter,
    pub limit: usize,
    pub offset: usize,
    pub output_fields: Option<Vec<String>>,
    pub order_by: Option<String>,
    pub order_desc: bool,
}

impl Default for FilterRequest {
    fn default() -> Self {
        FilterRequest {
            filter: Filter::empty(),
            limit: 10,
            offset: 0,
            output_fields: None,
            order_by: None,
            order_desc: false,
        }
    }
}

/// Parameters for [`CollectionStore::scroll`].
#[derive(Debug, Clone)]
pub struct ScrollRequest {
    pub filter: Option<Filter>,
    pub limit: usize,
    /// Opaque cursor from a previous page; `None` starts from the top.
    pub cursor: Option<String>,
    pub output_fields: Option<Vec<String>>,
}

impl Default for ScrollRequest {
    fn default() -> Self {
        ScrollRequest {
            filter: None,
            limit: 100,
            cursor: None,
            output_fields: None,
        }
    }
}

/// One page of a scroll, with the cursor for the next page when more
/// records may remain.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    pub records: Vec<Value>,
    pub next_cursor: Option<String>,
}

/// Abstract document-collection store.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Create a collection. Returns `false` when it already exists or
    /// creation failed.
    async fn create_collection(&self, name: &str, schema: &Value) -> Result<bool>;

    /// Drop a collection and everything in it.
    async fn drop_collection(&self, name: &str) -> Result<bool>;

    /// Check whether a collection exists on the backing service.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// List known collection names.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Collection metadata and statistics, `None` when unavailable.
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Insert a record, returning its id. Unlike the other operations this
    /// propagates failure; callers need the created id.
    async fn insert(&self, collection: &str, data: RecordDraft) -> Result<String>;

    /// Replace a record wholesale with the cached fields merged under
    /// `patch`.
    async fn update(&self, collection: &str, id: &str, patch: RecordDraft)
        -> Result<UpdateOutcome>;

    /// Update when the draft's id exists, insert otherwise.
    async fn upsert(&self, collection: &str, data: RecordDraft) -> Result<String>;

    /// Delete records by id, best effort. Returns the count of confirmed
    /// deletions only.
    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize>;

    /// Fetch cached records by id; unknown ids are skipped.
    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<Record>>;

    /// Whether a record id is present in the cache.
    async fn exists(&self, collection: &str, id: &str) -> Result<bool>;

    /// Insert many records. Per-item failures are isolated; the returned
    /// ids cover successful inserts only.
    async fn batch_insert(&self, collection: &str, data: Vec<RecordDraft>) -> Result<Vec<String>>;

    /// Upsert many records with per-item isolation.
    async fn batch_upsert(&self, collection: &str, data: Vec<RecordDraft>) -> Result<Vec<String>>;

    /// Delete all cached records matching a filter.
    async fn batch_delete(&self, collection: &str, filter: &Filter) -> Result<usize>;

    /// Delete records whose URI equals `uri` or falls under it as a path
    /// prefix.
    async fn remove_by_uri(&self, collection: &str, uri: &str) -> Result<usize>;

    /// Semantic search via the backing service's natural-language query.
    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<Value>>;

    /// Scalar filtering over the local cache.
    async fn filter(&self, collection: &str, request: FilterRequest) -> Result<Vec<Value>>;

    /// Cursor pagination over the local cache.
    async fn scroll(&self, collection: &str, request: ScrollRequest) -> Result<ScrollPage>;

    /// Count cached records, optionally filtered.
    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<usize>;

    /// Index creation. A no-op for backends with no index concept.
    async fn create_index(&self, collection: &str, field: &str, index_type: &str) -> Result<bool>;

    /// Index removal. A no-op for backends with no index concept.
    async fn drop_index(&self, collection: &str, field: &str) -> Result<bool>;

    /// Delete all records in a collection.
    async fn clear(&self, collection: &str) -> Result<bool>;

    /// Storage-side optimization hook. A no-op for this backend.
    async fn optimize(&self, collection: &str) -> Result<bool>;

    /// Release the client and local state.
    async fn close(&self) -> Result<()>;

    /// Whether the backing service answers at all.
    async fn health_check(&self) -> Result<bool>;

    /// Aggregate statistics.
    async fn stats(&self) -> Result<StoreStats>;

    /// Short label identifying the storage mode.
    fn mode(&self) -> &str;
}
