//! Notebook-backed implementation of [`CollectionStore`].
//!
//! Every operation resolves the collection to a notebook id, performs one
//! or more calls to the [`NotebookApi`] boundary, and updates the local
//! [`RecordCache`] to reflect success. The cache is the only source of
//! truth for filter, scroll, count, and existence checks; it is lost on
//! process restart.
//!
//! Error policy: insert propagates failure because callers need the
//! created id, and search propagates an unresolvable collection. Every
//! other failure is logged and converted to a negative or empty result.
//! Per-record failures inside batch operations never abort the batch.
//!
//! Known race: concurrent update or delete on the same record id can
//! interleave the delete and reinsert steps and leave the cache and the
//! external store inconsistent. There is no versioning or compare-and-swap.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use notebook_harness_core::error::{Result, StoreError};
use notebook_harness_core::filter::{self, Filter};
use notebook_harness_core::models::{CollectionInfo, Record, RecordDraft, StoreStats, Tier};
use notebook_harness_core::naming::{
    self, SourceName, TierThresholds, STATUS_ACTIVE,
};
use notebook_harness_core::store::cache::RecordCache;
use notebook_harness_core::store::{
    CollectionStore, FilterRequest, ScrollPage, ScrollRequest, SearchRequest, UpdateOutcome,
};

use crate::client::{HttpNotebookClient, NotebookApi};
use crate::config::Config;

/// Storage mode label.
pub const MODE: &str = "notebook";

/// Prefix for notebook titles created through `create_collection`.
const NOTEBOOK_TITLE_PREFIX: &str = "NotebookHarness";

/// URI scheme for records inserted without an explicit URI.
const URI_SCHEME: &str = "nbx";

/// Default context classification for records that carry none.
const DEFAULT_CONTEXT_TYPE: &str = "resource";

/// Adapter mapping the document-collection contract onto the notebook
/// service.
pub struct NotebookBackend {
    notebooks: RwLock<HashMap<String, String>>,
    default_notebook: Option<String>,
    thresholds: TierThresholds,
    pattern: String,
    service: RwLock<Option<Arc<dyn NotebookApi>>>,
    cache: RecordCache,
}

impl NotebookBackend {
    /// Build a backend from config, connecting the HTTP client.
    ///
    /// A client that cannot be built (missing credentials) is logged and
    /// left absent; boundary operations then fail with
    /// [`StoreError::ServiceUnavailable`] until the process is restarted
    /// with credentials in place.
    pub fn connect(config: &Config) -> anyhow::Result<Self> {
        let service: Option<Arc<dyn NotebookApi>> =
            match HttpNotebookClient::from_config(&config.service) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!("notebook client not available: {e}");
                    None
                }
            };
        Self::with_parts(config, service, RecordCache::new())
    }

    /// Build a backend with an injected service implementation.
    pub fn with_service(config: &Config, service: Arc<dyn NotebookApi>) -> anyhow::Result<Self> {
        Self::with_parts(config, Some(service), RecordCache::new())
    }

    /// Build a backend with an injected service and a pre-populated cache.
    pub fn with_parts(
        config: &Config,
        service: Option<Arc<dyn NotebookApi>>,
        cache: RecordCache,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let backend = NotebookBackend {
            notebooks: RwLock::new(config.notebooks.mapping.clone()),
            default_notebook: config.notebooks.default_notebook.clone(),
            thresholds: config.thresholds(),
            pattern: config.naming.pattern.clone(),
            service: RwLock::new(service),
            cache,
        };
        info!(
            "notebook backend initialized with {} mapped notebooks",
            backend.notebooks.read().unwrap().len()
        );
        Ok(backend)
    }

    /// The service handle, or [`StoreError::ServiceUnavailable`] when the
    /// client was never initialized or the backend is closed.
    fn client(&self) -> Result<Arc<dyn NotebookApi>> {
        self.service
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| {
                StoreError::ServiceUnavailable(
                    "notebook client not initialized; check service credentials".to_string(),
                )
            })
    }

    /// Resolve a collection name to its notebook id, falling back to the
    /// default notebook when configured.
    fn resolve(&self, collection: &str) -> Result<String> {
        if let Some(id) = self.notebooks.read().unwrap().get(collection) {
            return Ok(id.clone());
        }
        if let Some(id) = &self.default_notebook {
            return Ok(id.clone());
        }
        Err(StoreError::CollectionNotFound(collection.to_string()))
    }

    /// Derive the source name for a record.
    fn build_source_name(
        &self,
        uri: &str,
        tier: Tier,
        context_type: &str,
        title: Option<&str>,
    ) -> String {
        let title = title
            .map(str::to_string)
            .unwrap_or_else(|| naming::title_from_uri(uri).to_string());
        SourceName {
            tier,
            context_type: context_type.to_string(),
            uri_hash: naming::uri_hash(uri),
            title: naming::truncate_title(&title),
            status: STATUS_ACTIVE.to_string(),
        }
        .encode(&self.pattern)
    }
}

/// Keep only `fields` in a serialized record, plus the always-kept keys.
fn project(value: Value, fields: Option<&[String]>, always: &[&str]) -> Value {
    let Some(fields) = fields else {
        return value;
    };
    let Value::Object(obj) = value else {
        return value;
    };
    let projected: Map<String, Value> = obj
        .into_iter()
        .filter(|(k, _)| fields.iter().any(|f| f == k) || always.contains(&k.as_str()))
        .collect();
    Value::Object(projected)
}

/// Ordering for `order_by` sorting: numbers before strings, each compared
/// within their own kind; everything else falls back to its JSON encoding.
fn compare_order_keys(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

#[async_trait]
impl CollectionStore for NotebookBackend {
    async fn create_collection(&self, name: &str, schema: &Value) -> Result<bool> {
        if self.notebooks.read().unwrap().contains_key(name) {
            debug!("collection '{name}' already mapped to a notebook");
            return Ok(false);
        }

        let client = match self.client() {
            Ok(c) => c,
            Err(e) => {
                error!("cannot create collection '{name}': {e}");
                return Ok(false);
            }
        };

        let description = schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Notebook Harness collection: {name}"));

        match client
            .create_notebook(&format!("{NOTEBOOK_TITLE_PREFIX}-{name}"), &description)
            .await
        {
            Ok(notebook) => {
                self.notebooks
                    .write()
                    .unwrap()
                    .insert(name.to_string(), notebook.id.clone());
                info!("created notebook for collection '{name}': {}", notebook.id);
                Ok(true)
            }
            Err(e) => {
                error!("failed to create notebook for collection '{name}': {e}");
                Ok(false)
            }
        }
    }

    async fn drop_collection(&self, name: &str) -> Result<bool> {
        let notebook_id = match self.resolve(name) {
            Ok(id) => id,
            Err(e) => {
                warn!("collection '{name}' not found: {e}");
                return Ok(false);
            }
        };
        let client = match self.client() {
            Ok(c) => c,
            Err(e) => {
                error!("cannot drop collection '{name}': {e}");
                return Ok(false);
            }
        };

        match client.delete_notebook(&notebook_id).await {
            Ok(true) => {
                self.notebooks.write().unwrap().remove(name);
                self.cache.drop_collection(name);
                info!("dropped collection: {name}");
                Ok(true)
            }
            Ok(false) => {
                error!("notebook service refused to delete notebook for '{name}'");
                Ok(false)
            }
            Err(e) => {
                error!("error dropping collection '{name}': {e}");
                Ok(false)
            }
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let Ok(notebook_id) = self.resolve(name) else {
            return Ok(false);
        };
        let Ok(client) = self.client() else {
            return Ok(false);
        };
        Ok(client.describe_notebook(&notebook_id).await.is_ok())
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.notebooks.read().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let Ok(notebook_id) = self.resolve(name) else {
            return Ok(None);
        };
        let Ok(client) = self.client() else {
            return Ok(None);
        };

        match client.describe_notebook(&notebook_id).await {
            Ok(notebook) => Ok(Some(CollectionInfo {
                name: name.to_string(),
                notebook_id,
                title: if notebook.title.is_empty() {
                    name.to_string()
                } else {
                    notebook.title
                },
                source_count: notebook.source_count,
                status: "active".to_string(),
            })),
            Err(e) => {
                error!("error getting collection info for '{name}': {e}");
                Ok(None)
            }
        }
    }

    async fn insert(&self, collection: &str, data: RecordDraft) -> Result<String> {
        let notebook_id = self.resolve(collection)?;
        let client = self.client()?;

        let record_id = data
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let uri = data
            .uri
            .clone()
            .unwrap_or_else(|| format!("{URI_SCHEME}://{collection}/{record_id}"));
        let content = data.body().to_string();
        let context_type = data
            .context_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTEXT_TYPE.to_string());

        let tier = self.thresholds.classify(naming::word_count(&content));
        let source_name =
            self.build_source_name(&uri, tier, &context_type, data.title.as_deref());

        let handle = client
            .add_text_source(&notebook_id, &content, &source_name)
            .await
            .map_err(|e| {
                error!("error inserting record into '{collection}': {e}");
                e
            })?;

        self.cache.insert(
            collection,
            Record {
                id: record_id.clone(),
                uri,
                source_id: handle.id,
                source_name: source_name.clone(),
                tier,
                context_type,
                content,
                title: data.title,
                extra: data.extra,
            },
        );

        debug!("inserted record {record_id} as source '{source_name}'");
        Ok(record_id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: RecordDraft,
    ) -> Result<UpdateOutcome> {
        let Some(existing) = self.cache.get(collection, id) else {
            return Ok(UpdateOutcome::Missing);
        };

        let mut draft = RecordDraft::from_record(&existing);
        draft.merge(patch);
        draft.id = Some(id.to_string());

        // Not atomic: the old source goes away before the new one lands.
        let deleted = self.delete(collection, &[id.to_string()]).await?;

        match self.insert(collection, draft).await {
            Ok(_) => Ok(UpdateOutcome::Applied),
            Err(e) if deleted > 0 => {
                error!("record '{id}' lost during update of '{collection}': {e}");
                Ok(UpdateOutcome::Lost)
            }
            Err(e) => {
                error!("error updating record '{id}' in '{collection}': {e}");
                Ok(UpdateOutcome::Failed)
            }
        }
    }

    async fn upsert(&self, collection: &str, data: RecordDraft) -> Result<String> {
        if let Some(id) = data.id.clone() {
            if self.cache.contains(collection, &id) {
                let outcome = self.update(collection, &id, data).await?;
                debug!("upsert of existing record '{id}': {outcome:?}");
                return Ok(id);
            }
        }
        self.insert(collection, data).await
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<usize> {
        let notebook_id = match self.resolve(collection) {
            Ok(id) => id,
            Err(e) => {
                warn!("error deleting records: {e}");
                return Ok(0);
            }
        };
        let client = match self.client() {
            Ok(c) => c,
            Err(e) => {
                warn!("error deleting records: {e}");
                return Ok(0);
            }
        };

        let mut deleted = 0;
        for record_id in ids {
            let Some(cached) = self.cache.get(collection, record_id) else {
                warn!("record '{record_id}' not found in cache");
                continue;
            };
            match client.delete_source(&notebook_id, &cached.source_id).await {
                Ok(true) => {
                    self.cache.remove(collection, record_id);
                    deleted += 1;
                }
                Ok(false) => {
                    warn!("notebook service refused to delete source for record '{record_id}'");
                }
                Err(e) => {
                    warn!("failed to delete record '{record_id}': {e}");
                }
            }
        }
        Ok(deleted)
    }

    async fn get(&self, collection: &str, ids: &[String]) -> Result<Vec<Record>> {
        Ok(self.cache.get_many(collection, ids))
    }

    async fn exists(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self.cache.contains(collection, id))
    }

    async fn batch_insert(&self, collection: &str, data: Vec<RecordDraft>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(data.len());
        for draft in data {
            match self.insert(collection, draft).await {
                Ok(id) => ids.push(id),
                Err(e) => error!("batch insert item failed in '{collection}': {e}"),
            }
        }
        Ok(ids)
    }

    async fn batch_upsert(&self, collection: &str, data: Vec<RecordDraft>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(data.len());
        for draft in data {
            match self.upsert(collection, draft).await {
                Ok(id) => ids.push(id),
                Err(e) => error!("batch upsert item failed in '{collection}': {e}"),
            }
        }
        Ok(ids)
    }

    async fn batch_delete(&self, collection: &str, filter: &Filter) -> Result<usize> {
        let ids: Vec<String> = self
            .cache
            .records(collection)
            .into_iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.delete(collection, &ids).await
    }

    async fn remove_by_uri(&self, collection: &str, uri: &str) -> Result<usize> {
        let prefix = format!("{uri}/");
        let ids: Vec<String> = self
            .cache
            .records(collection)
            .into_iter()
            .filter(|r| r.uri == uri || r.uri.starts_with(&prefix))
            .map(|r| r.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.delete(collection, &ids).await
    }

    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<Value>> {
        let notebook_id = self.resolve(collection)?;

        // Query vectors are ignored; the service searches semantically on
        // free text extracted from the filter payload.
        let query = request
            .filter
            .as_ref()
            .and_then(filter::query_text);
        let Some(query) = query else {
            warn!("no query text provided for semantic search of '{collection}'");
            return Ok(Vec::new());
        };

        let client = match self.client() {
            Ok(c) => c,
            Err(e) => {
                error!("error searching collection '{collection}': {e}");
                return Ok(Vec::new());
            }
        };

        let response = match client.query(&notebook_id, &query).await {
            Ok(r) => r,
            Err(e) => {
                error!("notebook query failed for '{collection}': {e}");
                return Ok(Vec::new());
            }
        };

        let hits = response
            .sources
            .iter()
            .enumerate()
            .map(|(rank, source)| {
                let parsed = SourceName::parse(&source.title);
                let (title, context_type, uri_hash) = match &parsed {
                    Some(name) => (
                        name.title.clone(),
                        name.context_type.clone(),
                        name.uri_hash.clone(),
                    ),
                    None => (
                        source.title.clone(),
                        DEFAULT_CONTEXT_TYPE.to_string(),
                        "unknown".to_string(),
                    ),
                };
                let id = if source.source_id.is_empty() {
                    Uuid::new_v4().to_string()
                } else {
                    source.source_id.clone()
                };
                serde_json::json!({
                    "id": id,
                    "uri": format!("{URI_SCHEME}://{collection}/{uri_hash}"),
                    "content": source.snippet,
                    "title": title,
                    "context_type": context_type,
                    // Order from the service, discounted linearly. Carries
                    // no relevance semantics beyond rank.
                    "_score": 1.0 - (rank as f64) * 0.1,
                })
            })
            .skip(request.offset)
            .take(request.limit)
            .map(|hit| project(hit, request.output_fields.as_deref(), &["id", "_score"]))
            .collect();

        Ok(hits)
    }

    async fn filter(&self, collection: &str, request: FilterRequest) -> Result<Vec<Value>> {
        let mut records: Vec<Record> = self
            .cache
            .records(collection)
            .into_iter()
            .filter(|r| request.filter.matches(r))
            .collect();

        if let Some(order_by) = &request.order_by {
            records.sort_by(|a, b| {
                let ka = a.field(order_by).unwrap_or(Value::String(String::new()));
                let kb = b.field(order_by).unwrap_or(Value::String(String::new()));
                let ord = compare_order_keys(&ka, &kb);
                if request.order_desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let out = records
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|r| {
                let value = serde_json::to_value(&r).unwrap_or(Value::Null);
                project(value, request.output_fields.as_deref(), &["id"])
            })
            .collect();
        Ok(out)
    }

    async fn scroll(&self, collection: &str, request: ScrollRequest) -> Result<ScrollPage> {
        let offset = request
            .cursor
            .as_deref()
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or(0);

        let records = self
            .filter(
                collection,
                FilterRequest {
                    filter: request.filter.unwrap_or_else(Filter::empty),
                    limit: request.limit,
                    offset,
                    output_fields: request.output_fields,
                    order_by: None,
                    order_desc: false,
                },
            )
            .await?;

        let next_cursor = if records.len() == request.limit {
            Some((offset + request.limit).to_string())
        } else {
            None
        };
        Ok(ScrollPage {
            records,
            next_cursor,
        })
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<usize> {
        match filter {
            Some(f) => Ok(self
                .cache
                .records(collection)
                .iter()
                .filter(|r| f.matches(r))
                .count()),
            None => Ok(self.cache.len(collection)),
        }
    }

    async fn create_index(&self, _collection: &str, field: &str, index_type: &str) -> Result<bool> {
        debug!("index creation ({index_type} on {field}) not applicable for notebook backend");
        Ok(true)
    }

    async fn drop_index(&self, _collection: &str, field: &str) -> Result<bool> {
        debug!("index drop ({field}) not applicable for notebook backend");
        Ok(true)
    }

    async fn clear(&self, collection: &str) -> Result<bool> {
        let ids = self.cache.ids(collection);
        if !ids.is_empty() {
            self.delete(collection, &ids).await?;
        }
        self.cache.reset_collection(collection);
        info!("cleared all data in collection: {collection}");
        Ok(true)
    }

    async fn optimize(&self, _collection: &str) -> Result<bool> {
        debug!("optimization not applicable for notebook backend");
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        self.cache.clear();
        *self.service.write().unwrap() = None;
        info!("notebook backend closed");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let Ok(client) = self.client() else {
            return Ok(false);
        };
        Ok(client.list_notebooks().await.is_ok())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            collections: self.notebooks.read().unwrap().len(),
            total_records: self.cache.total(),
            backend: MODE.to_string(),
            tier_config: self.thresholds,
        })
    }

    fn mode(&self) -> &str {
        MODE
    }
}
