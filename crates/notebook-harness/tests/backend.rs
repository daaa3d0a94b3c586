//! Integration tests for the notebook-backed adapter.
//!
//! These tests drive `NotebookBackend` end-to-end through the
//! `CollectionStore` contract against a mock `NotebookApi`, proving the
//! collection mapping, source naming, cache bookkeeping, and error policy
//! without a live notebook service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use notebook_harness::backend::NotebookBackend;
use notebook_harness::client::{
    NotebookApi, NotebookInfo, QueryResponse, QuerySource, SourceHandle, SourceSummary,
};
use notebook_harness::config::{Config, NamingConfig, NotebooksConfig, ServiceConfig};
use notebook_harness_core::error::{Result, StoreError};
use notebook_harness_core::filter::Filter;
use notebook_harness_core::models::{RecordDraft, Tier};
use notebook_harness_core::store::cache::RecordCache;
use notebook_harness_core::store::{
    CollectionStore, FilterRequest, ScrollRequest, SearchRequest, UpdateOutcome,
};

/// Text marker that makes the mock refuse `add_text_source`.
const FAIL_MARKER: &str = "__fail__";

// ─── Mock Notebook Service ──────────────────────────────────────────

#[derive(Default)]
struct MockSource {
    id: String,
    title: String,
    text: String,
}

#[derive(Default)]
struct MockNotebook {
    title: String,
    sources: Vec<MockSource>,
}

#[derive(Default)]
struct MockState {
    notebooks: HashMap<String, MockNotebook>,
    counter: usize,
    query_calls: usize,
}

/// In-memory `NotebookApi` with deterministic ids (`nb-N`, `src-N`).
#[derive(Default)]
struct MockService {
    state: Mutex<MockState>,
}

impl MockService {
    fn with_notebook(notebook_id: &str) -> Arc<Self> {
        let service = Arc::new(Self::default());
        service.state.lock().unwrap().notebooks.insert(
            notebook_id.to_string(),
            MockNotebook {
                title: notebook_id.to_string(),
                sources: Vec::new(),
            },
        );
        service
    }

    fn source_titles(&self, notebook_id: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .notebooks
            .get(notebook_id)
            .map(|nb| nb.sources.iter().map(|s| s.title.clone()).collect())
            .unwrap_or_default()
    }

    fn has_source(&self, source_id: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .notebooks
            .values()
            .any(|nb| nb.sources.iter().any(|s| s.id == source_id))
    }

    fn query_calls(&self) -> usize {
        self.state.lock().unwrap().query_calls
    }
}

#[async_trait]
impl NotebookApi for MockService {
    async fn list_notebooks(&self) -> Result<Vec<NotebookInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .notebooks
            .iter()
            .map(|(id, nb)| NotebookInfo {
                id: id.clone(),
                title: nb.title.clone(),
                source_count: nb.sources.len(),
                sources: Vec::new(),
            })
            .collect())
    }

    async fn create_notebook(&self, title: &str, _description: &str) -> Result<NotebookInfo> {
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let id = format!("nb-{}", state.counter);
        state.notebooks.insert(
            id.clone(),
            MockNotebook {
                title: title.to_string(),
                sources: Vec::new(),
            },
        );
        Ok(NotebookInfo {
            id,
            title: title.to_string(),
            source_count: 0,
            sources: Vec::new(),
        })
    }

    async fn delete_notebook(&self, notebook_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state.notebooks.remove(notebook_id).is_some())
    }

    async fn describe_notebook(&self, notebook_id: &str) -> Result<NotebookInfo> {
        let state = self.state.lock().unwrap();
        let nb = state
            .notebooks
            .get(notebook_id)
            .ok_or_else(|| StoreError::Service(format!("no such notebook: {notebook_id}")))?;
        Ok(NotebookInfo {
            id: notebook_id.to_string(),
            title: nb.title.clone(),
            source_count: nb.sources.len(),
            sources: nb
                .sources
                .iter()
                .map(|s| SourceSummary {
                    id: s.id.clone(),
                    title: s.title.clone(),
                })
                .collect(),
        })
    }

    async fn add_text_source(
        &self,
        notebook_id: &str,
        text: &str,
        title: &str,
    ) -> Result<SourceHandle> {
        if text.contains(FAIL_MARKER) {
            return Err(StoreError::Service("source rejected".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.counter += 1;
        let id = format!("src-{}", state.counter);
        let nb = state
            .notebooks
            .get_mut(notebook_id)
            .ok_or_else(|| StoreError::Service(format!("no such notebook: {notebook_id}")))?;
        nb.sources.push(MockSource {
            id: id.clone(),
            title: title.to_string(),
            text: text.to_string(),
        });
        Ok(SourceHandle { id })
    }

    async fn delete_source(&self, notebook_id: &str, source_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(nb) = state.notebooks.get_mut(notebook_id) else {
            return Ok(false);
        };
        let before = nb.sources.len();
        nb.sources.retain(|s| s.id != source_id);
        Ok(nb.sources.len() < before)
    }

    async fn query(&self, notebook_id: &str, query: &str) -> Result<QueryResponse> {
        let mut state = self.state.lock().unwrap();
        state.query_calls += 1;
        let nb = state
            .notebooks
            .get(notebook_id)
            .ok_or_else(|| StoreError::Service(format!("no such notebook: {notebook_id}")))?;
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let sources = nb
            .sources
            .iter()
            .filter(|s| {
                let text = s.text.to_lowercase();
                terms.iter().any(|t| text.contains(t))
            })
            .map(|s| QuerySource {
                source_id: s.id.clone(),
                title: s.title.clone(),
                snippet: s.text.chars().take(240).collect(),
            })
            .collect();
        Ok(QueryResponse {
            answer: format!("Answer about: {query}"),
            sources,
        })
    }
}

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config() -> Config {
    Config {
        service: ServiceConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            auth_token_path: None,
            timeouts: Default::default(),
        },
        notebooks: NotebooksConfig {
            mapping: HashMap::from([("resources".to_string(), "nb-resources".to_string())]),
            default_notebook: None,
        },
        tiers: [("L0", 100u32), ("L1", 2000), ("L2", 0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        naming: NamingConfig::default(),
    }
}

fn setup() -> (Arc<MockService>, NotebookBackend) {
    let service = MockService::with_notebook("nb-resources");
    let backend = NotebookBackend::with_service(&test_config(), service.clone()).unwrap();
    (service, backend)
}

fn draft(uri: &str, content: &str) -> RecordDraft {
    RecordDraft {
        uri: Some(uri.to_string()),
        content: Some(content.to_string()),
        ..Default::default()
    }
}

async fn insert(backend: &NotebookBackend, uri: &str, content: &str) -> String {
    backend
        .insert("resources", draft(uri, content))
        .await
        .unwrap()
}

// ─── Record CRUD ────────────────────────────────────────────────────

#[tokio::test]
async fn insert_then_get_returns_exact_record() {
    let (_service, backend) = setup();

    let id = insert(&backend, "ext://docs/a", "hello world").await;
    // Generated ids are UUIDs.
    assert_eq!(id.len(), 36);

    let records = backend
        .get("resources", &[id.clone()])
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, id);
    assert_eq!(records[0].content, "hello world");
    assert_eq!(records[0].uri, "ext://docs/a");
    assert_eq!(records[0].tier, Tier::L0);
    assert_eq!(records[0].context_type, "resource");
}

#[tokio::test]
async fn insert_stores_source_under_derived_name() {
    let (service, backend) = setup();

    let long_content = "word ".repeat(500);
    insert(&backend, "nbx://docs/guides/deploy", &long_content).await;

    let titles = service.source_titles("nb-resources");
    assert_eq!(titles.len(), 1);
    // 500 words lands in L1; title derives from the last URI segment.
    assert!(titles[0].starts_with("L1-resource-"), "title: {}", titles[0]);
    assert!(titles[0].contains("-deploy-"));
    assert!(titles[0].ends_with("-ACTIVE"));
}

#[tokio::test]
async fn insert_keeps_caller_id_and_extra_fields() {
    let (_service, backend) = setup();

    let id = backend
        .insert(
            "resources",
            RecordDraft {
                id: Some("fixed-id".to_string()),
                uri: Some("nbx://docs/a".to_string()),
                text: Some("body via text field".to_string()),
                extra: serde_json::from_value(json!({ "owner": "platform" })).unwrap(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(id, "fixed-id");

    let record = &backend.get("resources", &[id]).await.unwrap()[0];
    assert_eq!(record.content, "body via text field");
    assert_eq!(record.extra["owner"], json!("platform"));
}

#[tokio::test]
async fn insert_into_unmapped_collection_fails() {
    let (_service, backend) = setup();

    let err = backend
        .insert("unknown", draft("nbx://x/1", "text"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::CollectionNotFound(_)));
}

#[tokio::test]
async fn unmapped_collection_falls_back_to_default_notebook() {
    let service = MockService::with_notebook("nb-fallback");
    let mut config = test_config();
    config.notebooks.default_notebook = Some("nb-fallback".to_string());
    let backend = NotebookBackend::with_service(&config, service.clone()).unwrap();

    let id = backend
        .insert("anything", draft("nbx://anything/1", "text"))
        .await
        .unwrap();
    assert!(backend.exists("anything", &id).await.unwrap());
    assert_eq!(service.source_titles("nb-fallback").len(), 1);
}

#[tokio::test]
async fn insert_propagates_service_failure() {
    let (service, backend) = setup();

    let err = backend
        .insert("resources", draft("nbx://docs/a", FAIL_MARKER))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Service(_)));
    assert_eq!(backend.count("resources", None).await.unwrap(), 0);
    assert!(service.source_titles("nb-resources").is_empty());
}

#[tokio::test]
async fn delete_removes_record_and_source() {
    let (service, backend) = setup();

    let id = insert(&backend, "nbx://docs/a", "hello").await;
    let source_id = backend.get("resources", &[id.clone()]).await.unwrap()[0]
        .source_id
        .clone();

    let deleted = backend.delete("resources", &[id.clone()]).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(!backend.exists("resources", &id).await.unwrap());
    assert!(backend.get("resources", &[id]).await.unwrap().is_empty());
    assert!(!service.has_source(&source_id));
}

#[tokio::test]
async fn delete_counts_only_confirmed_successes() {
    let (_service, backend) = setup();

    let id = insert(&backend, "nbx://docs/a", "hello").await;
    let deleted = backend
        .delete("resources", &[id, "never-inserted".to_string()])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

// ─── Update / Upsert ────────────────────────────────────────────────

#[tokio::test]
async fn update_preserves_id_and_replaces_source() {
    let (service, backend) = setup();

    let id = insert(&backend, "nbx://docs/a", "original content").await;
    let old_source_id = backend.get("resources", &[id.clone()]).await.unwrap()[0]
        .source_id
        .clone();

    let outcome = backend
        .update(
            "resources",
            &id,
            RecordDraft {
                content: Some("updated content".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Applied);

    let record = &backend.get("resources", &[id.clone()]).await.unwrap()[0];
    assert_eq!(record.id, id);
    assert_eq!(record.content, "updated content");
    assert_eq!(record.uri, "nbx://docs/a");

    // The old source identifier must no longer resolve to anything.
    assert!(!service.has_source(&old_source_id));
    assert!(service.has_source(&record.source_id));
    assert_eq!(service.source_titles("nb-resources").len(), 1);
}

#[tokio::test]
async fn update_of_missing_record_is_missing() {
    let (_service, backend) = setup();
    let outcome = backend
        .update("resources", "nope", RecordDraft::default())
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Missing);
}

#[tokio::test]
async fn update_reports_lost_record_when_reinsert_fails() {
    let (service, backend) = setup();

    let id = insert(&backend, "nbx://docs/a", "original").await;
    let outcome = backend
        .update(
            "resources",
            &id,
            RecordDraft {
                content: Some(FAIL_MARKER.to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Deleted but not reinserted: gone from the cache and the service.
    assert_eq!(outcome, UpdateOutcome::Lost);
    assert!(!backend.exists("resources", &id).await.unwrap());
    assert!(service.source_titles("nb-resources").is_empty());
}

#[tokio::test]
async fn upsert_inserts_then_updates() {
    let (_service, backend) = setup();

    let mut data = RecordDraft {
        id: Some("r1".to_string()),
        uri: Some("nbx://docs/a".to_string()),
        content: Some("first".to_string()),
        ..Default::default()
    };
    assert_eq!(backend.upsert("resources", data.clone()).await.unwrap(), "r1");

    data.content = Some("second".to_string());
    assert_eq!(backend.upsert("resources", data).await.unwrap(), "r1");

    assert_eq!(backend.count("resources", None).await.unwrap(), 1);
    let record = &backend
        .get("resources", &["r1".to_string()])
        .await
        .unwrap()[0];
    assert_eq!(record.content, "second");
}

// ─── Batch operations ───────────────────────────────────────────────

#[tokio::test]
async fn batch_insert_isolates_failures() {
    let (_service, backend) = setup();

    let ids = backend
        .batch_insert(
            "resources",
            vec![
                draft("nbx://docs/a", "alpha"),
                draft("nbx://docs/b", FAIL_MARKER),
                draft("nbx://docs/c", "gamma"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(backend.count("resources", None).await.unwrap(), 2);
}

#[tokio::test]
async fn batch_delete_by_filter() {
    let (_service, backend) = setup();

    backend
        .insert(
            "resources",
            RecordDraft {
                context_type: Some("memory".to_string()),
                ..draft("nbx://m/1", "one")
            },
        )
        .await
        .unwrap();
    insert(&backend, "nbx://r/1", "two").await;

    let removed = backend
        .batch_delete(
            "resources",
            &Filter::eq("context_type", json!("memory")),
        )
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(backend.count("resources", None).await.unwrap(), 1);
}

#[tokio::test]
async fn remove_by_uri_matches_exact_and_prefix() {
    let (_service, backend) = setup();

    insert(&backend, "nbx://docs/guide", "a").await;
    insert(&backend, "nbx://docs/guide/part-1", "b").await;
    insert(&backend, "nbx://docs/guidebook", "c").await;

    let removed = backend
        .remove_by_uri("resources", "nbx://docs/guide")
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let rest = backend
        .filter("resources", FilterRequest::default())
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["uri"], json!("nbx://docs/guidebook"));
}

// ─── Filter / Scroll / Count ────────────────────────────────────────

#[tokio::test]
async fn empty_filter_returns_all_records() {
    let (_service, backend) = setup();
    insert(&backend, "nbx://docs/a", "a").await;
    insert(&backend, "nbx://docs/b", "b").await;

    let records = backend
        .filter("resources", FilterRequest::default())
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn contradictory_conjunction_returns_nothing() {
    let (_service, backend) = setup();
    insert(&backend, "nbx://docs/a", "a").await;

    let filter = Filter::And(vec![
        Filter::eq("context_type", json!("resource")),
        Filter::eq("context_type", json!("memory")),
    ]);
    let records = backend
        .filter(
            "resources",
            FilterRequest {
                filter,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn filter_orders_paginates_and_projects() {
    let (_service, backend) = setup();
    for (uri, rank) in [("nbx://d/a", 3), ("nbx://d/b", 1), ("nbx://d/c", 2)] {
        backend
            .insert(
                "resources",
                RecordDraft {
                    extra: serde_json::from_value(json!({ "rank": rank })).unwrap(),
                    ..draft(uri, "content")
                },
            )
            .await
            .unwrap();
    }

    let records = backend
        .filter(
            "resources",
            FilterRequest {
                order_by: Some("rank".to_string()),
                order_desc: true,
                limit: 2,
                offset: 1,
                output_fields: Some(vec!["uri".to_string(), "rank".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Descending rank is [3, 2, 1]; offset 1, limit 2 leaves [2, 1].
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["rank"], json!(2));
    assert_eq!(records[1]["rank"], json!(1));
    // Projection keeps the requested fields plus id.
    assert!(records[0].get("id").is_some());
    assert!(records[0].get("content").is_none());
}

#[tokio::test]
async fn scroll_pages_through_the_cache() {
    let (_service, backend) = setup();
    for i in 0..5 {
        insert(&backend, &format!("nbx://docs/{i}"), "content").await;
    }

    let first = backend
        .scroll(
            "resources",
            ScrollRequest {
                limit: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(first.records.len(), 2);
    assert_eq!(first.next_cursor.as_deref(), Some("2"));

    let second = backend
        .scroll(
            "resources",
            ScrollRequest {
                limit: 2,
                cursor: first.next_cursor,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.records.len(), 2);
    assert_eq!(second.next_cursor.as_deref(), Some("4"));

    let last = backend
        .scroll(
            "resources",
            ScrollRequest {
                limit: 2,
                cursor: second.next_cursor,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(last.records.len(), 1);
    assert!(last.next_cursor.is_none());
}

#[tokio::test]
async fn count_with_and_without_filter() {
    let (_service, backend) = setup();
    insert(&backend, "nbx://docs/a", "a").await;
    backend
        .insert(
            "resources",
            RecordDraft {
                context_type: Some("memory".to_string()),
                ..draft("nbx://m/1", "b")
            },
        )
        .await
        .unwrap();

    assert_eq!(backend.count("resources", None).await.unwrap(), 2);
    let filter = Filter::eq("context_type", json!("memory"));
    assert_eq!(
        backend.count("resources", Some(&filter)).await.unwrap(),
        1
    );
    assert_eq!(backend.count("empty-collection", None).await.unwrap(), 0);
}

// ─── Search ─────────────────────────────────────────────────────────

#[tokio::test]
async fn search_maps_sources_with_synthetic_scores() {
    let (_service, backend) = setup();
    insert(&backend, "nbx://docs/deploy", "how to deploy the service").await;
    insert(&backend, "nbx://docs/rollback", "how to roll back a deploy").await;
    insert(&backend, "nbx://docs/unrelated", "lunch menu").await;

    let hits = backend
        .search(
            "resources",
            SearchRequest {
                filter: Some(json!({ "query": "deploy" })),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["_score"], json!(1.0));
    assert_eq!(hits[1]["_score"], json!(0.9));
    // Titles decode from the stored source names.
    assert_eq!(hits[0]["title"], json!("deploy"));
    assert_eq!(hits[0]["context_type"], json!("resource"));
    assert!(hits[0]["uri"]
        .as_str()
        .unwrap()
        .starts_with("nbx://resources/"));
}

#[tokio::test]
async fn search_accepts_query_as_condition_leaf() {
    let (_service, backend) = setup();
    insert(&backend, "nbx://docs/deploy", "how to deploy the service").await;

    let hits = backend
        .search(
            "resources",
            SearchRequest {
                filter: Some(json!({
                    "op": "and",
                    "conds": [ { "field": "query", "conds": ["deploy"] } ]
                })),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn search_without_query_text_makes_no_external_call() {
    let (service, backend) = setup();
    insert(&backend, "nbx://docs/a", "content").await;

    let hits = backend
        .search("resources", SearchRequest::default())
        .await
        .unwrap();
    assert!(hits.is_empty());
    assert_eq!(service.query_calls(), 0);

    // Ignored vector parameters change nothing.
    let hits = backend
        .search(
            "resources",
            SearchRequest {
                query_vector: Some(vec![0.1, 0.2]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(hits.is_empty());
    assert_eq!(service.query_calls(), 0);
}

#[tokio::test]
async fn search_on_unmapped_collection_fails() {
    let (_service, backend) = setup();
    let err = backend
        .search(
            "unknown",
            SearchRequest {
                filter: Some(json!({ "query": "anything" })),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::CollectionNotFound(_)));
}

#[tokio::test]
async fn search_applies_limit_offset_and_projection() {
    let (_service, backend) = setup();
    for i in 0..4 {
        insert(&backend, &format!("nbx://docs/doc{i}"), "common topic").await;
    }

    let hits = backend
        .search(
            "resources",
            SearchRequest {
                filter: Some(json!({ "query": "common" })),
                limit: 2,
                offset: 1,
                output_fields: Some(vec!["title".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    // Scores reflect the pre-pagination rank.
    assert_eq!(hits[0]["_score"], json!(0.9));
    assert!(hits[0].get("id").is_some());
    assert!(hits[0].get("uri").is_none());
}

// ─── Collections ────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_drop_collection_roundtrip() {
    let (service, backend) = setup();

    assert!(backend
        .create_collection("memories", &json!({ "description": "agent memories" }))
        .await
        .unwrap());
    // Creating a mapped collection is a no-op.
    assert!(!backend
        .create_collection("memories", &json!({}))
        .await
        .unwrap());

    let collections = backend.list_collections().await.unwrap();
    assert_eq!(collections, vec!["memories", "resources"]);

    let id = backend
        .insert("memories", draft("nbx://memories/1", "remember this"))
        .await
        .unwrap();
    assert!(backend.exists("memories", &id).await.unwrap());

    assert!(backend.drop_collection("memories").await.unwrap());
    assert!(!backend.exists("memories", &id).await.unwrap());
    assert_eq!(backend.list_collections().await.unwrap(), vec!["resources"]);
    assert!(!service.state.lock().unwrap().notebooks.contains_key("nb-1"));
}

#[tokio::test]
async fn drop_of_unmapped_collection_is_false() {
    let (_service, backend) = setup();
    assert!(!backend.drop_collection("unknown").await.unwrap());
}

#[tokio::test]
async fn collection_info_reports_source_count() {
    let (_service, backend) = setup();
    insert(&backend, "nbx://docs/a", "a").await;
    insert(&backend, "nbx://docs/b", "b").await;

    let info = backend
        .collection_info("resources")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.notebook_id, "nb-resources");
    assert_eq!(info.source_count, 2);
    assert_eq!(info.status, "active");

    assert!(backend.collection_info("unknown").await.unwrap().is_none());
    assert!(backend.collection_exists("resources").await.unwrap());
    assert!(!backend.collection_exists("unknown").await.unwrap());
}

// ─── Lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn clear_empties_collection_and_service() {
    let (service, backend) = setup();
    insert(&backend, "nbx://docs/a", "a").await;
    insert(&backend, "nbx://docs/b", "b").await;

    assert!(backend.clear("resources").await.unwrap());
    assert_eq!(backend.count("resources", None).await.unwrap(), 0);
    assert!(service.source_titles("nb-resources").is_empty());
}

#[tokio::test]
async fn index_operations_are_accepted_noops() {
    let (_service, backend) = setup();
    assert!(backend
        .create_index("resources", "uri", "scalar")
        .await
        .unwrap());
    assert!(backend.drop_index("resources", "uri").await.unwrap());
    assert!(backend.optimize("resources").await.unwrap());
}

#[tokio::test]
async fn health_stats_and_close() {
    let (_service, backend) = setup();
    insert(&backend, "nbx://docs/a", "a").await;

    assert!(backend.health_check().await.unwrap());
    assert_eq!(backend.mode(), "notebook");

    let stats = backend.stats().await.unwrap();
    assert_eq!(stats.collections, 1);
    assert_eq!(stats.total_records, 1);
    assert_eq!(stats.backend, "notebook");
    assert_eq!(stats.tier_config.l0, 100);

    backend.close().await.unwrap();
    assert!(!backend.health_check().await.unwrap());
    assert_eq!(backend.count("resources", None).await.unwrap(), 0);
}

#[tokio::test]
async fn missing_client_yields_service_unavailable() {
    let backend =
        NotebookBackend::with_parts(&test_config(), None, RecordCache::new()).unwrap();

    let err = backend
        .insert("resources", draft("nbx://docs/a", "text"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ServiceUnavailable(_)));

    assert!(!backend.health_check().await.unwrap());
    // Search degrades to empty instead of failing.
    let hits = backend
        .search(
            "resources",
            SearchRequest {
                filter: Some(json!({ "query": "anything" })),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn config_file_loads_and_backend_connects() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("nbx.toml");
    std::fs::write(
        &config_path,
        r#"
        [service]
        base_url = "http://127.0.0.1:1"

        [notebooks.mapping]
        resources = "nb-resources"
        "#,
    )
    .unwrap();

    let config = notebook_harness::config::load_config(&config_path).unwrap();
    assert_eq!(config.notebooks.mapping["resources"], "nb-resources");

    // connect() tolerates missing credentials; the backend just reports
    // the service as unavailable.
    let backend = NotebookBackend::connect(&config).unwrap();
    assert_eq!(backend.mode(), "notebook");
}
