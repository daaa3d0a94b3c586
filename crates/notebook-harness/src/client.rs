//! Notebook service boundary.
//!
//! Defines the [`NotebookApi`] trait the adapter calls through and the
//! JSON/HTTP [`HttpNotebookClient`] implementation. The trait keeps the
//! seam open for other transports (the service is reached through whatever
//! client it ships) and for mock implementations in tests.
//!
//! Every call carries a fixed timeout chosen by operation class: notebook
//! CRUD and source deletion use the `control` budget, adding a text source
//! uses `ingest`, and free-text queries use `query`. A timeout surfaces as
//! a [`StoreError::Service`] failure; there is no retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use notebook_harness_core::error::{Result, StoreError};

use crate::config::{ServiceConfig, TimeoutConfig};

/// Environment variable holding the bearer token for the notebook service.
pub const TOKEN_ENV_VAR: &str = "NOTEBOOK_API_TOKEN";

/// Notebook metadata as reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct NotebookInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_count: usize,
    #[serde(default)]
    pub sources: Vec<SourceSummary>,
}

/// One entry of a notebook's source list.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// Handle returned when a text source is added.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceHandle {
    pub id: String,
}

/// Answer to a natural-language query over a notebook's sources.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<QuerySource>,
}

/// A source the service cited in a query answer, in relevance order.
#[derive(Debug, Clone, Deserialize)]
pub struct QuerySource {
    pub source_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct NotebookList {
    #[serde(default)]
    notebooks: Vec<NotebookInfo>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    deleted: bool,
}

/// The coarse operations the semantic notebook service exposes.
#[async_trait]
pub trait NotebookApi: Send + Sync {
    async fn list_notebooks(&self) -> Result<Vec<NotebookInfo>>;

    async fn create_notebook(&self, title: &str, description: &str) -> Result<NotebookInfo>;

    async fn delete_notebook(&self, notebook_id: &str) -> Result<bool>;

    async fn describe_notebook(&self, notebook_id: &str) -> Result<NotebookInfo>;

    async fn add_text_source(
        &self,
        notebook_id: &str,
        text: &str,
        title: &str,
    ) -> Result<SourceHandle>;

    async fn delete_source(&self, notebook_id: &str, source_id: &str) -> Result<bool>;

    async fn query(&self, notebook_id: &str, query: &str) -> Result<QueryResponse>;
}

/// JSON/HTTP implementation of [`NotebookApi`].
#[derive(Debug)]
pub struct HttpNotebookClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    timeouts: TimeoutConfig,
}

impl HttpNotebookClient {
    /// Build a client from the service config.
    ///
    /// The bearer token is resolved at construction: the
    /// [`TOKEN_ENV_VAR`] environment variable first, then the configured
    /// token file. With neither available the client cannot be built and
    /// the backend stays without a service handle.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let token = resolve_token(config)?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::ServiceUnavailable(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            timeouts: config.timeouts,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        timeout_secs: u64,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StoreError::Service(format!("notebook service timed out: {e}"))
                } else {
                    StoreError::Service(format!("notebook service request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Service(format!(
                "notebook service returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Service(format!("invalid notebook service response: {e}")))
    }
}

/// Resolve the bearer token from the environment or the configured file.
fn resolve_token(config: &ServiceConfig) -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.trim().is_empty() {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(path) = &config.auth_token_path {
        let token = std::fs::read_to_string(path).map_err(|e| {
            StoreError::ServiceUnavailable(format!(
                "failed to read auth token from {}: {e}",
                path.display()
            ))
        })?;
        let token = token.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }

    Err(StoreError::ServiceUnavailable(format!(
        "no API token: set {TOKEN_ENV_VAR} or service.auth_token_path"
    )))
}

#[async_trait]
impl NotebookApi for HttpNotebookClient {
    async fn list_notebooks(&self) -> Result<Vec<NotebookInfo>> {
        let list: NotebookList = self
            .execute(
                self.http.get(self.url("/v1/notebooks")),
                self.timeouts.control_secs,
            )
            .await?;
        Ok(list.notebooks)
    }

    async fn create_notebook(&self, title: &str, description: &str) -> Result<NotebookInfo> {
        self.execute(
            self.http.post(self.url("/v1/notebooks")).json(&serde_json::json!({
                "title": title,
                "description": description,
            })),
            self.timeouts.control_secs,
        )
        .await
    }

    async fn delete_notebook(&self, notebook_id: &str) -> Result<bool> {
        let resp: DeleteResponse = self
            .execute(
                self.http
                    .delete(self.url(&format!("/v1/notebooks/{notebook_id}"))),
                self.timeouts.control_secs,
            )
            .await?;
        Ok(resp.deleted)
    }

    async fn describe_notebook(&self, notebook_id: &str) -> Result<NotebookInfo> {
        self.execute(
            self.http.get(self.url(&format!("/v1/notebooks/{notebook_id}"))),
            self.timeouts.control_secs,
        )
        .await
    }

    async fn add_text_source(
        &self,
        notebook_id: &str,
        text: &str,
        title: &str,
    ) -> Result<SourceHandle> {
        self.execute(
            self.http
                .post(self.url(&format!("/v1/notebooks/{notebook_id}/sources")))
                .json(&serde_json::json!({
                    "title": title,
                    "text": text,
                })),
            self.timeouts.ingest_secs,
        )
        .await
    }

    async fn delete_source(&self, notebook_id: &str, source_id: &str) -> Result<bool> {
        let resp: DeleteResponse = self
            .execute(
                self.http.delete(
                    self.url(&format!("/v1/notebooks/{notebook_id}/sources/{source_id}")),
                ),
                self.timeouts.control_secs,
            )
            .await?;
        Ok(resp.deleted)
    }

    async fn query(&self, notebook_id: &str, query: &str) -> Result<QueryResponse> {
        self.execute(
            self.http
                .post(self.url(&format!("/v1/notebooks/{notebook_id}/query")))
                .json(&serde_json::json!({ "query": query })),
            self.timeouts.query_secs,
        )
        .await
    }
}
