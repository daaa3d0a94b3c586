//! Core data models used throughout Notebook Harness.
//!
//! These types represent the records, drafts, and results that flow through
//! the adapter. Records are schemaless beyond a handful of well-known
//! fields; everything else rides along in a flattened `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content-length classification bucket, encoded into the source name.
///
/// Tiers affect naming and metadata only; the backing service stores all
/// tiers identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    L0,
    L1,
    L2,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::L0 => "L0",
            Tier::L1 => "L1",
            Tier::L2 => "L2",
        }
    }

    /// Parse a tier label. Returns `None` for anything other than the three
    /// known labels; callers treat that as an unstructured name.
    pub fn parse(s: &str) -> Option<Tier> {
        match s {
            "L0" => Some(Tier::L0),
            "L1" => Some(Tier::L1),
            "L2" => Some(Tier::L2),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as held in the local cache after a successful insert.
///
/// `source_id` is the handle the backing service returned for the source;
/// `source_name` is the derived title the source was stored under. Both are
/// needed to delete or replace the source later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub uri: String,
    pub source_id: String,
    pub source_name: String,
    pub tier: Tier,
    pub context_type: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Look up a field by name for filter evaluation, covering both the
    /// well-known fields and the `extra` map.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "uri" => Some(Value::String(self.uri.clone())),
            "source_id" => Some(Value::String(self.source_id.clone())),
            "source_name" => Some(Value::String(self.source_name.clone())),
            "tier" => Some(Value::String(self.tier.as_str().to_string())),
            "context_type" => Some(Value::String(self.context_type.clone())),
            "content" => Some(Value::String(self.content.clone())),
            "title" => self.title.clone().map(Value::String),
            _ => self.extra.get(name).cloned(),
        }
    }
}

/// Caller-supplied record data for insert and update.
///
/// Mirrors the loose payloads accepted by the generic storage contract:
/// every field is optional, the body may arrive as `content`, `text`, or
/// `abstract`, and unrecognized fields are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecordDraft {
    /// The textual body: `content`, falling back to `text`, then `abstract`.
    pub fn body(&self) -> &str {
        self.content
            .as_deref()
            .or(self.text.as_deref())
            .or(self.abstract_.as_deref())
            .unwrap_or("")
    }

    /// Rebuild a draft from a cached record, for the delete-and-reinsert
    /// update path.
    pub fn from_record(record: &Record) -> RecordDraft {
        RecordDraft {
            id: Some(record.id.clone()),
            uri: Some(record.uri.clone()),
            content: Some(record.content.clone()),
            text: None,
            abstract_: None,
            title: record.title.clone(),
            context_type: Some(record.context_type.clone()),
            extra: record.extra.clone(),
        }
    }

    /// Overlay `patch` onto `self`: fields the patch sets win, extra maps
    /// merge with the patch taking precedence.
    pub fn merge(&mut self, patch: RecordDraft) {
        let body = if patch.content.is_some() || patch.text.is_some() || patch.abstract_.is_some()
        {
            Some(patch.body().to_string())
        } else {
            None
        };
        if patch.id.is_some() {
            self.id = patch.id;
        }
        if patch.uri.is_some() {
            self.uri = patch.uri;
        }
        if let Some(body) = body {
            self.content = Some(body);
            self.text = None;
            self.abstract_ = None;
        }
        if patch.title.is_some() {
            self.title = patch.title;
        }
        if patch.context_type.is_some() {
            self.context_type = patch.context_type;
        }
        for (k, v) in patch.extra {
            self.extra.insert(k, v);
        }
    }
}

/// Collection metadata returned by `collection_info`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub notebook_id: String,
    pub title: String,
    pub source_count: usize,
    pub status: String,
}

/// Aggregate storage statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub collections: usize,
    pub total_records: usize,
    pub backend: String,
    pub tier_config: crate::naming::TierThresholds,
}
