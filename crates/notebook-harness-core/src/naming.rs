//! Source-name codec and tier policy.
//!
//! The backing service knows nothing about records; it stores opaque
//! sources with a title. The adapter packs record metadata into that title
//! using a configurable delimited pattern, default
//! `{tier}-{context_type}-{uri_hash}-{title}-{status}`, and recovers it
//! when the service hands titles back in query results.
//!
//! Decoding assumes the default field order: it splits on `-` and requires
//! at least five parts, with the first parsing as a tier label. The title
//! occupies the middle parts rejoined, so titles containing the delimiter
//! survive the round trip; a context type containing `-` does not. Anything
//! that fails this shape is rejected and callers fall back to treating the
//! whole string as a raw title.
//!
//! # Example
//!
//! ```rust
//! use notebook_harness_core::models::Tier;
//! use notebook_harness_core::naming::{SourceName, DEFAULT_PATTERN};
//!
//! let name = SourceName {
//!     tier: Tier::L1,
//!     context_type: "resource".to_string(),
//!     uri_hash: "abcd1234".to_string(),
//!     title: "deploy-runbook".to_string(),
//!     status: "ACTIVE".to_string(),
//! };
//! let encoded = name.encode(DEFAULT_PATTERN);
//! assert_eq!(encoded, "L1-resource-abcd1234-deploy-runbook-ACTIVE");
//! assert_eq!(SourceName::parse(&encoded), Some(name));
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::Tier;

/// Default source-name pattern.
pub const DEFAULT_PATTERN: &str = "{tier}-{context_type}-{uri_hash}-{title}-{status}";

/// Status flag for live sources.
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Titles are truncated to this many characters before encoding.
pub const TITLE_MAX_CHARS: usize = 50;

/// Length of the truncated URI hash, in hex characters.
pub const URI_HASH_LEN: usize = 8;

/// Decoded form of a source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceName {
    pub tier: Tier,
    pub context_type: String,
    pub uri_hash: String,
    pub title: String,
    pub status: String,
}

impl SourceName {
    /// Render the name through `pattern`, substituting the five
    /// placeholders. Unknown placeholders are left verbatim.
    pub fn encode(&self, pattern: &str) -> String {
        pattern
            .replace("{tier}", self.tier.as_str())
            .replace("{context_type}", &self.context_type)
            .replace("{uri_hash}", &self.uri_hash)
            .replace("{title}", &self.title)
            .replace("{status}", &self.status)
    }

    /// Decode a source name produced with the default field order.
    ///
    /// Returns `None` when the string does not split into at least five
    /// parts or the leading part is not a tier label.
    pub fn parse(s: &str) -> Option<SourceName> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() < 5 {
            return None;
        }
        let tier = Tier::parse(parts[0])?;
        Some(SourceName {
            tier,
            context_type: parts[1].to_string(),
            uri_hash: parts[2].to_string(),
            title: parts[3..parts.len() - 1].join("-"),
            status: parts[parts.len() - 1].to_string(),
        })
    }
}

/// Short hash of a URI for source naming: the first [`URI_HASH_LEN`] hex
/// characters of its SHA-256 digest.
pub fn uri_hash(uri: &str) -> String {
    let digest = Sha256::digest(uri.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(URI_HASH_LEN);
    hash
}

/// Derive a display title from a URI: the final `/` segment, or the whole
/// URI when it has none.
pub fn title_from_uri(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// Truncate a title to [`TITLE_MAX_CHARS`] characters (not bytes).
pub fn truncate_title(title: &str) -> String {
    title.chars().take(TITLE_MAX_CHARS).collect()
}

/// Word-count thresholds for the three tiers.
///
/// `l2` is carried for reporting parity only; `0` means unlimited and the
/// classification never consults it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    #[serde(rename = "L0")]
    pub l0: u32,
    #[serde(rename = "L1")]
    pub l1: u32,
    #[serde(rename = "L2")]
    pub l2: u32,
}

impl TierThresholds {
    /// Classify a word count: `<= l0` is L0, else `<= l1` is L1, else L2.
    /// Ties resolve to the lower tier.
    pub fn classify(&self, words: u32) -> Tier {
        if words <= self.l0 {
            Tier::L0
        } else if words <= self.l1 {
            Tier::L1
        } else {
            Tier::L2
        }
    }
}

/// Count whitespace-separated words, the unit tier thresholds are
/// expressed in.
pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
