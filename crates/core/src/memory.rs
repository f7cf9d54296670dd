//! Memory trait: semantic storage the memory tools read and write.
//!
//! A `VectorMemory` is constructed by the host and handed to the
//! `memory_store` / `memory_query` tools. Nothing in the engine holds one
//! globally.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Free-form string metadata attached to a stored fragment (e.g. `type`).
pub type Metadata = BTreeMap<String, String>;

/// A stored text fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID for this fragment
    pub id: String,

    /// The stored text
    pub text: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,

    /// When this fragment was stored
    pub created_at: DateTime<Utc>,
}

/// A query hit: the record plus its similarity to the query text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub record: MemoryRecord,

    /// Cosine similarity in `[-1, 1]`; higher is closer.
    pub score: f32,
}

impl MemoryMatch {
    /// The `type` metadata value, `general` when absent.
    pub fn kind(&self) -> &str {
        self.record
            .metadata
            .get("type")
            .map(String::as_str)
            .unwrap_or("general")
    }
}

/// The core VectorMemory trait.
///
/// Implementations: in-process hashed embeddings (`ironjudge-memory`).
#[async_trait]
pub trait VectorMemory: Send + Sync {
    /// The backend name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Store `text` under `id`. Ids are unique.
    async fn store(&self, id: &str, text: &str, metadata: Metadata) -> Result<(), MemoryError>;

    /// Return up to `k` records ranked by similarity to `text`.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<MemoryMatch>, MemoryError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(metadata: Metadata) -> MemoryRecord {
        MemoryRecord {
            id: "mem_001".into(),
            text: "The deploy key lives in vault".into(),
            metadata,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn kind_defaults_to_general() {
        let hit = MemoryMatch {
            record: record(Metadata::new()),
            score: 0.5,
        };
        assert_eq!(hit.kind(), "general");
    }

    #[test]
    fn kind_reads_type_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert("type".into(), "credential".into());
        let hit = MemoryMatch {
            record: record(metadata),
            score: 0.9,
        };
        assert_eq!(hit.kind(), "credential");
    }

    #[test]
    fn record_serialization_skips_empty_metadata() {
        let json = serde_json::to_string(&record(Metadata::new())).unwrap();
        assert!(json.contains("deploy key"));
        assert!(!json.contains("metadata"));
    }
}
