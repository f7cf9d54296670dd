//! In-process vector store, the memory backing `memory_store` and
//! `memory_query`. Contents live for the lifetime of the process.

use async_trait::async_trait;
use chrono::Utc;
use ironjudge_core::error::MemoryError;
use ironjudge_core::memory::{MemoryMatch, MemoryRecord, Metadata, VectorMemory};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::vector::{HashEmbedder, top_k};

struct StoredVector {
    record: MemoryRecord,
    embedding: Vec<f32>,
}

/// A vector store keeping records and their embeddings in a Vec.
#[derive(Clone)]
pub struct InMemoryVectorStore {
    embedder: HashEmbedder,
    entries: Arc<RwLock<Vec<StoredVector>>>,
}

impl InMemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            embedder: HashEmbedder::new(dimensions),
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl VectorMemory for InMemoryVectorStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(&self, id: &str, text: &str, metadata: Metadata) -> Result<(), MemoryError> {
        if id.is_empty() {
            return Err(MemoryError::Storage("memory id must not be empty".into()));
        }

        let embedding = self.embedder.embed(text);
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.record.id == id) {
            return Err(MemoryError::Duplicate(id.to_string()));
        }

        entries.push(StoredVector {
            record: MemoryRecord {
                id: id.to_string(),
                text: text.to_string(),
                metadata,
                created_at: Utc::now(),
            },
            embedding,
        });
        debug!(id, total = entries.len(), "Stored memory fragment");
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<MemoryMatch>, MemoryError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(text);
        let entries = self.entries.read().await;
        let ranked = top_k(entries.iter().map(|e| e.embedding.as_slice()), &query, k);

        Ok(ranked
            .into_iter()
            .map(|(index, score)| MemoryMatch {
                record: entries[index].record.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }
}
