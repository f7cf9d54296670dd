//! Memory tools: push facts into and pull them back out of vector memory.

use std::sync::Arc;

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::memory::{Metadata, VectorMemory};
use ironjudge_core::tool::Tool;

use crate::payload::{MemoryQueryPayload, MemoryStorePayload, ToolPayload};

pub struct MemoryStoreTool {
    memory: Arc<dyn VectorMemory>,
}

impl MemoryStoreTool {
    pub fn new(memory: Arc<dyn VectorMemory>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for MemoryStoreTool {
    fn name(&self) -> &str {
        "memory_store"
    }

    fn description(&self) -> &str {
        "Payload: document_text|[type_tag]\n   - Use: Pushing a factual event or code snippet into Long-Term Vector Memory."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let MemoryStorePayload { text, kind } = MemoryStorePayload::parse(payload)?;
        let id = uuid::Uuid::new_v4().to_string();

        let mut metadata = Metadata::new();
        metadata.insert("type".into(), kind);

        match self.memory.store(&id, &text, metadata).await {
            Ok(()) => Ok(format!("[SUCCESS] Stored memory fragment {id} into Vector DB.")),
            Err(e) => Ok(format!("[ERROR] Failed to store memory: {e}")),
        }
    }
}

pub struct MemoryQueryTool {
    memory: Arc<dyn VectorMemory>,
}

impl MemoryQueryTool {
    pub fn new(memory: Arc<dyn VectorMemory>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for MemoryQueryTool {
    fn name(&self) -> &str {
        "memory_query"
    }

    fn description(&self) -> &str {
        "Payload: semantic_search_query|[count]\n   - Use: Retrieving historical actions or state using semantic RAG from Vector Memory to avoid context bloat."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let MemoryQueryPayload { query, count } = MemoryQueryPayload::parse(payload)?;

        let hits = match self.memory.query(&query, count).await {
            Ok(hits) => hits,
            Err(e) => return Ok(format!("[ERROR] Memory Query Failed: {e}")),
        };

        if hits.is_empty() {
            return Ok("No relevant memories found.".into());
        }

        Ok(hits
            .iter()
            .map(|hit| format!("[{}] {}", hit.kind(), hit.record.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironjudge_memory::InMemoryVectorStore;

    #[tokio::test]
    async fn store_then_query() {
        let memory: Arc<dyn VectorMemory> = Arc::new(InMemoryVectorStore::new(512));
        let store = MemoryStoreTool::new(memory.clone());
        let query = MemoryQueryTool::new(memory.clone());

        let out = store
            .invoke("The staging database listens on port 5433|infra")
            .await
            .unwrap();
        assert!(out.starts_with("[SUCCESS] Stored memory fragment "), "{out}");
        assert!(out.ends_with(" into Vector DB."));

        store.invoke("Lunch is at noon").await.unwrap();

        let out = query.invoke("staging database port|1").await.unwrap();
        assert_eq!(out, "[infra] The staging database listens on port 5433");
    }

    #[tokio::test]
    async fn query_joins_with_blank_lines() {
        let memory: Arc<dyn VectorMemory> = Arc::new(InMemoryVectorStore::default());
        let store = MemoryStoreTool::new(memory.clone());
        store.invoke("alpha fact").await.unwrap();
        store.invoke("beta fact").await.unwrap();

        let out = MemoryQueryTool::new(memory).invoke("fact").await.unwrap();
        assert_eq!(out.split("\n\n").count(), 2);
        assert!(out.contains("[general] "));
    }

    #[tokio::test]
    async fn empty_memory() {
        let memory: Arc<dyn VectorMemory> = Arc::new(InMemoryVectorStore::default());
        let out = MemoryQueryTool::new(memory).invoke("anything").await.unwrap();
        assert_eq!(out, "No relevant memories found.");
    }

    #[tokio::test]
    async fn bad_count_is_invalid_payload() {
        let memory: Arc<dyn VectorMemory> = Arc::new(InMemoryVectorStore::default());
        let result = MemoryQueryTool::new(memory).invoke("x|lots").await;
        assert!(matches!(result, Err(ToolError::InvalidPayload(_))));
    }
}
