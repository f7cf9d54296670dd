//! Vector memory implementations for IronJudge.

pub mod in_memory;
pub mod vector;

pub use in_memory::InMemoryVectorStore;
pub use vector::{HashEmbedder, cosine_similarity, top_k};
