//! # IronJudge Core
//!
//! Domain types, traits and errors for the IronJudge execution
//! runtime. Every collaborator the engine talks to (completion service,
//! tools, vector memory) is defined as a trait here; implementations live in
//! their respective crates.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, ToolError};
pub use memory::{MemoryMatch, MemoryRecord, Metadata, VectorMemory};
pub use message::{ImageAttachment, Message, Role};
pub use provider::{API_ERROR_MARKER, Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{FnTool, Tool, ToolDescriptor, ToolRegistry, registry_miss_message, tool_failure_message};
