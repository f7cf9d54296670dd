//! LLM Provider implementations for IronJudge.
//!
//! All providers implement the `ironjudge_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
