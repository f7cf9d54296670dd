//! Shared test helpers for engine tests.

use ironjudge_core::error::ProviderError;
use ironjudge_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted outcomes.
///
/// Each call to `complete` returns the next outcome in the queue. Once the
/// queue is exhausted the last outcome repeats, so "always TERMINATE" is a
/// one-element script.
pub struct SequentialMockProvider {
    outcomes: Vec<Result<String, ProviderError>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        assert!(!outcomes.is_empty(), "SequentialMockProvider needs at least one outcome");
        Self {
            outcomes,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Responds with `texts` in order, then repeats the last one.
    pub fn texts<S: AsRef<str>>(texts: &[S]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.as_ref().to_string())).collect())
    }

    pub fn always(text: &str) -> Self {
        Self::texts(&[text])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };

        let outcome = &self.outcomes[call.min(self.outcomes.len() - 1)];
        match outcome {
            Ok(text) => Ok(make_text_response(text)),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        model: "mock-model".into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

/// A well-formed response with the given directive and optional tool call.
pub fn directive(enforcement: &str, tool: Option<(&str, &str)>) -> String {
    let tool_block = tool
        .map(|(name, payload)| {
            format!("<tool_required>{name}</tool_required>\n<tool_payload>{payload}</tool_payload>\n")
        })
        .unwrap_or_default();
    format!(
        "<judge_process>\n\
         <state_memory>working</state_memory>\n\
         <logical_extern>reasoning for {enforcement}</logical_extern>\n\
         <verdict>decided</verdict>\n\
         {tool_block}</judge_process>\n\
         [ENFORCE: {enforcement}]"
    )
}
