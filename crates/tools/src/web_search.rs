//! Web search tool: DuckDuckGo instant-answer API.
//!
//! Collects the abstract, direct results and related topics of the query
//! and renders up to five of them as `Title / Snippet / URL` blocks.

use std::time::Duration;

use async_trait::async_trait;
use ironjudge_core::error::ToolError;
use ironjudge_core::tool::Tool;
use serde::Deserialize;
use tracing::debug;

const MAX_RESULTS: usize = 5;

pub struct WebSearchTool {
    endpoint: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ironjudge/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Payload: The search query string.\n   - Use: Fetching real-time facts, reference data, or documentation from the web."
    }

    async fn invoke(&self, payload: &str) -> Result<String, ToolError> {
        let query = payload.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidPayload(
                "Invalid payload for web_search. Expected: query".into(),
            ));
        }

        debug!(query, endpoint = %self.endpoint, "Searching the web");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let body: InstantAnswer = match response {
            Ok(r) => match r.json().await {
                Ok(body) => body,
                Err(e) => return Ok(format!("[ERROR] Web search failed: {e}")),
            },
            Err(e) => return Ok(format!("[ERROR] Web search failed: {e}")),
        };

        Ok(render_results(query, &collect_hits(body, MAX_RESULTS)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchHit {
    title: String,
    snippet: String,
    url: String,
}

fn render_results(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("[SUCCESS] No results found for query: {query}");
    }
    hits.iter()
        .map(|h| format!("Title: {}\nSnippet: {}\nURL: {}", h.title, h.snippet, h.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_hits(answer: InstantAnswer, limit: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    if !answer.abstract_text.is_empty() {
        hits.push(SearchHit {
            title: if answer.heading.is_empty() {
                answer.abstract_source.clone()
            } else {
                answer.heading.clone()
            },
            snippet: answer.abstract_text.clone(),
            url: answer.abstract_url.clone(),
        });
    }

    let topics = answer
        .results
        .into_iter()
        .chain(answer.related_topics.into_iter().flat_map(Topic::flatten));

    for topic in topics {
        if hits.len() >= limit {
            break;
        }
        if topic.text.is_empty() || topic.first_url.is_empty() {
            continue;
        }
        // Topic text reads "Title - description"; fall back to the whole text.
        let title = topic
            .text
            .split_once(" - ")
            .map(|(t, _)| t.to_string())
            .unwrap_or_else(|| topic.text.clone());
        hits.push(SearchHit {
            title,
            snippet: topic.text,
            url: topic.first_url,
        });
    }

    hits.truncate(limit);
    hits
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    abstract_source: String,
    #[serde(default)]
    results: Vec<Topic>,
    #[serde(default)]
    related_topics: Vec<Topic>,
}

/// A related topic, or a named group of nested topics.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Topic {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "FirstURL")]
    first_url: String,
    #[serde(default)]
    topics: Vec<Topic>,
}

impl Topic {
    fn flatten(self) -> Vec<Topic> {
        if self.topics.is_empty() {
            vec![self]
        } else {
            self.topics.into_iter().flat_map(Topic::flatten).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Heading": "Rust (programming language)",
        "AbstractText": "Rust is a general-purpose programming language.",
        "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
        "AbstractSource": "Wikipedia",
        "Results": [
            {"Text": "Official site - Rust", "FirstURL": "https://www.rust-lang.org/"}
        ],
        "RelatedTopics": [
            {"Text": "Cargo - The Rust package manager", "FirstURL": "https://duckduckgo.com/Cargo"},
            {"Name": "Tools", "Topics": [
                {"Text": "Clippy - A linter", "FirstURL": "https://duckduckgo.com/Clippy"},
                {"Text": "rustfmt - A formatter", "FirstURL": "https://duckduckgo.com/rustfmt"}
            ]},
            {"Text": "Miri - An interpreter", "FirstURL": "https://duckduckgo.com/Miri"}
        ]
    }"#;

    #[test]
    fn collects_abstract_results_and_nested_topics() {
        let answer: InstantAnswer = serde_json::from_str(SAMPLE).unwrap();
        let hits = collect_hits(answer, MAX_RESULTS);
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].title, "Rust (programming language)");
        assert_eq!(hits[1].title, "Official site");
        assert_eq!(hits[2].url, "https://duckduckgo.com/Cargo");
        assert_eq!(hits[3].title, "Clippy");
        assert_eq!(hits[4].title, "rustfmt");
    }

    #[test]
    fn renders_blocks() {
        let hits = vec![
            SearchHit {
                title: "A".into(),
                snippet: "first".into(),
                url: "https://a".into(),
            },
            SearchHit {
                title: "B".into(),
                snippet: "second".into(),
                url: "https://b".into(),
            },
        ];
        assert_eq!(
            render_results("q", &hits),
            "Title: A\nSnippet: first\nURL: https://a\n\nTitle: B\nSnippet: second\nURL: https://b"
        );
    }

    #[test]
    fn empty_answer_reports_no_results() {
        let answer: InstantAnswer = serde_json::from_str("{}").unwrap();
        let hits = collect_hits(answer, MAX_RESULTS);
        assert_eq!(
            render_results("zzqx", &hits),
            "[SUCCESS] No results found for query: zzqx"
        );
    }

    #[tokio::test]
    async fn empty_query_rejected() {
        let tool = WebSearchTool::new("http://127.0.0.1:9", Duration::from_secs(1));
        assert!(matches!(
            tool.invoke("   ").await,
            Err(ToolError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_failure() {
        let tool = WebSearchTool::new("http://127.0.0.1:9/", Duration::from_secs(2));
        let out = tool.invoke("rust").await.unwrap();
        assert!(out.starts_with("[ERROR] Web search failed:"), "{out}");
    }
}
