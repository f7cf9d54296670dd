//! Protocol parser: turns free-text model output into a [`ParsedDirective`].
//!
//! The model answers inside a `<judge_process>` block made of tagged
//! fields, followed by one `[ENFORCE: <DIRECTIVE>]` marker:
//!
//! ```text
//! <state_memory>what I know</state_memory>
//! <logical_extern>why I act</logical_extern>
//! <verdict>what I decided</verdict>
//! <tool_required>bash</tool_required>
//! <tool_payload>ls -la</tool_payload>
//! [ENFORCE: PROCEED]
//! ```
//!
//! Parsing is pure: no I/O, no state. A response that cannot be read as a
//! directive yields a [`FormatViolation`] the engine feeds back to the model.

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// The control directive closing every model turn.
///
/// `Proceed`, `Purge` and `Pivot` currently drive the loop identically;
/// only `Terminate` ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Enforcement {
    Proceed,
    Purge,
    Pivot,
    Terminate,
}

impl Enforcement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proceed => "PROCEED",
            Self::Purge => "PURGE",
            Self::Pivot => "PIVOT",
            Self::Terminate => "TERMINATE",
        }
    }

    fn from_marker(s: &str) -> Option<Self> {
        match s {
            "PROCEED" => Some(Self::Proceed),
            "PURGE" => Some(Self::Purge),
            "PIVOT" => Some(Self::Pivot),
            "TERMINATE" => Some(Self::Terminate),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminate)
    }
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirective {
    pub state_memory: Option<String>,
    pub logical_extern: Option<String>,
    pub verdict: Option<String>,
    pub tool_required: Option<String>,
    pub tool_payload: Option<String>,
    pub enforcement: Enforcement,
}

/// Why a model response was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatViolation {
    #[error(
        "Missing structural XML tags. The response must use <judge_process> and include \
         <state_memory>, <logical_extern>, and <verdict> blocks."
    )]
    MissingStructure,

    #[error(
        "Missing or invalid enforcement tag. Expected exactly one of: [ENFORCE: PROCEED], \
         [ENFORCE: PURGE], [ENFORCE: PIVOT], or [ENFORCE: TERMINATE]."
    )]
    MissingEnforcement,
}

const FIELD_TAGS: [&str; 5] = [
    "state_memory",
    "logical_extern",
    "verdict",
    "tool_required",
    "tool_payload",
];

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(state_memory|logical_extern|verdict|tool_required|tool_payload)>")
        .expect("static field pattern")
});

static ENFORCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[ENFORCE:\s*(PROCEED|PURGE|PIVOT|TERMINATE)\]").expect("static enforce pattern")
});

/// Scan `raw` left to right for `<tag>…</tag>` blocks, trimmed.
///
/// Blocks never overlap: tags inside a matched block are part of its
/// content. An opening tag without its closing tag is skipped. When a tag
/// repeats at top level the last block wins.
fn extract_fields(raw: &str) -> [Option<String>; 5] {
    let mut fields: [Option<String>; 5] = Default::default();
    let mut pos = 0;

    while let Some(caps) = OPEN_TAG.captures(&raw[pos..]) {
        let (Some(open), Some(tag)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let tag = tag.as_str();
        let body_start = pos + open.end();
        let close = format!("</{tag}>");

        match raw[body_start..].find(&close) {
            Some(len) => {
                if let Some(slot) = FIELD_TAGS.iter().position(|t| *t == tag) {
                    fields[slot] = Some(raw[body_start..body_start + len].trim().to_string());
                }
                pos = body_start + len + close.len();
            }
            None => pos = body_start,
        }
    }

    fields
}

/// Parse a raw model response.
///
/// Fails when neither `<state_memory>` nor `<verdict>` is present, or when
/// no valid `[ENFORCE: …]` marker exists. If several markers appear the
/// first one is authoritative.
pub fn parse(raw: &str) -> Result<ParsedDirective, FormatViolation> {
    let [state_memory, logical_extern, verdict, tool_required, tool_payload] = extract_fields(raw);

    if state_memory.is_none() && verdict.is_none() {
        return Err(FormatViolation::MissingStructure);
    }

    let mut markers = ENFORCE_PATTERN
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| Enforcement::from_marker(m.as_str()));

    let enforcement = markers.next().ok_or(FormatViolation::MissingEnforcement)?;

    let extra = markers.count();
    if extra > 0 {
        warn!(
            chosen = %enforcement,
            ignored = extra,
            "Multiple enforcement markers in response; using the first"
        );
    }

    Ok(ParsedDirective {
        state_memory,
        logical_extern,
        verdict,
        tool_required,
        tool_payload,
        enforcement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_five_fields() {
        let raw = "<judge_process>\n\
            <state_memory>Disk is at 91%</state_memory>\n\
            <logical_extern>Old logs are the largest directory</logical_extern>\n\
            <verdict>Rotate logs</verdict>\n\
            <tool_required>bash</tool_required>\n\
            <tool_payload>du -sh /var/log</tool_payload>\n\
            </judge_process>\n[ENFORCE: PIVOT]";

        let d = parse(raw).unwrap();
        assert_eq!(d.state_memory.as_deref(), Some("Disk is at 91%"));
        assert_eq!(d.logical_extern.as_deref(), Some("Old logs are the largest directory"));
        assert_eq!(d.verdict.as_deref(), Some("Rotate logs"));
        assert_eq!(d.tool_required.as_deref(), Some("bash"));
        assert_eq!(d.tool_payload.as_deref(), Some("du -sh /var/log"));
        assert_eq!(d.enforcement, Enforcement::Pivot);
    }

    #[test]
    fn no_structural_tags() {
        let err = parse("Sure! I'll just run ls. [ENFORCE: PROCEED]").unwrap_err();
        assert_eq!(err, FormatViolation::MissingStructure);
        assert!(err.to_string().starts_with("Missing structural XML tags"));
    }

    #[test]
    fn logical_extern_alone_is_not_enough() {
        let err = parse("<logical_extern>x</logical_extern>[ENFORCE: PROCEED]").unwrap_err();
        assert_eq!(err, FormatViolation::MissingStructure);
    }

    #[test]
    fn missing_marker() {
        let err = parse("<verdict>done</verdict>").unwrap_err();
        assert_eq!(err, FormatViolation::MissingEnforcement);
        assert!(err.to_string().contains("[ENFORCE: TERMINATE]"));
    }

    #[test]
    fn marker_is_case_sensitive() {
        let err = parse("<verdict>done</verdict>[ENFORCE: terminate]").unwrap_err();
        assert_eq!(err, FormatViolation::MissingEnforcement);
        let err = parse("<verdict>done</verdict>[ENFORCE: STOP]").unwrap_err();
        assert_eq!(err, FormatViolation::MissingEnforcement);
    }

    #[test]
    fn marker_whitespace_is_optional() {
        let d = parse("<verdict>ok</verdict>[ENFORCE:TERMINATE]").unwrap();
        assert_eq!(d.enforcement, Enforcement::Terminate);
        let d = parse("<verdict>ok</verdict>[ENFORCE:\n  PURGE]").unwrap();
        assert_eq!(d.enforcement, Enforcement::Purge);
    }

    #[test]
    fn first_marker_wins() {
        let d = parse("<verdict>v</verdict>[ENFORCE: PROCEED] then [ENFORCE: TERMINATE]").unwrap();
        assert_eq!(d.enforcement, Enforcement::Proceed);
    }

    #[test]
    fn last_duplicate_tag_wins() {
        let raw = "<verdict>first</verdict><verdict>second</verdict>[ENFORCE: PROCEED]";
        assert_eq!(parse(raw).unwrap().verdict.as_deref(), Some("second"));
    }

    #[test]
    fn multiline_content_is_trimmed() {
        let raw = "<state_memory>\n  line one\n  line two\n</state_memory>\n[ENFORCE: PROCEED]";
        let d = parse(raw).unwrap();
        assert_eq!(d.state_memory.as_deref(), Some("line one\n  line two"));
        assert!(d.verdict.is_none());
        assert!(d.tool_required.is_none());
    }

    #[test]
    fn payload_keeps_inner_markup() {
        let raw = "<verdict>write</verdict><tool_required>write_file</tool_required>\
                   <tool_payload>index.html|<p>hi</p></tool_payload>[ENFORCE: PROCEED]";
        let d = parse(raw).unwrap();
        assert_eq!(d.tool_payload.as_deref(), Some("index.html|<p>hi</p>"));
    }

    #[test]
    fn tags_inside_payload_stay_in_payload() {
        let raw = "<judge_process>\n\
            <state_memory>drafting</state_memory>\n\
            <verdict>write the template</verdict>\n\
            <tool_required>write_file</tool_required>\n\
            <tool_payload>prompt.md|Answer inside <verdict>...</verdict></tool_payload>\n\
            </judge_process>[ENFORCE: PROCEED]";
        let d = parse(raw).unwrap();
        assert_eq!(d.verdict.as_deref(), Some("write the template"));
        assert_eq!(
            d.tool_payload.as_deref(),
            Some("prompt.md|Answer inside <verdict>...</verdict>")
        );
    }

    #[test]
    fn nested_tags_do_not_supply_structure() {
        let raw = "<tool_payload>notes.md|<state_memory>x</state_memory><verdict>y</verdict></tool_payload>\
                   [ENFORCE: PROCEED]";
        assert_eq!(parse(raw).unwrap_err(), FormatViolation::MissingStructure);
    }

    #[test]
    fn unclosed_tag_is_skipped() {
        let raw = "<state_memory>never closed <verdict>ok</verdict>[ENFORCE: TERMINATE]";
        let d = parse(raw).unwrap();
        assert!(d.state_memory.is_none());
        assert_eq!(d.verdict.as_deref(), Some("ok"));
    }

    #[test]
    fn enforcement_serializes_upper() {
        assert_eq!(serde_json::to_string(&Enforcement::Terminate).unwrap(), r#""TERMINATE""#);
        assert_eq!(Enforcement::Pivot.to_string(), "PIVOT");
        assert!(Enforcement::Terminate.is_terminal());
        assert!(!Enforcement::Purge.is_terminal());
    }
}
