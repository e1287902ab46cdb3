//! Recover a JSON payload from raw model output.
//!
//! Models wrap JSON in prose or markdown even when told not to. Extraction
//! runs an ordered chain of strategies and takes the first that yields valid
//! JSON.

use serde_json::Value;
use waypoint_core::PipelineError;

/// One way of finding JSON inside model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The whole text is JSON.
    Direct,
    /// The interior of a fenced block labelled `json`.
    FencedBlock,
    /// From the first `{` through the last `}`.
    BraceSpan,
}

impl Strategy {
    /// Strategies in the order they are attempted.
    pub const CHAIN: [Strategy; 3] = [Strategy::Direct, Strategy::FencedBlock, Strategy::BraceSpan];

    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::FencedBlock => "fenced_block",
            Strategy::BraceSpan => "brace_span",
        }
    }

    /// Candidate text this strategy would parse, if it applies at all.
    fn candidate<'a>(&self, raw: &'a str) -> Option<&'a str> {
        match self {
            Strategy::Direct => Some(raw.trim()),
            Strategy::FencedBlock => json_fence_interior(raw),
            Strategy::BraceSpan => brace_span(raw),
        }
    }

    pub fn apply(&self, raw: &str) -> Option<Value> {
        let candidate = self.candidate(raw)?;
        if candidate.is_empty() {
            return None;
        }
        serde_json::from_str(candidate).ok()
    }
}

/// Extract a JSON value, recording which strategy succeeded.
pub fn extract_json_with_strategy(raw: &str) -> Result<(Value, Strategy), PipelineError> {
    Strategy::CHAIN
        .iter()
        .find_map(|strategy| strategy.apply(raw).map(|value| (value, *strategy)))
        .ok_or_else(|| PipelineError::upstream_format(raw))
}

/// Extract a JSON value from model output, or fail with the raw text attached.
pub fn extract_json(raw: &str) -> Result<Value, PipelineError> {
    let (value, strategy) = extract_json_with_strategy(raw)?;
    tracing::debug!(strategy = strategy.label(), "extracted upstream JSON");
    Ok(value)
}

/// Interior of the first fenced block whose info string is `json`.
///
/// Every triple backtick is tried as an opener; inline runs and other languages are skipped.
fn json_fence_interior(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find("```") {
        let open = search_from + rel + 3;
        search_from = open;
        let rest = &text[open..];
        let Some(line_end) = rest.find('\n') else {
            break;
        };
        if !rest[..line_end].trim().eq_ignore_ascii_case("json") {
            continue;
        }
        let body = &rest[line_end + 1..];
        return body.find("```").map(|close| body[..close].trim());
    }
    None
}

/// Span from the first `{` through the last `}`.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waypoint_core::ErrorKind;

    const BARE: &str = r#"{"title":"T","modules":[]}"#;

    #[test]
    fn parses_bare_json_directly() {
        let (value, strategy) = extract_json_with_strategy(BARE).unwrap();
        assert_eq!(value, json!({ "title": "T", "modules": [] }));
        assert_eq!(strategy, Strategy::Direct);
    }

    #[test]
    fn parses_json_fenced_block() {
        let raw = format!("```json\n{}\n```", BARE);
        let (value, strategy) = extract_json_with_strategy(&raw).unwrap();
        assert_eq!(value, json!({ "title": "T", "modules": [] }));
        assert_eq!(strategy, Strategy::FencedBlock);
    }

    #[test]
    fn fenced_block_skips_other_languages() {
        let raw = format!(
            "Example:\n```text\nnot this\n```\nAnswer:\n```JSON\n{}\n```\nDone.",
            BARE
        );
        let (_, strategy) = extract_json_with_strategy(&raw).unwrap();
        assert_eq!(strategy, Strategy::FencedBlock);
    }

    #[test]
    fn inline_backticks_before_the_block_are_skipped() {
        let raw = format!(
            "Wrap identifiers in ``` marks ``` like this.\n```json\n{}\n```",
            BARE
        );
        let (value, strategy) = extract_json_with_strategy(&raw).unwrap();
        assert_eq!(value, json!({ "title": "T", "modules": [] }));
        assert_eq!(strategy, Strategy::FencedBlock);

        let raw = format!("Stray ``` first.\n```json\n{}\n```", BARE);
        let (_, strategy) = extract_json_with_strategy(&raw).unwrap();
        assert_eq!(strategy, Strategy::FencedBlock);
    }

    #[test]
    fn parses_embedded_object_from_prose() {
        let raw = format!("Here you go: {} thanks", BARE);
        let (value, strategy) = extract_json_with_strategy(&raw).unwrap();
        assert_eq!(value, json!({ "title": "T", "modules": [] }));
        assert_eq!(strategy, Strategy::BraceSpan);
    }

    #[test]
    fn braces_inside_strings_survive_span_extraction() {
        let raw = r#"Sure! {"title":"Sets {a, b}","modules":[]} hope it helps"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["title"], "Sets {a, b}");
    }

    #[test]
    fn unparsable_text_is_a_format_error() {
        let err = extract_json("not json at all").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamFormatError);
        assert_eq!(err.diagnostic.as_deref(), Some("not json at all"));
    }

    #[test]
    fn broken_fence_and_span_fail_together() {
        let err = extract_json("```json\n{\"title\": \n```").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamFormatError);

        let err = extract_json("} backwards {").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UpstreamFormatError);
    }

    #[test]
    fn empty_text_is_a_format_error() {
        assert!(extract_json("   ").is_err());
    }
}
