//! Inbound request model and validation.

use crate::error::{PipelineError, Violation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum topic length in characters, after trimming.
pub const MAX_TOPIC_CHARS: usize = 200;

/// Maximum number of prior roadmap titles a caller may send.
pub const MAX_EXISTING_TITLES: usize = 50;

/// A validated generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_titles: Option<Vec<String>>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            existing_titles: None,
        }
    }

    pub fn with_existing_titles(mut self, titles: Vec<String>) -> Self {
        self.existing_titles = Some(titles);
        self
    }

    /// Prior titles, empty when none were sent.
    pub fn prior_titles(&self) -> &[String] {
        self.existing_titles.as_deref().unwrap_or(&[])
    }
}

/// Parse and validate a raw request body.
pub fn validate_request_bytes(body: &[u8]) -> Result<GenerationRequest, PipelineError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        PipelineError::validation(vec![Violation::new(
            "",
            "json",
            format!("Request body is not valid JSON: {}", e),
        )])
    })?;
    validate_request(&value)
}

/// Validate an already-parsed request body, reporting every failing rule.
pub fn validate_request(raw: &Value) -> Result<GenerationRequest, PipelineError> {
    let Some(obj) = raw.as_object() else {
        return Err(PipelineError::validation(vec![Violation::new(
            "",
            "object",
            "Request body must be a JSON object",
        )]));
    };

    let mut violations = Vec::new();

    let topic = match obj.get("topic") {
        None | Some(Value::Null) => {
            violations.push(Violation::new("topic", "required", "topic is required"));
            None
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                violations.push(Violation::new(
                    "topic",
                    "non_empty",
                    "topic must not be empty",
                ));
                None
            } else if trimmed.chars().count() > MAX_TOPIC_CHARS {
                violations.push(Violation::new(
                    "topic",
                    "max_length",
                    format!("topic must be at most {} characters", MAX_TOPIC_CHARS),
                ));
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            violations.push(Violation::new("topic", "type", "topic must be a string"));
            None
        }
    };

    let existing_titles = match obj.get("existingTitles") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            if items.len() > MAX_EXISTING_TITLES {
                violations.push(Violation::new(
                    "existingTitles",
                    "max_items",
                    format!(
                        "existingTitles must contain at most {} entries",
                        MAX_EXISTING_TITLES
                    ),
                ));
            }
            let mut titles = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                match item.as_str() {
                    Some(title) => titles.push(title.to_string()),
                    None => violations.push(Violation::new(
                        format!("existingTitles[{}]", idx),
                        "type",
                        "each existing title must be a string",
                    )),
                }
            }
            Some(titles)
        }
        Some(_) => {
            violations.push(Violation::new(
                "existingTitles",
                "type",
                "existingTitles must be an array of strings",
            ));
            None
        }
    };

    match topic {
        Some(topic) if violations.is_empty() => Ok(GenerationRequest {
            topic,
            existing_titles,
        }),
        _ => Err(PipelineError::validation(violations)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn fields(err: &PipelineError) -> Vec<&str> {
        err.details.iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn accepts_plain_topic() {
        let req = validate_request(&json!({ "topic": "Rust" })).unwrap();
        assert_eq!(req.topic, "Rust");
        assert!(req.prior_titles().is_empty());
    }

    #[test]
    fn rejects_empty_topic() {
        let err = validate_request(&json!({ "topic": "" })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(fields(&err), vec!["topic"]);
    }

    #[test]
    fn rejects_whitespace_topic() {
        let err = validate_request(&json!({ "topic": "   \n" })).unwrap_err();
        assert_eq!(err.details[0].rule, "non_empty");
    }

    #[test]
    fn rejects_missing_topic() {
        let err = validate_request(&json!({})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(fields(&err), vec!["topic"]);
        assert_eq!(err.details[0].rule, "required");
    }

    #[test]
    fn reports_every_failing_field() {
        let err = validate_request(&json!({
            "topic": 42,
            "existingTitles": ["ok", 7, null]
        }))
        .unwrap_err();
        assert_eq!(
            fields(&err),
            vec!["topic", "existingTitles[1]", "existingTitles[2]"]
        );
    }

    #[test]
    fn rejects_non_array_titles() {
        let err = validate_request(&json!({ "topic": "Go", "existingTitles": "Learn Go" }))
            .unwrap_err();
        assert_eq!(fields(&err), vec!["existingTitles"]);
    }

    #[test]
    fn trims_topic_and_keeps_titles_in_order() {
        let req = validate_request(&json!({
            "topic": "  Kubernetes ",
            "existingTitles": ["Learn Docker", "Learn Linux"]
        }))
        .unwrap();
        assert_eq!(req.topic, "Kubernetes");
        assert_eq!(req.prior_titles(), ["Learn Docker", "Learn Linux"]);
    }

    #[test]
    fn enforces_length_bounds() {
        let long = "x".repeat(MAX_TOPIC_CHARS + 1);
        let err = validate_request(&json!({ "topic": long })).unwrap_err();
        assert_eq!(err.details[0].rule, "max_length");

        let titles: Vec<String> = (0..=MAX_EXISTING_TITLES).map(|i| i.to_string()).collect();
        let err = validate_request(&json!({ "topic": "Rust", "existingTitles": titles }))
            .unwrap_err();
        assert_eq!(err.details[0].rule, "max_items");
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = validate_request_bytes(b"{topic:").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(err.details[0].rule, "json");

        let err = validate_request_bytes(b"[1,2]").unwrap_err();
        assert_eq!(err.details[0].rule, "object");
    }

    #[test]
    fn ignores_unknown_keys() {
        let req = validate_request(&json!({ "topic": "Rust", "extra": true })).unwrap();
        assert_eq!(req.topic, "Rust");
    }
}
