//! Scrubbing of untrusted text before it reaches logs or error details.

use regex::Regex;
use std::sync::OnceLock;

/// Maximum length for upstream content quoted in error messages.
pub const MAX_ERROR_CONTENT_LEN: usize = 200;

/// Placeholder written in place of a secret.
const REDACTED: &str = "[redacted]";

/// Provider keys such as `csk-...` or `sk-...`.
fn key_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:c?sk|pk|rk)-[A-Za-z0-9_\-]{8,}").expect("key token pattern is valid")
    })
}

/// `Bearer <token>` credentials.
fn bearer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9._~+/=\-]+").expect("bearer pattern is valid")
    })
}

/// `api_key=...`, `"password": "..."` and similar assignments.
fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\b(api[_\-]?key|secret|password|passwd|access[_\-]?token|auth[_\-]?token|credential)("?\s*[:=]\s*"?)[^\s",}]+"#,
        )
        .expect("assignment pattern is valid")
    })
}

/// Replace credential-looking tokens with a placeholder, leaving the rest intact.
pub fn redact_secrets(text: &str) -> String {
    let text = key_token_re().replace_all(text, REDACTED);
    let text = bearer_re().replace_all(&text, format!("${{1}} {}", REDACTED).as_str());
    assignment_re()
        .replace_all(&text, format!("${{1}}${{2}}{}", REDACTED).as_str())
        .into_owned()
}

/// Truncate a string for display (Unicode-safe)
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Redact and truncate content for logs and error messages.
pub fn sanitize_api_response(content: &str) -> String {
    sanitize_to(content, MAX_ERROR_CONTENT_LEN)
}

/// Redact, then truncate to `max_chars`.
pub fn sanitize_to(content: &str, max_chars: usize) -> String {
    let redacted = redact_secrets(content);
    truncate_str(&redacted, max_chars).to_string()
}
