//! Roadmap output model and the rules generated content must satisfy.

use crate::error::{PipelineError, Violation};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;
use url::Url;

/// Fewest modules an accepted roadmap may carry.
pub const MIN_MODULES: usize = 1;
/// Most modules an accepted roadmap may carry.
pub const MAX_MODULES: usize = 7;

/// A generated learning roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roadmap {
    pub title: String,
    pub modules: Vec<Module>,
}

/// One ordered unit of a roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub order: u32,
    pub title: String,
    pub context: String,
    pub doc_url: String,
    pub challenge: String,
}

// ═══════════════════════════════════════════════════════════════════════════
//  DOCUMENTATION HOSTS
// ═══════════════════════════════════════════════════════════════════════════

/// Official documentation sites. Subdomains of these are accepted too.
const OFFICIAL_DOC_HOSTS: &[&str] = &[
    "react.dev",
    "developer.mozilla.org",
    "docs.python.org",
    "doc.rust-lang.org",
    "rust-lang.org",
    "kubernetes.io",
    "go.dev",
    "nodejs.org",
    "typescriptlang.org",
    "vuejs.org",
    "angular.dev",
    "svelte.dev",
    "nextjs.org",
    "postgresql.org",
    "learn.microsoft.com",
    "kotlinlang.org",
    "swift.org",
    "ruby-lang.org",
    "guides.rubyonrails.org",
    "php.net",
    "spring.io",
    "dart.dev",
    "flutter.dev",
    "elixir-lang.org",
    "hexdocs.pm",
    "haskell.org",
    "scala-lang.org",
    "tailwindcss.com",
    "redis.io",
    "mongodb.com",
    "git-scm.com",
    "graphql.org",
    "djangoproject.com",
    "fastapi.tiangolo.com",
    "numpy.org",
    "pandas.pydata.org",
    "pytorch.org",
    "tensorflow.org",
    "cloud.google.com",
    "nginx.org",
    "apache.org",
    "w3.org",
    "whatwg.org",
    "webassembly.org",
    "sqlite.org",
];

/// Host prefixes that conventionally serve vendor documentation.
const OFFICIAL_DOC_PREFIXES: &[&str] = &["docs.", "doc.", "developer.", "developers."];

/// Host suffixes for documentation hosting platforms.
const OFFICIAL_DOC_SUFFIXES: &[&str] = &[".readthedocs.io"];

/// Blogs, tutorials and aggregators. Always rejected, even under an allowed pattern.
const DENIED_HOSTS: &[&str] = &[
    "medium.com",
    "dev.to",
    "hashnode.dev",
    "substack.com",
    "stackoverflow.com",
    "w3schools.com",
    "geeksforgeeks.org",
    "tutorialspoint.com",
    "freecodecamp.org",
    "towardsdatascience.com",
    "youtube.com",
    "reddit.com",
];

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|rest| rest.ends_with('.'))
}

/// Allow-list of hosts a `docUrl` may point at.
#[derive(Debug, Clone, Default)]
pub struct DocHostPolicy {
    extra_hosts: Vec<String>,
}

impl DocHostPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept additional hosts (and their subdomains) on top of the built-in list.
    pub fn with_extra_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extra_hosts.extend(
            hosts
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty()),
        );
        self
    }

    pub fn is_denied_host(&self, host: &str) -> bool {
        DENIED_HOSTS.iter().any(|d| host_matches(host, d))
    }

    pub fn is_official_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        if self.is_denied_host(host) {
            return false;
        }
        OFFICIAL_DOC_HOSTS.iter().any(|d| host_matches(host, d))
            || self.extra_hosts.iter().any(|d| host_matches(host, d))
            || OFFICIAL_DOC_PREFIXES.iter().any(|p| host.starts_with(p))
            || OFFICIAL_DOC_SUFFIXES.iter().any(|s| host.ends_with(s))
    }

    /// Check a URL string, returning the failed rule name and message.
    fn check_url(&self, raw: &str) -> Result<(), (&'static str, String)> {
        let url = Url::parse(raw.trim())
            .map_err(|e| ("url", format!("docUrl is not a valid absolute URL: {}", e)))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(("url_scheme", "docUrl must use http or https".to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ("url", "docUrl has no host".to_string()))?;
        if !self.is_official_host(host) {
            return Err((
                "official_docs",
                format!("docUrl host '{}' is not an official documentation site", host),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONTENT RULES
// ═══════════════════════════════════════════════════════════════════════════

fn code_syntax_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"```",
            r"|\bfunction\s*[A-Za-z_$][\w$]*\s*\(",
            r"|\bfunction\s*\(",
            r"|\bdef\s+[A-Za-z_]\w*\s*\(",
            r"|\bfn\s+[A-Za-z_]\w*\s*[<(]",
            r"|\bfunc\s+(\([^)]*\)\s*)?[A-Za-z_]\w*\s*\(",
            r"|\)\s*=>",
            r"|=>\s*\{",
        ))
        .expect("code syntax pattern is valid")
    })
}

fn causal_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(because|essential|important|crucial|critical|necessary|foundation(al)?|fundamental|enables?|why)\b",
        )
        .expect("causal marker pattern is valid")
    })
}

/// Whether the text contains a code fence or a function definition.
pub fn contains_code_syntax(text: &str) -> bool {
    code_syntax_re().is_match(text)
}

/// Whether the text justifies itself with a causal marker word.
pub fn has_causal_marker(text: &str) -> bool {
    causal_marker_re().is_match(text)
}

// ═══════════════════════════════════════════════════════════════════════════
//  VALIDATOR
// ═══════════════════════════════════════════════════════════════════════════

/// Validates extracted upstream JSON against the roadmap rules.
#[derive(Debug, Clone, Default)]
pub struct RoadmapValidator {
    hosts: DocHostPolicy,
}

impl RoadmapValidator {
    pub fn new(hosts: DocHostPolicy) -> Self {
        Self { hosts }
    }

    pub fn hosts(&self) -> &DocHostPolicy {
        &self.hosts
    }

    /// Validate structure and content, reporting every broken rule at once.
    pub fn validate(&self, value: &Value) -> Result<Roadmap, PipelineError> {
        let Some(obj) = value.as_object() else {
            return Err(PipelineError::schema_violation(vec![Violation::new(
                "",
                "object",
                "roadmap must be a JSON object",
            )]));
        };

        let mut violations = Vec::new();
        let title = required_text(obj, "title", "title", &mut violations);

        let mut modules = Vec::new();
        match obj.get("modules") {
            Some(Value::Array(items)) => {
                if items.len() < MIN_MODULES || items.len() > MAX_MODULES {
                    violations.push(Violation::new(
                        "modules",
                        "module_count",
                        format!(
                            "roadmap must have between {} and {} modules, got {}",
                            MIN_MODULES,
                            MAX_MODULES,
                            items.len()
                        ),
                    ));
                }
                for (idx, item) in items.iter().enumerate() {
                    if let Some(module) = self.validate_module(idx, item, &mut violations) {
                        modules.push(module);
                    }
                }
            }
            Some(_) => violations.push(Violation::new(
                "modules",
                "type",
                "modules must be an array",
            )),
            None => violations.push(Violation::new(
                "modules",
                "required",
                "modules is required",
            )),
        }

        if !violations.is_empty() {
            return Err(PipelineError::schema_violation(violations));
        }
        Ok(Roadmap {
            title: title.unwrap_or_default(),
            modules,
        })
    }

    fn validate_module(
        &self,
        idx: usize,
        value: &Value,
        violations: &mut Vec<Violation>,
    ) -> Option<Module> {
        let path = format!("modules[{}]", idx);
        let Some(obj) = value.as_object() else {
            violations.push(Violation::new(
                path,
                "object",
                "module must be a JSON object",
            ));
            return None;
        };
        let before = violations.len();
        let expected = idx as u64 + 1;

        let order = match obj.get("order").and_then(Value::as_u64) {
            Some(order) if order == expected => u32::try_from(order).ok(),
            Some(order) => {
                violations.push(Violation::new(
                    format!("{}.order", path),
                    "order_sequence",
                    format!(
                        "order must be {} at this position (contiguous from 1), got {}",
                        expected, order
                    ),
                ));
                None
            }
            None => {
                violations.push(Violation::new(
                    format!("{}.order", path),
                    "type",
                    "order must be a positive integer",
                ));
                None
            }
        };

        let title = required_text(obj, "title", &format!("{}.title", path), violations);

        let context = required_text(obj, "context", &format!("{}.context", path), violations);
        if let Some(context) = &context {
            if !has_causal_marker(context) {
                violations.push(Violation::new(
                    format!("{}.context", path),
                    "causal_language",
                    "context must explain why the module matters (e.g. 'because', 'essential', 'important')",
                ));
            }
        }

        let doc_url = required_text(obj, "docUrl", &format!("{}.docUrl", path), violations);
        if let Some(url) = &doc_url {
            if let Err((rule, message)) = self.hosts.check_url(url) {
                violations.push(Violation::new(format!("{}.docUrl", path), rule, message));
            }
        }

        let challenge =
            required_text(obj, "challenge", &format!("{}.challenge", path), violations);
        if let Some(challenge) = &challenge {
            if contains_code_syntax(challenge) {
                violations.push(Violation::new(
                    format!("{}.challenge", path),
                    "no_code",
                    "challenge must not contain code blocks or function definitions",
                ));
            }
        }

        if violations.len() != before {
            return None;
        }
        Some(Module {
            order: order?,
            title: title?,
            context: context?,
            doc_url: doc_url?,
            challenge: challenge?,
        })
    }
}

fn required_text(
    obj: &Map<String, Value>,
    key: &str,
    field: &str,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            violations.push(Violation::new(
                field,
                "non_empty",
                format!("{} must not be empty", key),
            ));
            None
        }
        Some(Value::Null) | None => {
            violations.push(Violation::new(
                field,
                "required",
                format!("{} is required", key),
            ));
            None
        }
        Some(_) => {
            violations.push(Violation::new(
                field,
                "type",
                format!("{} must be a string", key),
            ));
            None
        }
    }
}
