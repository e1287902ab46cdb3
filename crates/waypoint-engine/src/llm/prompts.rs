use waypoint_core::roadmap::MAX_MODULES;
use waypoint_core::GenerationRequest;

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED BUILDING BLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Behavioural constraints every roadmap must honour.
const ROADMAP_CONSTRAINTS: &str = r#"CONSTRAINTS:
- DO NOT provide code snippets.
- DO NOT summarize documentation.
- YOU MUST reference specific sections in official documentation.
- Every module cites exactly one official documentation URL in `docUrl`.
- `docUrl` must come from official documentation domains (e.g. react.dev, developer.mozilla.org, docs.python.org). Avoid blogs like medium.com.
- `challenge` must NOT contain code blocks or function definitions.
- `context` must explain WHY the module matters (use words like "because", "important", "essential")."#;

/// Output contract - a single JSON object, nothing else.
const ROADMAP_JSON_SHAPE: &str = r#"OUTPUT (a single JSON object, no prose, no markdown):
{
  "title": "Roadmap Title",
  "modules": [
    {
      "order": 1,
      "title": "Module Title",
      "context": "Why this module is important...",
      "docUrl": "https://official.docs/...",
      "challenge": "Specific actionable challenge..."
    }
  ]
}"#;

/// Fewest modules the prompt asks for.
pub const PROMPT_MIN_MODULES: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// PROMPTS
// ═══════════════════════════════════════════════════════════════════════════════

/// The two messages sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Topic the prompt was built for.
    pub topic: String,
    pub system: String,
    pub user: String,
}

/// Render the system and user prompts for a request. Pure and deterministic.
pub fn build_prompt(request: &GenerationRequest) -> Prompt {
    let mut system = format!(
        r#"You are a Brutal Tech Mentor. Create a learning roadmap for the user on the topic: "{topic}".
Be direct, no fluff, demanding but constructive.

{constraints}

{shape}

Generate {min}-{max} modules, numbered with `order` starting at 1 and increasing by one."#,
        topic = request.topic,
        constraints = ROADMAP_CONSTRAINTS,
        shape = ROADMAP_JSON_SHAPE,
        min = PROMPT_MIN_MODULES,
        max = MAX_MODULES,
    );
    system.push_str(&prior_titles_section(request.prior_titles()));

    Prompt {
        topic: request.topic.clone(),
        system,
        user: format!("Create a rigorous learning roadmap for: {}", request.topic),
    }
}

fn prior_titles_section(titles: &[String]) -> String {
    if titles.is_empty() {
        return String::new();
    }
    let mut section = String::from(
        "\n\nPRIOR ROADMAPS:\nThe user already has these roadmaps:\n",
    );
    for title in titles {
        section.push_str("- ");
        section.push_str(title);
        section.push('\n');
    }
    section.push_str(
        "Do not duplicate their topics or structure. Create something different or complementary.",
    );
    section
}
