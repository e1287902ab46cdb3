//! Offline stand-in for the generation service.
//!
//! Used when no credential is configured. The text it returns goes through
//! the same extraction and validation as live output.

use super::client::{GenerateFuture, GenerationError, Generator};
use super::prompts::Prompt;
use waypoint_adapters::config::Mode;
use waypoint_core::{Module, Roadmap};

/// Returns a fixed three-module roadmap for any prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockGenerator;

/// The roadmap the mock produces for `topic`.
pub fn mock_roadmap(topic: &str) -> Roadmap {
    Roadmap {
        title: format!("Learn {} (Mock)", topic),
        modules: vec![
            Module {
                order: 1,
                title: format!("Introduction to {}", topic),
                context: "Understanding the basics is essential because it sets the foundation for advanced concepts.".to_string(),
                doc_url: "https://react.dev/learn".to_string(),
                challenge: "Read the introduction and explain the core concept in your own words without using code snippets.".to_string(),
            },
            Module {
                order: 2,
                title: "Core Concepts".to_string(),
                context: "This concept is important because it is used in almost every application you will build.".to_string(),
                doc_url: "https://react.dev/reference/react".to_string(),
                challenge: "Identify the three main characteristics described in the documentation.".to_string(),
            },
            Module {
                order: 3,
                title: "Advanced Usage".to_string(),
                context: "Mastering this is essential for building scalable applications.".to_string(),
                doc_url: "https://react.dev/learn/escape-hatches".to_string(),
                challenge: "Describe the trade-offs mentioned in the 'Performance' section.".to_string(),
            },
        ],
    }
}

impl Generator for MockGenerator {
    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        Box::pin(async move {
            serde_json::to_string(&mock_roadmap(&prompt.topic))
                .map_err(|e| GenerationError::Decode(e.to_string()))
        })
    }

    fn mode(&self) -> Mode {
        Mode::Mock
    }
}
