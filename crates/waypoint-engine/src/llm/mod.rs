pub mod client;
pub mod mock;
pub mod models;
pub mod parse;
pub mod prompts;

pub use client::{generator_from_config, GenerationError, Generator, UpstreamClient};
pub use mock::{mock_roadmap, MockGenerator};
pub use models::{ModelSettings, Usage};
pub use parse::{extract_json, Strategy};
pub use prompts::{build_prompt, Prompt};
