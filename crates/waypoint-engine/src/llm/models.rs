use serde::Deserialize;
use waypoint_adapters::config::UpstreamConfig;

/// Fixed sampling parameters for a generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub id: String,
    pub temperature: f32,
    pub max_completion_tokens: u32,
}

impl ModelSettings {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            id: config.model.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self::from_config(&UpstreamConfig::default())
    }
}

/// API usage information from the provider.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
