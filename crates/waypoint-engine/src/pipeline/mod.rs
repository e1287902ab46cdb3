//! The generation request pipeline.
//!
//! admission → request validation → prompt → generation → extraction →
//! roadmap validation. Stages run strictly in sequence and the first failure
//! ends the request; no partial roadmap is ever returned.

use crate::llm::{build_prompt, extract_json, generator_from_config, GenerationError, Generator};
use std::sync::Arc;
use waypoint_adapters::config::{Config, Mode};
use waypoint_adapters::RateLimiter;
use waypoint_core::{
    redact_secrets, sanitize_api_response, validate_request_bytes, DocHostPolicy, GenerationRequest,
    PipelineError, Roadmap, RoadmapValidator, Violation,
};

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct Pipeline {
    limiter: RateLimiter,
    generator: Arc<dyn Generator>,
    validator: RoadmapValidator,
}

impl Pipeline {
    pub fn new(
        limiter: RateLimiter,
        generator: Arc<dyn Generator>,
        validator: RoadmapValidator,
    ) -> Self {
        Self {
            limiter,
            generator,
            validator,
        }
    }

    /// Wire every stage from configuration.
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let hosts = DocHostPolicy::new().with_extra_hosts(&config.validation.extra_doc_hosts);
        Ok(Self::new(
            RateLimiter::from_config(&config.rate_limit),
            generator_from_config(config)?,
            RoadmapValidator::new(hosts),
        ))
    }

    pub fn mode(&self) -> Mode {
        self.generator.mode()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn admit(&self, identifier: &str) -> Result<(), PipelineError> {
        if self.limiter.admit(identifier) {
            Ok(())
        } else {
            tracing::warn!(identifier, "rate limit exceeded");
            Err(PipelineError::rate_limited())
        }
    }

    /// Run the full pipeline for a raw request body from `identifier`.
    pub async fn handle(&self, identifier: &str, body: &[u8]) -> Result<Roadmap, PipelineError> {
        self.admit(identifier)?;
        let request = validate_request_bytes(body).inspect_err(|err| {
            tracing::debug!(violations = err.details.len(), "rejected invalid request");
        })?;
        self.generate(&request).await
    }

    /// Reject a body that could not be read at all.
    ///
    /// The attempt still counts against `identifier`'s quota, so an
    /// exhausted caller sees the rate-limit error first.
    pub fn reject_unreadable(&self, identifier: &str, violation: Violation) -> PipelineError {
        match self.admit(identifier) {
            Ok(()) => PipelineError::validation(vec![violation]),
            Err(err) => err,
        }
    }

    /// Generate and validate a roadmap for an already-validated request.
    ///
    /// Skips admission control.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Roadmap, PipelineError> {
        let prompt = build_prompt(request);
        tracing::debug!(
            topic = %request.topic,
            prior_titles = request.prior_titles().len(),
            mode = self.mode().as_str(),
            "generating roadmap"
        );

        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|err| {
                tracing::warn!(error = %redact_secrets(&err.to_string()), "generation call failed");
                classify_generation_error(err)
            })?;

        let value = extract_json(&raw).inspect_err(|_| {
            tracing::warn!(
                raw = %sanitize_api_response(&raw),
                "upstream output contained no recoverable JSON"
            );
        })?;
        let roadmap = self.validator.validate(&value).inspect_err(|err| {
            tracing::warn!(
                violations = err.details.len(),
                "upstream roadmap failed validation"
            );
        })?;
        tracing::info!(
            topic = %request.topic,
            modules = roadmap.modules.len(),
            "roadmap generated"
        );
        Ok(roadmap)
    }
}

fn classify_generation_error(err: GenerationError) -> PipelineError {
    match err {
        GenerationError::Empty => PipelineError::upstream_empty(),
        other => PipelineError::upstream_transport(other.to_string()),
    }
}
