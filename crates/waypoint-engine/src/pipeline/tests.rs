use super::*;
use crate::llm::client::GenerateFuture;
use crate::llm::{MockGenerator, Prompt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use waypoint_core::ErrorKind;

/// Replays a fixed outcome and records the prompts it was given.
struct ScriptedGenerator {
    outcome: fn() -> Result<String, GenerationError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedGenerator {
    fn new(outcome: fn() -> Result<String, GenerationError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for ScriptedGenerator {
    fn generate<'a>(&'a self, prompt: &'a Prompt) -> GenerateFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());
        let outcome = (self.outcome)();
        Box::pin(async move { outcome })
    }

    fn mode(&self) -> Mode {
        Mode::Live
    }
}

fn kubernetes_roadmap() -> Result<String, GenerationError> {
    let modules: Vec<serde_json::Value> = [
        ("Cluster Architecture", "https://kubernetes.io/docs/concepts/architecture/"),
        ("Pods", "https://kubernetes.io/docs/concepts/workloads/pods/"),
        ("Deployments", "https://kubernetes.io/docs/concepts/workloads/controllers/deployment/"),
        ("Services", "https://kubernetes.io/docs/concepts/services-networking/service/"),
        ("ConfigMaps and Secrets", "https://kubernetes.io/docs/concepts/configuration/configmap/"),
        ("Scheduling", "https://kubernetes.io/docs/concepts/scheduling-eviction/"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (title, url))| {
        serde_json::json!({
            "order": i + 1,
            "title": title,
            "context": format!("{} is essential because every workload depends on it.", title),
            "docUrl": url,
            "challenge": format!("Explain how {} behaves when a node fails.", title),
        })
    })
    .collect();
    Ok(serde_json::json!({ "title": "Kubernetes the Hard Parts", "modules": modules }).to_string())
}

fn pipeline_with(generator: Arc<dyn Generator>) -> Pipeline {
    Pipeline::new(
        RateLimiter::new(Duration::from_secs(60), 5),
        generator,
        RoadmapValidator::default(),
    )
}

#[tokio::test]
async fn live_roadmap_passes_through_in_order() {
    let generator = ScriptedGenerator::new(kubernetes_roadmap);
    let pipeline = pipeline_with(generator.clone());

    let roadmap = pipeline
        .handle("10.0.0.1", br#"{"topic":"Kubernetes"}"#)
        .await
        .unwrap();

    assert_eq!(roadmap.modules.len(), 6);
    let orders: Vec<u32> = roadmap.modules.iter().map(|m| m.order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
    assert!(roadmap
        .modules
        .iter()
        .all(|m| waypoint_core::roadmap::has_causal_marker(&m.context)));
    assert_eq!(generator.calls(), 1);

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].system.contains("\"Kubernetes\""));
    assert!(!prompts[0].system.contains("PRIOR ROADMAPS"));
}

#[tokio::test]
async fn mock_mode_returns_fixed_roadmap() {
    let pipeline = pipeline_with(Arc::new(MockGenerator));
    let first = pipeline.handle("a", br#"{"topic":"React"}"#).await.unwrap();
    let second = pipeline.handle("a", br#"{"topic":"React"}"#).await.unwrap();

    assert_eq!(first.modules.len(), 3);
    assert_eq!(first.modules[0].order, 1);
    assert_eq!(first, second);
    assert_eq!(pipeline.mode(), Mode::Mock);
}

#[tokio::test]
async fn prior_titles_reach_the_prompt() {
    let generator = ScriptedGenerator::new(kubernetes_roadmap);
    let pipeline = pipeline_with(generator.clone());
    pipeline
        .handle(
            "a",
            br#"{"topic":"Kubernetes","existingTitles":["Learn Docker"]}"#,
        )
        .await
        .unwrap();
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].system.contains("- Learn Docker\n"));
}

#[tokio::test]
async fn sixth_request_is_rate_limited_before_any_work() {
    let generator = ScriptedGenerator::new(kubernetes_roadmap);
    let pipeline = pipeline_with(generator.clone());
    for _ in 0..5 {
        pipeline.handle("1.1.1.1", b"{}").await.unwrap_err();
    }
    let err = pipeline
        .handle("1.1.1.1", br#"{"topic":"Kubernetes"}"#)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimitError);
    assert_eq!(err.status(), 429);
    assert_eq!(generator.calls(), 0);

    // Another caller still has its own quota.
    assert!(pipeline
        .handle("2.2.2.2", br#"{"topic":"Kubernetes"}"#)
        .await
        .is_ok());
}

#[tokio::test]
async fn invalid_request_never_reaches_upstream() {
    let generator = ScriptedGenerator::new(kubernetes_roadmap);
    let pipeline = pipeline_with(generator.clone());
    let err = pipeline.handle("a", br#"{"topic":""}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationError);
    assert_eq!(err.details[0].field, "topic");
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn empty_upstream_output_is_classified() {
    let pipeline = pipeline_with(ScriptedGenerator::new(|| Err(GenerationError::Empty)));
    let err = pipeline.handle("a", br#"{"topic":"Rust"}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamEmptyError);
    assert_eq!(err.status(), 500);
}

#[tokio::test]
async fn transport_failure_is_classified_without_leaking_cause() {
    let pipeline = pipeline_with(ScriptedGenerator::new(|| {
        Err(GenerationError::Timeout { after_ms: 60_000 })
    }));
    let err = pipeline.handle("a", br#"{"topic":"Rust"}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamTransportError);
    assert!(!err.body().error.contains("60000"));
    assert!(err.diagnostic.unwrap().contains("60000ms"));
}

#[tokio::test]
async fn prose_wrapped_output_is_recovered() {
    let pipeline = pipeline_with(ScriptedGenerator::new(|| {
        kubernetes_roadmap().map(|json| format!("Here is your roadmap:\n```json\n{}\n```", json))
    }));
    let roadmap = pipeline.handle("a", br#"{"topic":"Kubernetes"}"#).await.unwrap();
    assert_eq!(roadmap.modules.len(), 6);
}

#[tokio::test]
async fn unparsable_output_is_a_format_error() {
    let pipeline = pipeline_with(ScriptedGenerator::new(|| {
        Ok("I cannot help with that.".to_string())
    }));
    let err = pipeline.handle("a", br#"{"topic":"Rust"}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::UpstreamFormatError);
    assert_eq!(err.status(), 500);
    assert_eq!(err.diagnostic.as_deref(), Some("I cannot help with that."));
}

#[tokio::test]
async fn rule_breaking_output_is_a_schema_violation() {
    let pipeline = pipeline_with(ScriptedGenerator::new(|| {
        Ok(serde_json::json!({
            "title": "Bad",
            "modules": [
                { "order": 1, "title": "A", "context": "important", "docUrl": "https://medium.com/x", "challenge": "Read it" },
                { "order": 3, "title": "B", "context": "important", "docUrl": "https://go.dev/doc", "challenge": "Read it" }
            ]
        })
        .to_string())
    }));
    let err = pipeline.handle("a", br#"{"topic":"Go"}"#).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SchemaViolationError);
    assert_eq!(err.status(), 502);
    let fields: Vec<&str> = err.details.iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["modules[0].docUrl", "modules[1].order"]);
}

#[tokio::test]
async fn from_config_without_credential_uses_mock() {
    let pipeline = Pipeline::from_config(&Config::default()).unwrap();
    assert_eq!(pipeline.mode(), Mode::Mock);
    assert_eq!(pipeline.limiter().max_requests(), 5);
}

#[tokio::test]
async fn unreadable_body_is_charged_then_rejected() {
    let generator = ScriptedGenerator::new(kubernetes_roadmap);
    let pipeline = pipeline_with(generator.clone());
    let violation = || waypoint_core::Violation::new("", "max_size", "too large");

    for _ in 0..5 {
        let err = pipeline.reject_unreadable("3.3.3.3", violation());
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(err.details[0].rule, "max_size");
    }
    let err = pipeline.reject_unreadable("3.3.3.3", violation());
    assert_eq!(err.kind, ErrorKind::RateLimitError);
    assert_eq!(generator.calls(), 0);
}
