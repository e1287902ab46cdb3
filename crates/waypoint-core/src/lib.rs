//! Core domain model and contracts for waypoint.
//!
//! Request and roadmap types, the validation rules on both sides of the
//! upstream call, and the error taxonomy shared by every crate.

pub mod error;
pub mod redact;
pub mod request;
pub mod roadmap;

pub use error::{ErrorBody, ErrorKind, PipelineError, Violation};
pub use redact::{redact_secrets, sanitize_api_response, truncate_str};
pub use request::{validate_request, validate_request_bytes, GenerationRequest};
pub use roadmap::{DocHostPolicy, Module, Roadmap, RoadmapValidator};
