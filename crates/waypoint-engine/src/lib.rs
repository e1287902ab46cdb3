//! Generation engine for waypoint: prompts, the upstream client, JSON
//! recovery and the request pipeline that ties them together.

pub mod llm;
pub mod pipeline;

pub use pipeline::Pipeline;
