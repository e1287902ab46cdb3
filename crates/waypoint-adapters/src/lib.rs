//! Runtime adapters for waypoint (configuration, shared admission state).

pub mod config;
pub mod rate_limit;

pub use config::{Config, ConfigError, Mode};
pub use rate_limit::RateLimiter;
