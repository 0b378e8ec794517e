//! Remote code-execution client surface for runbot.
//!
//! Provides the `CodeExecutor` trait, the Piston HTTP client and the
//! fixed-spacing rate limiter that guards outbound execution calls. The
//! `retry` module holds the retry policy shared with the GitHub client.

mod piston;
mod rate_limiter;
pub mod retry;
mod types;

pub use piston::{
    PistonClient, PistonConfig, DEFAULT_PISTON_EXECUTE_URL, DEFAULT_PISTON_RETRY_BASE_DELAY_MS,
};
pub use rate_limiter::{RateLimiter, DEFAULT_MIN_INTERVAL_MS};
pub use types::{
    CodeExecutor, ExecutionError, ExecutionFile, ExecutionRequest, ExecutionRun,
};
