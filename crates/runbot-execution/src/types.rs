use async_trait::async_trait;
use runbot_languages::LanguageDescriptor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Single source file shipped to the execution service.
pub struct ExecutionFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One file's decoded source bound to the language it should run as.
pub struct ExecutionRequest {
    pub filename: String,
    pub content: String,
    pub descriptor: LanguageDescriptor,
}

impl ExecutionRequest {
    pub fn new(
        filename: impl Into<String>,
        content: impl Into<String>,
        descriptor: LanguageDescriptor,
    ) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
            descriptor,
        }
    }

    pub fn files(&self) -> Vec<ExecutionFile> {
        vec![ExecutionFile {
            name: self.filename.clone(),
            content: self.content.clone(),
        }]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Captured `run` stage of an execution.
pub struct ExecutionRun {
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub signal: Option<String>,
}

impl ExecutionRun {
    /// stdout when non-empty, otherwise stderr, otherwise an empty string.
    pub fn primary_output(&self) -> String {
        [self.stdout.as_deref(), self.stderr.as_deref()]
            .into_iter()
            .flatten()
            .find(|output| !output.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Error)]
/// Enumerates supported `ExecutionError` values.
pub enum ExecutionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("execution service returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid execution client configuration: {0}")]
    InvalidConfig(String),
}

#[async_trait]
/// Trait contract for remote code execution backends.
///
/// Implementations call `limiter.acquire()` before every outbound request,
/// retries included, so all traffic to the backend shares one spacing floor.
pub trait CodeExecutor: Send + Sync {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        limiter: &RateLimiter,
    ) -> Result<ExecutionRun, ExecutionError>;
}
