use std::sync::Arc;

use runbot_execution::{CodeExecutor, ExecutionRequest, RateLimiter};
use runbot_github::pull_request_context::PullRequestContext;
use runbot_languages::SelectedFile;
use serde::Serialize;

use crate::pull_request_host::PullRequestHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileExecutionStage {
    Fetch,
    Execute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileExecutionStatus {
    Completed { output: String },
    Failed { stage: FileExecutionStage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Result of running one selected file.
pub struct FileExecutionOutcome {
    pub filename: String,
    pub language: String,
    #[serde(flatten)]
    pub status: FileExecutionStatus,
}

impl FileExecutionOutcome {
    /// Output worth reporting; empty runs contribute nothing.
    pub fn reportable_output(&self) -> Option<&str> {
        match &self.status {
            FileExecutionStatus::Completed { output } if !output.is_empty() => Some(output),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileExecutionStatus::Failed { .. })
    }
}

#[derive(Clone)]
/// Runs selected files one at a time through the shared rate limiter.
pub struct ExecutionDispatcher {
    executor: Arc<dyn CodeExecutor>,
    limiter: Arc<RateLimiter>,
}

impl ExecutionDispatcher {
    pub fn new(executor: Arc<dyn CodeExecutor>, limiter: Arc<RateLimiter>) -> Self {
        Self { executor, limiter }
    }

    /// Fetch and execute each file in order. The executor throttles every
    /// outbound attempt through the shared limiter. A failure on one file is
    /// logged and recorded; the remaining files still run.
    pub async fn dispatch(
        &self,
        host: &dyn PullRequestHost,
        context: &PullRequestContext,
        selected: &[SelectedFile],
    ) -> Vec<FileExecutionOutcome> {
        let mut outcomes = Vec::with_capacity(selected.len());
        for entry in selected {
            let filename = entry.file.filename.as_str();
            let language = entry.descriptor.language.clone();

            let content = match host
                .file_content(&context.repo, filename, &context.head_ref)
                .await
            {
                Ok(content) => content,
                Err(error) => {
                    tracing::warn!(
                        repo = %context.repo.as_slug(),
                        pr = context.pr_number,
                        file = filename,
                        error = %format!("{error:#}"),
                        "failed to fetch file content"
                    );
                    outcomes.push(FileExecutionOutcome {
                        filename: filename.to_string(),
                        language,
                        status: FileExecutionStatus::Failed {
                            stage: FileExecutionStage::Fetch,
                            reason: format!("{error:#}"),
                        },
                    });
                    continue;
                }
            };

            let request = ExecutionRequest::new(filename, content, entry.descriptor.clone());
            let status = match self.executor.execute(&request, &self.limiter).await {
                Ok(run) => {
                    tracing::info!(
                        file = filename,
                        language = %language,
                        exit_code = ?run.code,
                        "execution completed"
                    );
                    FileExecutionStatus::Completed {
                        output: run.primary_output(),
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        file = filename,
                        language = %language,
                        error = %error,
                        "execution failed"
                    );
                    FileExecutionStatus::Failed {
                        stage: FileExecutionStage::Execute,
                        reason: error.to_string(),
                    }
                }
            };
            outcomes.push(FileExecutionOutcome {
                filename: filename.to_string(),
                language,
                status,
            });
        }
        outcomes
    }
}
