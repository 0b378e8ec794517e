use std::sync::Arc;

use anyhow::{Context, Result};
use runbot_github::execute_command::detect_execute_command;
use runbot_github::execution_report::compose_execution_report;
use runbot_github::github_payloads::{IssuesEventPayload, PullRequestEventPayload};
use runbot_github::pull_request_context::{PullRequestContext, RepoRef};
use runbot_languages::{select_files_for_tag, LanguageRegistry};
use serde::Serialize;

use crate::execution_dispatcher::{ExecutionDispatcher, FileExecutionOutcome};
use crate::pull_request_host::PullRequestHost;

pub const DEFAULT_ISSUE_GREETING: &str = "Thanks for opening this issue!";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Summary of one `pull_request.opened` delivery.
pub struct PullRequestRunReport {
    pub requested: bool,
    pub language_tag: Option<String>,
    pub selected_files: usize,
    pub completed: usize,
    pub failed: usize,
    pub comment_id: Option<u64>,
    pub outcomes: Vec<FileExecutionOutcome>,
}

#[derive(Clone)]
/// Shared state behind every webhook delivery.
pub struct RunbotRuntime {
    host: Arc<dyn PullRequestHost>,
    dispatcher: ExecutionDispatcher,
    registry: Arc<LanguageRegistry>,
    issue_greeting: String,
}

impl RunbotRuntime {
    pub fn new(
        host: Arc<dyn PullRequestHost>,
        dispatcher: ExecutionDispatcher,
        registry: Arc<LanguageRegistry>,
        issue_greeting: impl Into<String>,
    ) -> Self {
        Self {
            host,
            dispatcher,
            registry,
            issue_greeting: issue_greeting.into(),
        }
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Detect `/execute`, run the matching changed files and post one results
    /// comment. Per-file failures are folded into the report; only host API
    /// failures outside the per-file loop surface as errors.
    pub async fn handle_pull_request_opened(
        &self,
        payload: &PullRequestEventPayload,
    ) -> Result<PullRequestRunReport> {
        let mut context = PullRequestContext::from_event(payload);
        let repo = context.repo.clone();
        let number = context.pr_number;

        context.body = self
            .host
            .pull_request_body(&repo, number)
            .await
            .context("failed to refresh pull request body")?;
        let comments = self
            .host
            .list_issue_comments(&repo, number)
            .await
            .context("failed to list pull request comments")?;
        let commits = self
            .host
            .list_pull_request_commits(&repo, number)
            .await
            .context("failed to list pull request commits")?;

        let command = detect_execute_command(
            context.body.as_deref(),
            comments.iter().map(|comment| comment.body.as_deref()),
            commits.iter().map(|commit| commit.commit.message.as_deref()),
        );
        if !command.requested {
            tracing::info!(
                repo = %repo.as_slug(),
                pr = number,
                "no /execute command found"
            );
            return Ok(PullRequestRunReport::default());
        }

        context.changed_files = self
            .host
            .list_pull_request_files(&repo, number)
            .await
            .context("failed to list pull request files")?;
        let selected = select_files_for_tag(
            &context.changed_files,
            &self.registry,
            command.language_tag.as_deref(),
        );
        tracing::info!(
            repo = %repo.as_slug(),
            pr = number,
            tag = ?command.language_tag,
            changed = context.changed_files.len(),
            selected = selected.len(),
            "executing pull request files"
        );

        let outcomes = self
            .dispatcher
            .dispatch(self.host.as_ref(), &context, &selected)
            .await;
        let results = outcomes
            .iter()
            .filter_map(FileExecutionOutcome::reportable_output)
            .collect::<Vec<_>>();

        let comment_id = match compose_execution_report(&results) {
            Some(report) => Some(
                self.host
                    .create_issue_comment(&repo, number, &report)
                    .await
                    .context("failed to post execution results")?,
            ),
            None => {
                tracing::info!(
                    repo = %repo.as_slug(),
                    pr = number,
                    "no execution output to report"
                );
                None
            }
        };

        let failed = outcomes.iter().filter(|outcome| outcome.is_failed()).count();
        Ok(PullRequestRunReport {
            requested: true,
            language_tag: command.language_tag,
            selected_files: selected.len(),
            completed: outcomes.len() - failed,
            failed,
            comment_id,
            outcomes,
        })
    }

    /// Greet a freshly opened issue. Returns the comment id, or `None` when
    /// greetings are disabled.
    pub async fn handle_issue_opened(&self, payload: &IssuesEventPayload) -> Result<Option<u64>> {
        let greeting = self.issue_greeting.trim();
        if greeting.is_empty() {
            return Ok(None);
        }
        let repo = RepoRef::from_repository(&payload.repository);
        let id = self
            .host
            .create_issue_comment(&repo, payload.issue.number, greeting)
            .await
            .context("failed to post issue greeting")?;
        Ok(Some(id))
    }
}
