use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use runbot_execution::{
    CodeExecutor, ExecutionError, ExecutionRequest, ExecutionRun, RateLimiter,
};
use runbot_github::github_payloads::{
    GithubCommit, GithubCommitDetail, GithubIssueComment, PullRequestEventPayload,
};
use runbot_github::pull_request_context::{PullRequestContext, RepoRef};
use runbot_languages::FileChange;
use serde_json::json;
use tokio::time::Instant;

use crate::pull_request_host::PullRequestHost;

pub(crate) fn sample_context() -> PullRequestContext {
    PullRequestContext {
        repo: RepoRef::new("octo", "demo"),
        pr_number: 7,
        head_ref: "feature".to_string(),
        body: None,
        changed_files: Vec::new(),
    }
}

pub(crate) fn pull_request_opened_payload(body: Option<&str>) -> PullRequestEventPayload {
    serde_json::from_value(json!({
        "action": "opened",
        "pull_request": {
            "number": 7,
            "body": body,
            "head": {"ref": "feature"},
            "base": {"ref": "main", "repo": {"name": "demo", "owner": {"login": "octo"}}}
        },
        "repository": {"name": "demo", "owner": {"login": "octo"}}
    }))
    .expect("pull request payload")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PostedComment {
    pub(crate) repo: RepoRef,
    pub(crate) number: u64,
    pub(crate) body: String,
}

#[derive(Default)]
pub(crate) struct FakeHost {
    body: Option<String>,
    comments: Vec<String>,
    commit_messages: Vec<String>,
    changed_files: Vec<FileChange>,
    contents: HashMap<String, String>,
    fail_body_lookup: bool,
    fetched: Mutex<Vec<String>>,
    posted: Mutex<Vec<PostedComment>>,
}

impl FakeHost {
    pub(crate) fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub(crate) fn with_comment(mut self, body: &str) -> Self {
        self.comments.push(body.to_string());
        self
    }

    pub(crate) fn with_commit_message(mut self, message: &str) -> Self {
        self.commit_messages.push(message.to_string());
        self
    }

    pub(crate) fn with_changed_file(mut self, filename: &str) -> Self {
        self.changed_files.push(FileChange::new(filename));
        self
    }

    pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
        self.contents.insert(path.to_string(), content.to_string());
        self
    }

    pub(crate) fn failing_body_lookup(mut self) -> Self {
        self.fail_body_lookup = true;
        self
    }

    pub(crate) fn fetched_paths(&self) -> Vec<String> {
        self.fetched.lock().expect("fetched lock").clone()
    }

    pub(crate) fn posted_comments(&self) -> Vec<PostedComment> {
        self.posted.lock().expect("posted lock").clone()
    }
}

#[async_trait]
impl PullRequestHost for FakeHost {
    async fn pull_request_body(&self, _repo: &RepoRef, _number: u64) -> Result<Option<String>> {
        if self.fail_body_lookup {
            return Err(anyhow!("github api get pull request failed with status 500"));
        }
        Ok(self.body.clone())
    }

    async fn list_issue_comments(
        &self,
        _repo: &RepoRef,
        _number: u64,
    ) -> Result<Vec<GithubIssueComment>> {
        Ok(self
            .comments
            .iter()
            .enumerate()
            .map(|(index, body)| GithubIssueComment {
                id: index as u64 + 1,
                body: Some(body.clone()),
                user: None,
            })
            .collect())
    }

    async fn list_pull_request_commits(
        &self,
        _repo: &RepoRef,
        _number: u64,
    ) -> Result<Vec<GithubCommit>> {
        Ok(self
            .commit_messages
            .iter()
            .enumerate()
            .map(|(index, message)| GithubCommit {
                sha: format!("sha{index}"),
                commit: GithubCommitDetail {
                    message: Some(message.clone()),
                },
            })
            .collect())
    }

    async fn list_pull_request_files(
        &self,
        _repo: &RepoRef,
        _number: u64,
    ) -> Result<Vec<FileChange>> {
        Ok(self.changed_files.clone())
    }

    async fn file_content(&self, _repo: &RepoRef, path: &str, _git_ref: &str) -> Result<String> {
        self.fetched
            .lock()
            .expect("fetched lock")
            .push(path.to_string());
        self.contents
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("github api get file content failed with status 404"))
    }

    async fn create_issue_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<u64> {
        let mut posted = self.posted.lock().expect("posted lock");
        posted.push(PostedComment {
            repo: repo.clone(),
            number,
            body: body.to_string(),
        });
        Ok(posted.len() as u64)
    }
}

/// Executor that answers with the submitted source as stdout.
pub(crate) struct FakeExecutor {
    failing: Vec<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeExecutor {
    pub(crate) fn echo() -> Self {
        Self {
            failing: Vec::new(),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn failing_on(mut self, filename: &str) -> Self {
        self.failing.push(filename.to_string());
        self
    }

    pub(crate) fn executed_files(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(filename, _)| filename.clone())
            .collect()
    }

    pub(crate) fn executed_at(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl CodeExecutor for FakeExecutor {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        limiter: &RateLimiter,
    ) -> Result<ExecutionRun, ExecutionError> {
        let granted = limiter.acquire().await;
        self.calls
            .lock()
            .expect("calls lock")
            .push((request.filename.clone(), granted));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&request.filename) {
            return Err(ExecutionError::HttpStatus {
                status: 500,
                body: "sandbox unavailable".to_string(),
            });
        }
        Ok(ExecutionRun {
            stdout: Some(request.content.clone()),
            ..ExecutionRun::default()
        })
    }
}
