use anyhow::{anyhow, bail, Result};
use runbot_languages::FileChange;

use crate::github_payloads::{GithubRepository, PullRequestEventPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Repository coordinates used by every host API call.
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid repository '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid repository '{raw}', expected owner/repo");
        }
        Ok(Self::new(owner, name))
    }

    pub fn from_repository(repository: &GithubRepository) -> Self {
        Self::new(repository.owner.login.clone(), repository.name.clone())
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Per-event view of a pull request; never persisted.
pub struct PullRequestContext {
    pub repo: RepoRef,
    pub pr_number: u64,
    pub head_ref: String,
    pub body: Option<String>,
    pub changed_files: Vec<FileChange>,
}

impl PullRequestContext {
    /// Build from a `pull_request` webhook. The base repository identifies
    /// where API calls go; the delivery's `repository` is the fallback.
    pub fn from_event(payload: &PullRequestEventPayload) -> Self {
        let pull_request = &payload.pull_request;
        let repo = pull_request
            .base
            .repo
            .as_ref()
            .map(RepoRef::from_repository)
            .unwrap_or_else(|| RepoRef::from_repository(&payload.repository));
        Self {
            repo,
            pr_number: pull_request.number,
            head_ref: pull_request.head.git_ref.clone(),
            body: pull_request.body.clone(),
            changed_files: Vec::new(),
        }
    }
}
