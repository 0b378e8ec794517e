use anyhow::Result;
use async_trait::async_trait;
use runbot_github::github_payloads::{GithubCommit, GithubIssueComment};
use runbot_github::pull_request_context::RepoRef;
use runbot_languages::FileChange;

use crate::github_api_client::GithubApiClient;

#[async_trait]
/// Repository host operations the webhook flow depends on.
pub trait PullRequestHost: Send + Sync {
    /// Current pull request body, which may have been edited since the delivery.
    async fn pull_request_body(&self, repo: &RepoRef, number: u64) -> Result<Option<String>>;

    async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<GithubIssueComment>>;

    async fn list_pull_request_commits(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<GithubCommit>>;

    async fn list_pull_request_files(&self, repo: &RepoRef, number: u64)
        -> Result<Vec<FileChange>>;

    async fn file_content(&self, repo: &RepoRef, path: &str, git_ref: &str) -> Result<String>;

    /// Returns the id of the created comment.
    async fn create_issue_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<u64>;
}

#[async_trait]
impl PullRequestHost for GithubApiClient {
    async fn pull_request_body(&self, repo: &RepoRef, number: u64) -> Result<Option<String>> {
        Ok(self.get_pull_request(repo, number).await?.body)
    }

    async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<GithubIssueComment>> {
        GithubApiClient::list_issue_comments(self, repo, number).await
    }

    async fn list_pull_request_commits(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<GithubCommit>> {
        GithubApiClient::list_pull_request_commits(self, repo, number).await
    }

    async fn list_pull_request_files(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<FileChange>> {
        GithubApiClient::list_pull_request_files(self, repo, number).await
    }

    async fn file_content(&self, repo: &RepoRef, path: &str, git_ref: &str) -> Result<String> {
        self.get_file_content(repo, path, git_ref).await
    }

    async fn create_issue_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<u64> {
        GithubApiClient::create_issue_comment(self, repo, number, body).await
    }
}
