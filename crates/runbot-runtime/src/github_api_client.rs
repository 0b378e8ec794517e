use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use runbot_github::github_content::decode_content_file;
use runbot_github::github_payloads::{
    GithubCommit, GithubContentFile, GithubIssueComment, GithubPullRequest,
};
use runbot_execution::retry::{
    is_retryable_status, is_retryable_transport_error, new_request_id, parse_retry_after,
    retry_delay,
};
use runbot_github::github_transport_helpers::truncate_for_error;
use runbot_github::pull_request_context::RepoRef;
use runbot_languages::FileChange;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
/// Connection settings for the GitHub REST API.
pub struct GithubApiClientConfig {
    pub api_base: String,
    pub token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct GithubCommentCreateResponse {
    id: u64,
}

#[derive(Clone)]
/// Authenticated GitHub client. Repository coordinates come per call since a
/// single installation serves many repositories.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GithubApiClient {
    pub fn new(config: GithubApiClientConfig) -> Result<Self> {
        let token = config.token.trim();
        if token.is_empty() {
            bail!("github token is empty");
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("runbot"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn repo_url(&self, repo: &RepoRef, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, repo.owner, repo.name, suffix
        )
    }

    /// Contents URL with every path segment percent-encoded.
    fn contents_url(&self, repo: &RepoRef, path: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base)
            .with_context(|| format!("invalid github api base '{}'", self.api_base))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("github api base '{}' cannot hold a path", self.api_base))?;
            segments
                .pop_if_empty()
                .extend(["repos", repo.owner.as_str(), repo.name.as_str(), "contents"])
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        Ok(url)
    }

    pub async fn get_pull_request(&self, repo: &RepoRef, number: u64) -> Result<GithubPullRequest> {
        let url = self.repo_url(repo, &format!("pulls/{number}"));
        self.request_json("get pull request", || self.http.get(&url))
            .await
    }

    pub async fn list_issue_comments(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<GithubIssueComment>> {
        let url = self.repo_url(repo, &format!("issues/{number}/comments"));
        self.list_paginated("list issue comments", &url).await
    }

    pub async fn list_pull_request_commits(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<GithubCommit>> {
        let url = self.repo_url(repo, &format!("pulls/{number}/commits"));
        self.list_paginated("list pull request commits", &url).await
    }

    pub async fn list_pull_request_files(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<FileChange>> {
        let url = self.repo_url(repo, &format!("pulls/{number}/files"));
        self.list_paginated("list pull request files", &url).await
    }

    /// Decoded text of `path` at `git_ref`.
    pub async fn get_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<String> {
        let url = self.contents_url(repo, path)?;
        let file: GithubContentFile = self
            .request_json("get file content", || {
                self.http.get(url.clone()).query(&[("ref", git_ref)])
            })
            .await?;
        decode_content_file(&file).with_context(|| format!("failed to decode content of {path}"))
    }

    pub async fn create_issue_comment(
        &self,
        repo: &RepoRef,
        number: u64,
        body: &str,
    ) -> Result<u64> {
        let url = self.repo_url(repo, &format!("issues/{number}/comments"));
        let payload = json!({ "body": body });
        let created: GithubCommentCreateResponse = self
            .request_json("create issue comment", || self.http.post(&url).json(&payload))
            .await?;
        Ok(created.id)
    }

    async fn list_paginated<T>(&self, operation: &str, url: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        let per_page = PAGE_SIZE.to_string();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<T> = self
                .request_json(operation, || {
                    self.http.get(url).query(&[
                        ("per_page", per_page.as_str()),
                        ("page", page_value.as_str()),
                    ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    async fn request_json<T, F>(&self, operation: &str, mut request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header("x-runbot-request-id", new_request_id())
                .header("x-runbot-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode github {operation}"));
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_status(status.as_u16())
                    {
                        let delay = retry_delay(self.retry_base_delay_ms, attempt, retry_after);
                        tracing::debug!(
                            operation,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying github request"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    bail!(
                        "github api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }
}
