use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Public struct `GithubUser` used across runbot components.
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Public struct `GithubRepository` used across runbot components.
pub struct GithubRepository {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub owner: GithubUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// One side (`base` or `head`) of a pull request.
pub struct GithubPullRequestBranch {
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub repo: Option<GithubRepository>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Public struct `GithubPullRequest` used across runbot components.
pub struct GithubPullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GithubUser>,
    pub head: GithubPullRequestBranch,
    pub base: GithubPullRequestBranch,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Public struct `GithubIssue` used across runbot components.
pub struct GithubIssue {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Public struct `GithubIssueComment` used across runbot components.
pub struct GithubIssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<GithubUser>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GithubCommitDetail {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Entry of the pull request commit listing.
pub struct GithubCommit {
    pub sha: String,
    pub commit: GithubCommitDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
/// Response of the repository contents endpoint for a single file.
pub struct GithubContentFile {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequestEventPayload {
    pub action: String,
    pub pull_request: GithubPullRequest,
    pub repository: GithubRepository,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IssuesEventPayload {
    pub action: String,
    pub issue: GithubIssue,
    pub repository: GithubRepository,
}

#[derive(Debug, Deserialize)]
struct WebhookActionEnvelope {
    #[serde(default)]
    action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Webhook deliveries the bot reacts to; everything else is `Ignored`.
pub enum GithubWebhookEvent {
    Ping,
    IssueOpened(Box<IssuesEventPayload>),
    PullRequestOpened(Box<PullRequestEventPayload>),
    Ignored { event: String, action: Option<String> },
}

impl GithubWebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::IssueOpened(_) => "issues.opened",
            Self::PullRequestOpened(_) => "pull_request.opened",
            Self::Ignored { .. } => "ignored",
        }
    }
}

/// Classify a delivery from its `x-github-event` header and raw JSON body.
pub fn parse_github_webhook_event(event_name: &str, body: &str) -> Result<GithubWebhookEvent> {
    let event_name = event_name.trim();
    let envelope = serde_json::from_str::<WebhookActionEnvelope>(body)
        .context("invalid github webhook payload json")?;
    let action = envelope.action.as_deref().map(str::trim);

    match (event_name, action) {
        ("ping", _) => Ok(GithubWebhookEvent::Ping),
        ("issues", Some("opened")) => {
            let payload = serde_json::from_str::<IssuesEventPayload>(body)
                .context("invalid issues.opened payload")?;
            Ok(GithubWebhookEvent::IssueOpened(Box::new(payload)))
        }
        ("pull_request", Some("opened")) => {
            let payload = serde_json::from_str::<PullRequestEventPayload>(body)
                .context("invalid pull_request.opened payload")?;
            Ok(GithubWebhookEvent::PullRequestOpened(Box::new(payload)))
        }
        _ => Ok(GithubWebhookEvent::Ignored {
            event: event_name.to_string(),
            action: action.map(ToOwned::to_owned),
        }),
    }
}
