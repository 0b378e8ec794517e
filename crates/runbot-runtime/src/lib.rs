//! Webhook runtime for runbot.
//!
//! Receives GitHub deliveries, decides whether a pull request asked for
//! `/execute`, runs the selected files through the execution service and
//! posts the results back as a comment. Deliveries are acknowledged with 202
//! and processed on detached tasks.

mod delivery_tasks;
mod event_handlers;
mod execution_dispatcher;
mod github_api_client;
mod pull_request_host;
#[cfg(test)]
mod test_support;
mod webhook_server;

pub use delivery_tasks::DeliveryTasks;
pub use event_handlers::{PullRequestRunReport, RunbotRuntime, DEFAULT_ISSUE_GREETING};
pub use execution_dispatcher::{
    ExecutionDispatcher, FileExecutionOutcome, FileExecutionStage, FileExecutionStatus,
};
pub use github_api_client::{GithubApiClient, GithubApiClientConfig, DEFAULT_GITHUB_API_BASE};
pub use pull_request_host::PullRequestHost;
pub use webhook_server::{
    build_webhook_router, run_runbot_webhook_server, RunbotServerConfig, GITHUB_WEBHOOK_ENDPOINT,
    HEALTH_ENDPOINT,
};
