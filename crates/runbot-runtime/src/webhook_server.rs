use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use runbot_execution::{PistonClient, PistonConfig, RateLimiter};
use runbot_github::github_payloads::{parse_github_webhook_event, GithubWebhookEvent};
use runbot_languages::LanguageRegistry;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::Instrument;

use crate::delivery_tasks::DeliveryTasks;
use crate::event_handlers::RunbotRuntime;
use crate::execution_dispatcher::ExecutionDispatcher;
use crate::github_api_client::{GithubApiClient, GithubApiClientConfig};

pub const GITHUB_WEBHOOK_ENDPOINT: &str = "/webhooks/github";
pub const HEALTH_ENDPOINT: &str = "/healthz";

#[derive(Debug, Clone)]
/// Everything needed to stand up the webhook server.
pub struct RunbotServerConfig {
    pub bind: String,
    pub github: GithubApiClientConfig,
    pub piston: PistonConfig,
    pub execution_min_interval_ms: u64,
    pub registry: LanguageRegistry,
    pub issue_greeting: String,
}

impl RunbotServerConfig {
    pub fn build_runtime(&self) -> Result<RunbotRuntime> {
        let github = GithubApiClient::new(self.github.clone())?;
        let piston = PistonClient::new(self.piston.clone())
            .context("failed to create execution client")?;
        let limiter = RateLimiter::new(Duration::from_millis(self.execution_min_interval_ms));
        Ok(RunbotRuntime::new(
            Arc::new(github),
            ExecutionDispatcher::new(Arc::new(piston), Arc::new(limiter)),
            Arc::new(self.registry.clone()),
            self.issue_greeting.clone(),
        ))
    }
}

/// Bind, serve until ctrl-c, let queued deliveries finish, then return.
pub async fn run_runbot_webhook_server(config: RunbotServerConfig) -> Result<()> {
    let runtime = Arc::new(config.build_runtime()?);
    let listener = TcpListener::bind(config.bind.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve webhook bound address")?;
    tracing::info!(
        addr = %local_addr,
        languages = config.registry.len(),
        github_api_base = %config.github.api_base,
        execution_api_url = %config.piston.execute_url,
        "runbot webhook server listening"
    );

    let deliveries = DeliveryTasks::new();
    let app = build_webhook_router(runtime, deliveries.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("runbot webhook server exited unexpectedly")?;
    if deliveries.active() > 0 {
        tracing::info!(
            active = deliveries.active(),
            "waiting for queued deliveries to finish"
        );
        deliveries.wait_idle().await;
    }
    tracing::info!("runbot webhook server stopped");
    Ok(())
}

#[derive(Clone)]
struct WebhookState {
    runtime: Arc<RunbotRuntime>,
    deliveries: DeliveryTasks,
}

/// Routes for GitHub deliveries and health checks. Issue and pull request
/// work is queued on `deliveries` and answered with 202 before it runs.
pub fn build_webhook_router(runtime: Arc<RunbotRuntime>, deliveries: DeliveryTasks) -> Router {
    Router::new()
        .route(GITHUB_WEBHOOK_ENDPOINT, post(handle_github_webhook))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .with_state(WebhookState {
            runtime,
            deliveries,
        })
}

async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: String,
) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({"error":{"code":code,"message":message}})))
}

async fn handle_github_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let Some(event_name) = header_value(&headers, "x-github-event") else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing_event",
            "x-github-event header is required".to_string(),
        );
    };
    let delivery = header_value(&headers, "x-github-delivery").unwrap_or("-");
    let span = tracing::info_span!("github_webhook", event = event_name, delivery);

    let event = match span.in_scope(|| parse_github_webhook_event(event_name, &body)) {
        Ok(event) => event,
        Err(error) => {
            span.in_scope(|| {
                tracing::warn!(error = %format!("{error:#}"), "rejected webhook payload");
            });
            return error_response(
                StatusCode::BAD_REQUEST,
                "parse_failed",
                format!("{error:#}"),
            );
        }
    };

    let kind = event.as_str();
    match event {
        GithubWebhookEvent::Ping => (StatusCode::OK, Json(json!({"status":"pong"}))),
        GithubWebhookEvent::Ignored { event, action } => {
            span.in_scope(|| tracing::debug!(action = ?action, "ignoring webhook"));
            (
                StatusCode::OK,
                Json(json!({"status":"ignored","event":event,"action":action})),
            )
        }
        GithubWebhookEvent::IssueOpened(payload) => {
            let runtime = Arc::clone(&state.runtime);
            state.deliveries.spawn(
                async move {
                    match runtime.handle_issue_opened(&payload).await {
                        Ok(comment_id) => tracing::info!(
                            comment_posted = comment_id.is_some(),
                            "issue delivery processed"
                        ),
                        Err(error) => {
                            tracing::error!(error = %format!("{error:#}"), "webhook handler failed")
                        }
                    }
                }
                .instrument(span),
            );
            queued(kind)
        }
        GithubWebhookEvent::PullRequestOpened(payload) => {
            let runtime = Arc::clone(&state.runtime);
            state.deliveries.spawn(
                async move {
                    match runtime.handle_pull_request_opened(&payload).await {
                        Ok(report) => tracing::info!(
                            requested = report.requested,
                            language_tag = ?report.language_tag,
                            selected_files = report.selected_files,
                            completed = report.completed,
                            failed = report.failed,
                            comment_posted = report.comment_id.is_some(),
                            "pull request delivery processed"
                        ),
                        Err(error) => {
                            tracing::error!(error = %format!("{error:#}"), "webhook handler failed")
                        }
                    }
                }
                .instrument(span),
            );
            queued(kind)
        }
    }
}

fn queued(kind: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::ACCEPTED,
        Json(json!({"status":"queued","event":kind})),
    )
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use reqwest::{Client, StatusCode};
    use runbot_execution::RateLimiter;
    use runbot_languages::LanguageRegistry;
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::build_webhook_router;
    use crate::delivery_tasks::DeliveryTasks;
    use crate::event_handlers::RunbotRuntime;
    use crate::execution_dispatcher::ExecutionDispatcher;
    use crate::test_support::{FakeExecutor, FakeHost};

    struct TestServer {
        addr: SocketAddr,
        deliveries: DeliveryTasks,
        handle: JoinHandle<()>,
    }

    impl TestServer {
        async fn drain(&self) {
            tokio::time::timeout(Duration::from_secs(5), self.deliveries.wait_idle())
                .await
                .expect("queued deliveries should finish");
        }
    }

    async fn spawn_router(host: Arc<FakeHost>, executor: FakeExecutor) -> TestServer {
        let runtime = RunbotRuntime::new(
            host,
            ExecutionDispatcher::new(
                Arc::new(executor),
                Arc::new(RateLimiter::new(Duration::from_millis(1))),
            ),
            Arc::new(LanguageRegistry::builtin().expect("registry")),
            "hello",
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let deliveries = DeliveryTasks::new();
        let app = build_webhook_router(Arc::new(runtime), deliveries.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        tokio::time::sleep(Duration::from_millis(25)).await;
        TestServer {
            addr,
            deliveries,
            handle,
        }
    }

    async fn post_event(addr: SocketAddr, event: &str, body: String) -> (StatusCode, Value) {
        let response = Client::new()
            .post(format!("http://{addr}/webhooks/github"))
            .header("x-github-event", event)
            .header("x-github-delivery", "delivery-1")
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("send webhook");
        let status = response.status();
        let payload = response.json::<Value>().await.expect("json response");
        (status, payload)
    }

    fn execute_request_body() -> String {
        json!({
            "action": "opened",
            "pull_request": {
                "number": 7,
                "body": "/execute",
                "head": {"ref": "feature"},
                "base": {"ref": "main"}
            },
            "repository": {"name": "demo", "owner": {"login": "octo"}}
        })
        .to_string()
    }

    #[tokio::test]
    async fn unit_health_endpoint_reports_ok() {
        let server = spawn_router(Arc::new(FakeHost::default()), FakeExecutor::echo()).await;
        let response = Client::new()
            .get(format!("http://{}/healthz", server.addr))
            .send()
            .await
            .expect("health");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = response.json::<Value>().await.expect("json");
        assert_eq!(payload["status"], "ok");
        server.handle.abort();
    }

    #[tokio::test]
    async fn functional_ping_and_unhandled_events_are_acknowledged() {
        let server = spawn_router(Arc::new(FakeHost::default()), FakeExecutor::echo()).await;

        let (status, payload) =
            post_event(server.addr, "ping", json!({"zen":"hi"}).to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "pong");

        let (status, payload) = post_event(
            server.addr,
            "push",
            json!({"ref":"refs/heads/main"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "ignored");
        assert_eq!(payload["event"], "push");
        assert_eq!(server.deliveries.active(), 0);
        server.handle.abort();
    }

    #[tokio::test]
    async fn integration_pull_request_opened_is_queued_and_posts_results() {
        let host = Arc::new(
            FakeHost::default()
                .with_body("/execute")
                .with_changed_file("a.js")
                .with_changed_file("b.txt")
                .with_file("a.js", "42\n"),
        );
        let server = spawn_router(Arc::clone(&host), FakeExecutor::echo()).await;

        let (status, payload) =
            post_event(server.addr, "pull_request", execute_request_body()).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(payload["status"], "queued");
        assert_eq!(payload["event"], "pull_request.opened");

        server.drain().await;
        assert_eq!(host.fetched_paths(), vec!["a.js"]);
        let posted = host.posted_comments();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].body, "Execution Results:\n\n42\n");
        server.handle.abort();
    }

    #[tokio::test]
    async fn regression_pull_request_run_outlives_a_disconnected_sender() {
        let host = Arc::new(
            FakeHost::default()
                .with_body("/execute")
                .with_changed_file("slow.js")
                .with_file("slow.js", "done\n"),
        );
        let executor = FakeExecutor::echo().with_delay(Duration::from_millis(500));
        let server = spawn_router(Arc::clone(&host), executor).await;

        let client = Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("client");
        let response = client
            .post(format!("http://{}/webhooks/github", server.addr))
            .header("x-github-event", "pull_request")
            .header("content-type", "application/json")
            .body(execute_request_body())
            .send()
            .await
            .expect("acknowledged before the client timeout");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        drop(response);
        drop(client);
        assert!(host.posted_comments().is_empty());

        server.drain().await;
        let posted = host.posted_comments();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].body, "Execution Results:\n\ndone\n");
        server.handle.abort();
    }

    #[tokio::test]
    async fn regression_malformed_and_failing_deliveries_map_to_status_codes() {
        let host = Arc::new(FakeHost::default().failing_body_lookup());
        let server = spawn_router(Arc::clone(&host), FakeExecutor::echo()).await;

        let (status, payload) =
            post_event(server.addr, "pull_request", "{oops".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"]["code"], "parse_failed");

        let body = json!({
            "action": "opened",
            "pull_request": {"number": 1, "head": {"ref": "x"}, "base": {"ref": "main"}},
            "repository": {"name": "demo", "owner": {"login": "octo"}}
        })
        .to_string();
        let (status, payload) = post_event(server.addr, "pull_request", body).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(payload["status"], "queued");
        server.drain().await;
        assert!(host.posted_comments().is_empty());

        let response = Client::new()
            .post(format!("http://{}/webhooks/github", server.addr))
            .body("{}")
            .send()
            .await
            .expect("send");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = response.json::<Value>().await.expect("json");
        assert_eq!(payload["error"]["code"], "missing_event");
        server.handle.abort();
    }
}
