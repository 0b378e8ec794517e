use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::rate_limiter::RateLimiter;
use crate::retry::{
    is_retryable_status, is_retryable_transport_error, new_request_id, parse_retry_after,
    retry_delay,
};
use crate::types::{CodeExecutor, ExecutionError, ExecutionFile, ExecutionRequest, ExecutionRun};

pub const DEFAULT_PISTON_EXECUTE_URL: &str = "https://emkc.org/api/v2/piston/execute";
pub const DEFAULT_PISTON_RETRY_BASE_DELAY_MS: u64 = 200;

#[derive(Debug, Clone)]
/// Connection settings for a Piston-compatible execution endpoint.
pub struct PistonConfig {
    pub execute_url: String,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for PistonConfig {
    fn default() -> Self {
        Self {
            execute_url: DEFAULT_PISTON_EXECUTE_URL.to_string(),
            request_timeout_ms: 30_000,
            max_retries: 2,
            retry_base_delay_ms: DEFAULT_PISTON_RETRY_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PistonClient {
    client: reqwest::Client,
    config: PistonConfig,
}

#[derive(Debug, Serialize)]
struct PistonExecuteBody<'a> {
    language: &'a str,
    version: &'a str,
    aliases: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    runtime: Option<&'a str>,
    files: Vec<ExecutionFile>,
}

#[derive(Debug, Deserialize)]
struct PistonExecuteResponse {
    #[serde(default)]
    run: Option<ExecutionRun>,
    #[serde(default)]
    message: Option<String>,
}

impl PistonClient {
    pub fn new(config: PistonConfig) -> Result<Self, ExecutionError> {
        if config.execute_url.trim().is_empty() {
            return Err(ExecutionError::InvalidConfig(
                "execution endpoint url is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("runbot-execution"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn execute_url(&self) -> &str {
        self.config.execute_url.trim()
    }
}

fn build_execute_body(request: &ExecutionRequest) -> PistonExecuteBody<'_> {
    PistonExecuteBody {
        language: &request.descriptor.language,
        version: &request.descriptor.version,
        aliases: &request.descriptor.aliases,
        runtime: request.descriptor.runtime.as_deref(),
        files: request.files(),
    }
}

fn parse_execute_response(raw: &str) -> Result<ExecutionRun, ExecutionError> {
    let parsed = serde_json::from_str::<PistonExecuteResponse>(raw)?;
    match parsed.run {
        Some(run) => Ok(run),
        None => Err(ExecutionError::InvalidResponse(match parsed.message {
            Some(message) => format!("execution response missing 'run': {message}"),
            None => "execution response missing 'run'".to_string(),
        })),
    }
}

#[async_trait]
impl CodeExecutor for PistonClient {
    async fn execute(
        &self,
        request: &ExecutionRequest,
        limiter: &RateLimiter,
    ) -> Result<ExecutionRun, ExecutionError> {
        let body = build_execute_body(request);
        let max_retries = self.config.max_retries;

        for attempt in 0..=max_retries {
            limiter.acquire().await;
            let response = self
                .client
                .post(self.execute_url())
                .header("x-runbot-request-id", new_request_id())
                .header("x-runbot-retry-attempt", attempt.to_string())
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let raw = response.text().await?;
                        return parse_execute_response(&raw);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let raw = response.text().await.unwrap_or_default();
                    if attempt < max_retries && is_retryable_status(status.as_u16()) {
                        let delay =
                            retry_delay(self.config.retry_base_delay_ms, attempt + 1, retry_after);
                        tracing::debug!(
                            file = %request.filename,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "retrying execution request"
                        );
                        sleep(delay).await;
                        continue;
                    }

                    return Err(ExecutionError::HttpStatus {
                        status: status.as_u16(),
                        body: raw,
                    });
                }
                Err(error) => {
                    if attempt < max_retries && is_retryable_transport_error(&error) {
                        sleep(retry_delay(
                            self.config.retry_base_delay_ms,
                            attempt + 1,
                            None,
                        ))
                        .await;
                        continue;
                    }
                    return Err(ExecutionError::Http(error));
                }
            }
        }

        Err(ExecutionError::InvalidResponse(
            "execution request exhausted retries".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use runbot_languages::LanguageDescriptor;

    use super::{build_execute_body, parse_execute_response, PistonClient, PistonConfig};
    use crate::types::{ExecutionError, ExecutionRequest};

    fn deno_request() -> ExecutionRequest {
        ExecutionRequest::new(
            "a.js",
            "console.log(1)",
            LanguageDescriptor {
                language: "javascript".to_string(),
                version: "1.32.3".to_string(),
                runtime: Some("deno".to_string()),
                aliases: vec!["deno-js".to_string()],
            },
        )
    }

    #[test]
    fn unit_build_execute_body_matches_piston_shape() {
        let request = deno_request();
        let body = serde_json::to_value(build_execute_body(&request)).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "language": "javascript",
                "version": "1.32.3",
                "aliases": ["deno-js"],
                "runtime": "deno",
                "files": [{"name": "a.js", "content": "console.log(1)"}]
            })
        );
    }

    #[test]
    fn functional_build_execute_body_omits_missing_runtime() {
        let mut request = deno_request();
        request.descriptor.runtime = None;
        let body = serde_json::to_value(build_execute_body(&request)).expect("serialize");
        assert!(body.get("runtime").is_none());
    }

    #[test]
    fn regression_parse_execute_response_requires_run_field() {
        let run = parse_execute_response(r#"{"run":{"stdout":"1\n","stderr":"","code":0,"signal":null}}"#)
            .expect("run");
        assert_eq!(run.stdout.as_deref(), Some("1\n"));
        assert_eq!(run.code, Some(0));

        let missing = parse_execute_response(r#"{"message":"javascript-1.0.0 runtime is unknown"}"#)
            .expect_err("missing run");
        match missing {
            ExecutionError::InvalidResponse(message) => {
                assert!(message.contains("runtime is unknown"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            parse_execute_response("<html>"),
            Err(ExecutionError::Serde(_))
        ));
    }

    #[test]
    fn regression_blank_execute_url_is_a_config_error() {
        let error = PistonClient::new(PistonConfig {
            execute_url: "   ".to_string(),
            ..PistonConfig::default()
        })
        .expect_err("blank url");
        match error {
            ExecutionError::InvalidConfig(message) => assert!(message.contains("url is empty")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
