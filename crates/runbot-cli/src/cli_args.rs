use std::path::PathBuf;

use clap::Parser;
use runbot_execution::{DEFAULT_MIN_INTERVAL_MS, DEFAULT_PISTON_EXECUTE_URL};
use runbot_runtime::{DEFAULT_GITHUB_API_BASE, DEFAULT_ISSUE_GREETING};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "runbot",
    about = "GitHub webhook bot that runs pull request code on a remote sandbox",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "RUNBOT_BIND",
        default_value = "127.0.0.1:3000",
        help = "Address the webhook server listens on"
    )]
    pub(crate) bind: String,

    #[arg(
        long = "github-api-base",
        env = "RUNBOT_GITHUB_API_BASE",
        default_value = DEFAULT_GITHUB_API_BASE,
        help = "Base URL of the GitHub REST API"
    )]
    pub(crate) github_api_base: String,

    #[arg(
        long = "github-token",
        env = "RUNBOT_GITHUB_TOKEN",
        hide_env_values = true,
        required_unless_present = "languages_inspect",
        help = "Token used for GitHub API calls"
    )]
    pub(crate) github_token: Option<String>,

    #[arg(
        long = "execution-api-url",
        env = "RUNBOT_EXECUTION_API_URL",
        default_value = DEFAULT_PISTON_EXECUTE_URL,
        help = "Piston-compatible execute endpoint"
    )]
    pub(crate) execution_api_url: String,

    #[arg(
        long = "languages-file",
        env = "RUNBOT_LANGUAGES_FILE",
        help = "JSON array of language descriptors; the built-in registry is used when omitted"
    )]
    pub(crate) languages_file: Option<PathBuf>,

    #[arg(
        long = "execution-min-interval-ms",
        env = "RUNBOT_EXECUTION_MIN_INTERVAL_MS",
        default_value_t = DEFAULT_MIN_INTERVAL_MS,
        value_parser = parse_positive_u64,
        help = "Minimum spacing between execution requests"
    )]
    pub(crate) execution_min_interval_ms: u64,

    #[arg(
        long = "request-timeout-ms",
        env = "RUNBOT_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Timeout for outbound HTTP requests"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "RUNBOT_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per request for transient HTTP failures"
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "RUNBOT_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential retry backoff"
    )]
    pub(crate) retry_base_delay_ms: u64,

    #[arg(
        long = "issue-greeting",
        env = "RUNBOT_ISSUE_GREETING",
        default_value = DEFAULT_ISSUE_GREETING,
        help = "Comment posted on newly opened issues; empty disables it"
    )]
    pub(crate) issue_greeting: String,

    #[arg(
        long = "languages-inspect",
        default_value_t = false,
        help = "Print the loaded language registry as JSON and exit"
    )]
    pub(crate) languages_inspect: bool,
}
