use anyhow::{anyhow, Context, Result};
use runbot_execution::PistonConfig;
use runbot_languages::LanguageRegistry;
use runbot_runtime::{run_runbot_webhook_server, GithubApiClientConfig, RunbotServerConfig};

use crate::cli_args::Cli;

/// `--retry-max-attempts` counts attempts; the execution client counts retries.
fn execution_max_retries(retry_max_attempts: usize) -> usize {
    retry_max_attempts.saturating_sub(1)
}

pub(crate) fn load_registry(cli: &Cli) -> Result<LanguageRegistry> {
    let registry = match cli.languages_file.as_deref() {
        Some(path) => LanguageRegistry::from_path(path)?,
        None => LanguageRegistry::builtin().context("built-in language registry is invalid")?,
    };
    tracing::debug!(
        languages = registry.len(),
        conflicts = registry.conflicts().len(),
        source = %cli
            .languages_file
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "builtin".to_string()),
        "loaded language registry"
    );
    Ok(registry)
}

pub(crate) fn render_registry_json(registry: &LanguageRegistry) -> Result<String> {
    serde_json::to_string_pretty(registry.descriptors())
        .context("failed to render language registry")
}

pub(crate) fn build_server_config(
    cli: &Cli,
    registry: LanguageRegistry,
) -> Result<RunbotServerConfig> {
    let token = cli
        .github_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| anyhow!("--github-token (or RUNBOT_GITHUB_TOKEN) is required"))?;

    Ok(RunbotServerConfig {
        bind: cli.bind.trim().to_string(),
        github: GithubApiClientConfig {
            api_base: cli.github_api_base.clone(),
            token: token.to_string(),
            request_timeout_ms: cli.request_timeout_ms,
            retry_max_attempts: cli.retry_max_attempts,
            retry_base_delay_ms: cli.retry_base_delay_ms,
        },
        piston: PistonConfig {
            execute_url: cli.execution_api_url.clone(),
            request_timeout_ms: cli.request_timeout_ms,
            max_retries: execution_max_retries(cli.retry_max_attempts),
            retry_base_delay_ms: cli.retry_base_delay_ms,
        },
        execution_min_interval_ms: cli.execution_min_interval_ms,
        registry,
        issue_greeting: cli.issue_greeting.clone(),
    })
}

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let registry = load_registry(&cli)?;
    if cli.languages_inspect {
        println!("{}", render_registry_json(&registry)?);
        return Ok(());
    }
    let config = build_server_config(&cli, registry)?;
    run_runbot_webhook_server(config).await
}
