use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lintpilot::checks::GitHubChecks;
use lintpilot::cli::{Cli, CliCommand};
use lintpilot::config::Config;
use lintpilot::context::RepositoryContext;
use lintpilot::error::Result;
use lintpilot::linters::registry::LinterRegistry;
use lintpilot::orchestrator::Orchestrator;
use lintpilot::process::ShellRunner;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_writer(std::io::stderr)
        .init();
}

fn list_linters() {
    for (id, linter) in LinterRegistry::new().iter() {
        println!("{id:<24} {}", linter.name());
    }
}

/// Returns whether the run failed.
async fn run(cli: Cli) -> Result<bool> {
    let registry = LinterRegistry::new();
    let config = Config::load(&cli, &registry)?;
    info!(?config, "config loaded");

    let context = RepositoryContext::from_env(cli.github_token.clone())?;
    let checks = GitHubChecks::new(
        &config.github_api_url,
        &context.repository.repo_name,
        &context.token,
    );
    let continue_on_error = config.continue_on_error;
    let dry_run = config.dry_run;

    let orchestrator = Orchestrator::new(config, context, ShellRunner::new(), checks);
    let summary = orchestrator.run().await?;

    if dry_run {
        let json = serde_json::to_string_pretty(&summary.outcomes)?;
        println!("{json}");
    }
    Ok(summary.is_failure(continue_on_error))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    if let Some(CliCommand::Linters) = cli.command {
        list_linters();
        return;
    }

    info!("lintpilot starting");

    match run(cli).await {
        Ok(false) => {}
        Ok(true) => {
            eprintln!("error: linting failed");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
