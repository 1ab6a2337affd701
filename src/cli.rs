use clap::{Parser, Subcommand};

/// lintpilot: run linters, annotate commits with check runs, push auto-fixes
#[derive(Parser, Debug, Clone)]
#[command(name = "lintpilot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Path to config file (default: .lintpilot.toml if present)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Enable a linter by id (repeatable or comma-separated)
    #[arg(long = "linter", value_delimiter = ',')]
    pub linters: Vec<String>,

    /// Let linters fix issues and commit the result
    #[arg(long)]
    pub auto_fix: bool,

    /// Leave auto-fixed files uncommitted
    #[arg(long)]
    pub no_commit: bool,

    /// Exit successfully even when linters report failures
    #[arg(long)]
    pub continue_on_error: bool,

    /// Use a neutral conclusion for checks that only have annotations on success
    #[arg(long)]
    pub neutral_check_on_warning: bool,

    /// Pass --no-verify to git commit and git push
    #[arg(long)]
    pub git_no_verify: bool,

    /// Lint and print results as JSON without committing or creating checks
    #[arg(long)]
    pub dry_run: bool,

    /// Token used for check creation and pushing auto-fixes
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, default_value = "")]
    pub github_token: String,

    /// REST API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    pub github_api_url: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List supported linter ids in execution order
    Linters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::parse_from(["lintpilot", "--github-token", ""]);
        assert!(cli.linters.is_empty());
        assert!(!cli.auto_fix);
        assert!(!cli.no_commit);
        assert!(!cli.dry_run);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_repeated_and_comma_separated_linters() {
        let cli = Cli::parse_from([
            "lintpilot",
            "--linter",
            "eslint,prettier",
            "--linter",
            "black",
        ]);
        assert_eq!(cli.linters, vec!["eslint", "prettier", "black"]);
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::parse_from([
            "lintpilot",
            "--config",
            "ci/lint.toml",
            "--auto-fix",
            "--no-commit",
            "--continue-on-error",
            "--neutral-check-on-warning",
            "--git-no-verify",
            "--dry-run",
            "--github-token",
            "abc",
            "--github-api-url",
            "https://ghe.example/api/v3",
        ]);
        assert_eq!(cli.config.as_deref(), Some("ci/lint.toml"));
        assert!(cli.auto_fix);
        assert!(cli.no_commit);
        assert!(cli.continue_on_error);
        assert!(cli.neutral_check_on_warning);
        assert!(cli.git_no_verify);
        assert!(cli.dry_run);
        assert_eq!(cli.github_token, "abc");
        assert_eq!(
            cli.github_api_url.as_deref(),
            Some("https://ghe.example/api/v3")
        );
    }

    #[test]
    fn test_parse_linters_subcommand() {
        let cli = Cli::parse_from(["lintpilot", "linters"]);
        assert!(matches!(cli.command, Some(CliCommand::Linters)));
    }

    #[test]
    fn test_config_flag_is_global() {
        let cli = Cli::parse_from(["lintpilot", "linters", "--config", "x.toml"]);
        assert_eq!(cli.config.as_deref(), Some("x.toml"));
    }
}
