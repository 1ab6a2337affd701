use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::checks::DEFAULT_API_URL;
use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::linters::registry::{LinterRegistry, SWIFTFORMAT_ALIAS, SWIFTFORMAT_TARGET};

pub const DEFAULT_CONFIG_PATH: &str = ".lintpilot.toml";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Fix code style issues with ${linter}";
pub const DEFAULT_CHECK_NAME: &str = "${linter}";
pub const DEFAULT_GIT_NAME: &str = "Lint Pilot";
pub const DEFAULT_GIT_EMAIL: &str = "lintpilot@users.noreply.github.com";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub auto_fix: Option<bool>,
    pub commit: Option<bool>,
    pub continue_on_error: Option<bool>,
    pub neutral_check_on_warning: Option<bool>,
    pub git_no_verify: Option<bool>,
    pub git_name: Option<String>,
    pub git_email: Option<String>,
    pub commit_message: Option<String>,
    pub check_name: Option<String>,
    pub github_api_url: Option<String>,
    #[serde(default)]
    pub linters: BTreeMap<String, LinterFile>,
}

/// `[linters.<id>]` table.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LinterFile {
    pub enabled: Option<bool>,
    pub extensions: Option<Vec<String>>,
    pub args: Option<String>,
    pub dir: Option<String>,
    pub command_prefix: Option<String>,
    pub auto_fix: Option<bool>,
}

/// Resolved settings of one enabled linter.
#[derive(Debug, Clone, PartialEq)]
pub struct LinterSettings {
    pub id: String,
    pub extensions: Vec<String>,
    pub args: String,
    /// Lint directory, relative to the workspace.
    pub dir: String,
    pub command_prefix: String,
    pub auto_fix: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub auto_fix: bool,
    pub commit: bool,
    pub continue_on_error: bool,
    pub neutral_check_on_warning: bool,
    pub git_no_verify: bool,
    pub git_name: String,
    pub git_email: String,
    pub commit_message: String,
    pub check_name: String,
    pub github_api_url: String,
    pub dry_run: bool,
    /// Enabled linters in execution order.
    pub linters: Vec<LinterSettings>,
}

impl Config {
    pub fn load(cli: &Cli, registry: &LinterRegistry) -> Result<Self> {
        let file_config = match cli.config {
            Some(ref path) => {
                let path = Path::new(path);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?, registry)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(path)?, registry)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        merge(file_config, cli, registry)
    }
}

pub fn parse_config(content: &str, registry: &LinterRegistry) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config, registry)?;
    Ok(config)
}

fn validate(config: &ConfigFile, registry: &LinterRegistry) -> Result<()> {
    for (id, linter) in &config.linters {
        check_known(id, registry)?;
        if let Some(ref extensions) = linter.extensions
            && extensions.iter().all(|e| e.trim().is_empty())
        {
            return Err(Error::ConfigValidation(format!(
                "linters.{id}.extensions must not be empty"
            )));
        }
        if let Some(ref dir) = linter.dir
            && dir.trim().is_empty()
        {
            return Err(Error::ConfigValidation(format!(
                "linters.{id}.dir must not be empty"
            )));
        }
    }
    for (key, template) in [
        ("commit_message", &config.commit_message),
        ("check_name", &config.check_name),
    ] {
        if let Some(template) = template
            && template.trim().is_empty()
        {
            return Err(Error::ConfigValidation(format!("{key} must not be empty")));
        }
    }
    Ok(())
}

fn check_known(id: &str, registry: &LinterRegistry) -> Result<()> {
    if registry.is_known(id) {
        Ok(())
    } else {
        Err(Error::ConfigValidation(format!(
            "unknown linter: {id} (expected one of: {})",
            registry.ids().join(", ")
        )))
    }
}

/// Normalise configured extensions: trimmed, without a leading dot.
fn clean_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

pub fn merge(mut file: ConfigFile, cli: &Cli, registry: &LinterRegistry) -> Result<Config> {
    for id in &cli.linters {
        check_known(id, registry)?;
    }

    let mut linters = Vec::new();
    for (id, linter) in registry.iter() {
        let table = file.linters.remove(id).unwrap_or_default();
        let enabled = cli.linters.iter().any(|l| l == id) || table.enabled.unwrap_or(false);
        if !enabled {
            continue;
        }
        if id == SWIFTFORMAT_ALIAS
            && linters
                .iter()
                .any(|l: &LinterSettings| l.id == SWIFTFORMAT_TARGET)
        {
            warn!(
                "{SWIFTFORMAT_ALIAS} is an alias of {SWIFTFORMAT_TARGET}, which is already enabled; ignoring it"
            );
            continue;
        }
        let extensions = match table.extensions {
            Some(ref extensions) => clean_extensions(extensions),
            None => linter
                .default_extensions()
                .iter()
                .map(|e| e.to_string())
                .collect(),
        };
        linters.push(LinterSettings {
            id: id.to_string(),
            extensions,
            args: table
                .args
                .unwrap_or_else(|| linter.default_args().to_string()),
            dir: table.dir.unwrap_or_else(|| ".".to_string()),
            command_prefix: table.command_prefix.unwrap_or_default(),
            auto_fix: table.auto_fix.unwrap_or(true),
        });
    }

    Ok(Config {
        auto_fix: cli.auto_fix || file.auto_fix.unwrap_or(false),
        commit: !cli.no_commit && file.commit.unwrap_or(true),
        continue_on_error: cli.continue_on_error || file.continue_on_error.unwrap_or(false),
        neutral_check_on_warning: cli.neutral_check_on_warning
            || file.neutral_check_on_warning.unwrap_or(false),
        git_no_verify: cli.git_no_verify || file.git_no_verify.unwrap_or(false),
        git_name: file
            .git_name
            .unwrap_or_else(|| DEFAULT_GIT_NAME.to_string()),
        git_email: file
            .git_email
            .unwrap_or_else(|| DEFAULT_GIT_EMAIL.to_string()),
        commit_message: file
            .commit_message
            .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
        check_name: file
            .check_name
            .unwrap_or_else(|| DEFAULT_CHECK_NAME.to_string()),
        github_api_url: cli
            .github_api_url
            .clone()
            .or(file.github_api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        dry_run: cli.dry_run,
        linters,
    })
}
