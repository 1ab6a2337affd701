pub mod c_family;
pub mod golang;
pub mod javascript;
pub mod php;
pub mod python;
pub mod registry;
pub mod ruby;
pub mod rust;
pub mod swift;

use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Error, Result};
use crate::lint_result::LintResult;
use crate::process::{CommandRunner, RunOptions, RunOutput};

/// Per-invocation inputs handed to [`Linter::lint`].
#[derive(Debug, Clone, Copy)]
pub struct LintRequest<'a> {
    pub extensions: &'a [String],
    pub args: &'a str,
    pub fix: bool,
    pub prefix: &'a str,
}

/// One external code-style tool.
///
/// Implementations only know how to invoke their tool and how to read its
/// output; sequencing, git and check creation live elsewhere.
pub trait Linter: Send + Sync {
    /// Display name used in logs, check names and commit messages.
    fn name(&self) -> &'static str;

    /// Extensions linted when the configuration does not name any.
    fn default_extensions(&self) -> &'static [&'static str];

    /// Arguments used when the configuration does not provide any.
    fn default_args(&self) -> &'static str {
        ""
    }

    /// Check that the tool and the runtime it needs are installed.
    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()>;

    /// Run the tool once, in check or fix mode. A failing lint exit status is
    /// returned as data.
    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput>;

    /// Turn the raw tool output into findings. `dir` is the directory paths
    /// are made relative to.
    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult>;
}

pub(crate) fn require_runtime(
    runner: &dyn CommandRunner,
    linter: &str,
    binary: &str,
    label: &str,
) -> Result<()> {
    if runner.command_exists(binary) {
        Ok(())
    } else {
        Err(Error::MissingDependency {
            linter: linter.to_string(),
            dependency: label.to_string(),
        })
    }
}

/// Run a version/help command; any failure means the tool is missing.
pub(crate) fn probe(
    runner: &dyn CommandRunner,
    linter: &str,
    command: &str,
    dir: &Path,
) -> Result<()> {
    runner
        .run(command, &RunOptions::in_dir(dir))
        .map(|_| ())
        .map_err(|_| Error::MissingDependency {
            linter: linter.to_string(),
            dependency: linter.to_string(),
        })
}

/// Reject extension lists for tools whose file selection is fixed.
pub(crate) fn require_extensions(linter: &str, extensions: &[String], expected: &str) -> Result<()> {
    if extensions.len() == 1 && extensions[0] == expected {
        Ok(())
    } else {
        Err(Error::UnsupportedExtensions {
            linter: linter.to_string(),
            expected: expected.to_string(),
        })
    }
}

pub(crate) fn warn_fix_unsupported(linter: &str, fix: bool) {
    if fix {
        warn!("{linter} does not support auto-fixing");
    }
}

/// Run a lint command, keeping non-zero exits as data.
pub(crate) fn run_tool(runner: &dyn CommandRunner, command: &str, dir: &Path) -> Result<RunOutput> {
    runner.run(command, &RunOptions::in_dir(dir).tolerant())
}

/// Join command fragments with single spaces, skipping empty ones.
pub(crate) fn join_command(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Command used to execute an npm package binary: the configured prefix, Yarn
/// when the directory has a `yarn.lock`, npx otherwise.
pub(crate) fn npm_bin_command(dir: &Path, prefix: &str) -> String {
    if !prefix.trim().is_empty() {
        return prefix.trim().to_string();
    }
    if dir.join("yarn.lock").exists() {
        "yarn run --silent".to_string()
    } else {
        "npx --no-install".to_string()
    }
}

/// Glob pattern covering the given extensions, e.g. `**/*.{css,scss}`.
pub(crate) fn extensions_glob(extensions: &[String]) -> String {
    match extensions {
        [single] => format!("**/*.{single}"),
        many => format!("**/*.{{{}}}", many.join(",")),
    }
}

/// Make `path` relative to `dir` when the tool reported it absolute.
pub(crate) fn strip_dir(path: &str, dir: &Path) -> String {
    let dir = dir.to_string_lossy();
    let dir = dir.trim_end_matches(['/', '\\']);
    if !dir.is_empty()
        && let Some(rest) = path.strip_prefix(dir)
        && let Some(rest) = rest.strip_prefix(['/', '\\'])
    {
        return rest.to_string();
    }
    strip_leading_dot(path).to_string()
}

/// Remove a leading `./` or `.\`.
pub(crate) fn strip_leading_dot(path: &str) -> &str {
    path.strip_prefix("./")
        .or_else(|| path.strip_prefix(".\\"))
        .unwrap_or(path)
}

pub(crate) fn parse_json<T: DeserializeOwned>(linter: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::Parse {
        linter: linter.to_string(),
        message: e.to_string(),
        output: raw.to_string(),
    })
}

pub(crate) fn parse_line_number(linter: &str, text: &str, output: &str) -> Result<u32> {
    text.parse::<u32>().map_err(|e| Error::Parse {
        linter: linter.to_string(),
        message: format!("invalid line number '{text}': {e}"),
        output: output.to_string(),
    })
}
