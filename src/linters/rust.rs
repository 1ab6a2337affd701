use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{
    LintRequest, Linter, join_command, parse_json, parse_line_number, probe, require_extensions,
    require_runtime, run_tool, strip_dir,
};
use crate::error::{Error, Result};
use crate::lint_result::{Finding, LintResult, Severity};
use crate::process::{CommandRunner, RunOutput};

/// https://github.com/rust-lang/rust-clippy
pub struct Clippy;

#[derive(Debug, Deserialize)]
struct CargoMessage {
    reason: String,
    #[serde(default)]
    message: Option<CompilerMessage>,
}

#[derive(Debug, Deserialize)]
struct CompilerMessage {
    level: String,
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    spans: Vec<Span>,
}

#[derive(Debug, Deserialize)]
struct Span {
    file_name: String,
    line_start: u32,
    line_end: u32,
    #[serde(default)]
    is_primary: bool,
}

fn clippy_severity(level: &str) -> Option<Severity> {
    match level {
        "warning" => Some(Severity::Warning),
        "error" => Some(Severity::Error),
        _ => None,
    }
}

impl Linter for Clippy {
    fn name(&self) -> &'static str {
        "clippy"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "cargo", "cargo")?;
        probe(
            runner,
            self.name(),
            &join_command(&[prefix, "cargo clippy --version"]),
            dir,
        )
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "rs")?;
        // cargo rejects --allow-dirty without --fix
        let args = if request.fix {
            request.args.to_string()
        } else {
            request.args.replace("--allow-dirty", "")
        };
        let command = join_command(&[
            request.prefix,
            "cargo clippy",
            if request.fix { "--fix" } else { "" },
            "--message-format json",
            &args,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::default();

        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            let entry: CargoMessage = parse_json(self.name(), line)?;
            if entry.reason != "compiler-message" {
                continue;
            }
            let Some(msg) = entry.message else {
                continue;
            };
            // Summary lines ("3 warnings emitted") carry no code
            if msg.code.as_ref().is_none_or(|c| c.is_null()) {
                continue;
            }
            let Some(severity) = clippy_severity(&msg.level) else {
                continue;
            };
            let Some(span) = msg.spans.iter().find(|s| s.is_primary).or(msg.spans.first()) else {
                continue;
            };
            result.push(
                severity,
                Finding::new(
                    strip_dir(&span.file_name, dir),
                    span.line_start,
                    span.line_end,
                    msg.message,
                ),
            );
        }

        result.is_success = output.status == 0 && !result.has_findings();
        Ok(result)
    }
}

/// https://github.com/rust-lang/rustfmt
pub struct Rustfmt;

static RUSTFMT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)(?: at line |:)(\d+):\s*$").expect("valid rustfmt regex")
});

static RUSTFMT_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Diff in ").expect("valid rustfmt split regex"));

impl Linter for Rustfmt {
    fn name(&self) -> &'static str {
        "rustfmt"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn default_args(&self) -> &'static str {
        "-- --color=never"
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, _dir: &Path, _prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "cargo-fmt", "Cargo format")
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "rs")?;
        let command = join_command(&[
            request.prefix,
            "cargo fmt",
            if request.fix { "" } else { "--check" },
            request.args,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        if output.stdout.is_empty() {
            return Ok(result);
        }

        for chunk in RUSTFMT_SPLIT.split(&output.stdout).skip(1) {
            let (header, body) = chunk.split_once('\n').unwrap_or((chunk, ""));
            let caps = RUSTFMT_HEADER
                .captures(header.trim_end())
                .ok_or_else(|| Error::Parse {
                    linter: self.name().to_string(),
                    message: format!("unrecognised diff header '{header}'"),
                    output: output.stdout.clone(),
                })?;
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stdout)?;
            result.push(
                Severity::Error,
                Finding::single_line(strip_dir(&caps[1], dir), line_nr, body.trim_end()),
            );
        }
        Ok(result)
    }
}
