use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{
    LintRequest, Linter, join_command, parse_line_number, require_extensions, require_runtime,
    run_tool, strip_dir, warn_fix_unsupported,
};
use crate::diff::parse_errors_from_diff;
use crate::error::Result;
use crate::lint_result::{Finding, LintResult, Severity, capitalize_first_letter};
use crate::process::{CommandRunner, RunOutput};

/// https://pkg.go.dev/cmd/gofmt
pub struct Gofmt;

impl Linter for Gofmt {
    fn name(&self) -> &'static str {
        "gofmt"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, _dir: &Path, _prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "gofmt", self.name())
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "go")?;
        // -s simplifies, -d prints diffs, -e reports every error, -w rewrites
        let fix_arg = if request.fix { "-w" } else { "-d -e" };
        let command = join_command(&[request.prefix, "gofmt -s", fix_arg, request.args, "\".\""]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, _dir: &Path, output: &RunOutput) -> Result<LintResult> {
        // "diff -u old new" lines carry no a/ b/ markers, so they are skipped
        let diff = output
            .stdout
            .lines()
            .filter(|line| !line.starts_with("diff "))
            .collect::<Vec<_>>()
            .join("\n");

        // gofmt exits 0 even when files need formatting
        let error = parse_errors_from_diff(&diff);
        Ok(LintResult {
            is_success: error.is_empty(),
            error,
            warning: Vec::new(),
        })
    }
}

/// https://github.com/golang/lint
pub struct Golint;

static GOLINT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+):([0-9]+):[0-9]+: (.+)$").expect("valid golint regex"));

impl Linter for Golint {
    fn name(&self) -> &'static str {
        "golint"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["go"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, _dir: &Path, _prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "golint", self.name())
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "go")?;
        warn_fix_unsupported(self.name(), request.fix);
        let command = join_command(&[
            request.prefix,
            "golint -set_exit_status",
            request.args,
            "\".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        for line in output.stdout.lines() {
            let Some(caps) = GOLINT_LINE.captures(line) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stdout)?;
            result.push(
                Severity::Error,
                Finding::single_line(
                    strip_dir(&caps[1], dir),
                    line_nr,
                    capitalize_first_letter(&caps[3]),
                ),
            );
        }
        Ok(result)
    }
}
