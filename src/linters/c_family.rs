use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{
    LintRequest, Linter, join_command, parse_line_number, probe, require_extensions,
    require_runtime, run_tool, strip_dir,
};
use crate::error::{Error, Result};
use crate::lint_result::{Finding, LintResult, Severity};
use crate::process::{CommandRunner, RunOutput, shell_quote};

/// https://clang.llvm.org/docs/ClangFormat.html
pub struct ClangFormat;

static CLANG_FORMAT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*):(\d+):\d+: error: (.*)$").expect("valid clang regex"));

/// Files under `dir` with one of `extensions`, relative to `dir` and sorted.
fn collect_files(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let root = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = BTreeSet::new();
    for ext in extensions {
        let pattern = format!("{root}/**/*.{ext}");
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::ConfigValidation(format!("invalid extension '{ext}': {e}")))?;
        for entry in entries {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            if !path.is_file() {
                continue;
            }
            let relative = path.strip_prefix(dir).unwrap_or(&path);
            files.insert(relative.to_string_lossy().into_owned());
        }
    }
    Ok(files.into_iter().collect())
}

impl Linter for ClangFormat {
    fn name(&self) -> &'static str {
        "clang_format"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["c", "cc", "cpp", "h", "hpp", "m", "mm"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, _dir: &Path, _prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "clang-format", "clang-format")
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        let files = collect_files(dir, request.extensions)?
            .iter()
            .map(|f| shell_quote(f))
            .collect::<Vec<_>>()
            .join(" ");
        let command = join_command(&[
            request.prefix,
            "clang-format",
            if request.fix { "-i" } else { "--dry-run" },
            "-Werror",
            request.args,
            &files,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        if result.is_success {
            return Ok(result);
        }
        for line in output.stderr.lines() {
            let Some(caps) = CLANG_FORMAT_LINE.captures(line) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stderr)?;
            result.push(
                Severity::Error,
                Finding::single_line(strip_dir(&caps[1], dir), line_nr, &caps[3]),
            );
        }
        Ok(result)
    }
}

/// https://github.com/dotnet/format
pub struct DotnetFormat;

static DOTNET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*)\(([0-9]+),([0-9]+)\): (warning|error) (.*) \[.*$")
        .expect("valid dotnet regex")
});

impl Linter for DotnetFormat {
    fn name(&self) -> &'static str {
        "dotnet_format"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["cs"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "dotnet", ".NET SDK")?;
        probe(
            runner,
            self.name(),
            &join_command(&[prefix, "dotnet format --version"]),
            dir,
        )
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "cs")?;
        let command = join_command(&[
            request.prefix,
            "dotnet format",
            if request.fix { "" } else { "--verify-no-changes" },
            request.args,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        for line in output.stderr.lines() {
            let Some(caps) = DOTNET_LINE.captures(line) else {
                continue;
            };
            let severity = if &caps[4] == "warning" {
                Severity::Warning
            } else {
                Severity::Error
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stderr)?;
            result.push(
                severity,
                Finding::single_line(strip_dir(&caps[1], dir), line_nr, &caps[5]),
            );
        }
        Ok(result)
    }
}
