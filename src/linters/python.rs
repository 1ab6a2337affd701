use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{
    LintRequest, Linter, join_command, parse_line_number, probe, require_extensions,
    require_runtime, run_tool, strip_dir, warn_fix_unsupported,
};
use crate::diff::parse_errors_from_diff;
use crate::error::Result;
use crate::lint_result::{Finding, LintResult, Severity, capitalize_first_letter};
use crate::process::{CommandRunner, RunOutput, shell_quote};

fn verify_python_tool(
    runner: &dyn CommandRunner,
    name: &str,
    binary: &str,
    dir: &Path,
    prefix: &str,
) -> Result<()> {
    require_runtime(runner, name, "python", "Python")?;
    probe(runner, name, &join_command(&[prefix, binary, "--version"]), dir)
}

/// Regex matching the extensions handed to Black-style `--include` options.
fn include_pattern(extensions: &[String]) -> String {
    format!("\"^.*\\.({})$\"", extensions.join("|"))
}

fn diff_result(output: &RunOutput, diff: &str) -> LintResult {
    let mut result = LintResult::from_status(output.status);
    result.error = parse_errors_from_diff(diff);
    result
}

/// https://github.com/hhatto/autopep8
pub struct Autopep8;

static AUTOPEP8_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(---|\+\+\+) (original|fixed)/\.[\\/]").expect("valid autopep8 regex")
});

impl Linter for Autopep8 {
    fn name(&self) -> &'static str {
        "Autopep8"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_python_tool(runner, self.name(), "autopep8", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "py")?;
        let fix_arg = if request.fix { "-i" } else { "-d --exit-code" };
        let command = join_command(&[request.prefix, "autopep8", fix_arg, request.args, "-r \".\""]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, _dir: &Path, output: &RunOutput) -> Result<LintResult> {
        // autopep8 labels files "original/./path" and "fixed/./path"
        let diff = AUTOPEP8_HEADER.replace_all(&output.stdout, "$1 ");
        Ok(diff_result(output, &diff))
    }
}

/// https://github.com/psf/black
pub struct Black;

impl Linter for Black {
    fn name(&self) -> &'static str {
        "Black"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_python_tool(runner, self.name(), "black", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        let fix_arg = if request.fix { "" } else { "--check --diff" };
        let include = include_pattern(request.extensions);
        let command = join_command(&[
            request.prefix,
            "black",
            fix_arg,
            "--include",
            &include,
            request.args,
            "\".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, _dir: &Path, output: &RunOutput) -> Result<LintResult> {
        Ok(diff_result(output, &output.stdout))
    }
}

/// https://github.com/google/oitnb
pub struct Oitnb;

impl Linter for Oitnb {
    fn name(&self) -> &'static str {
        "oitnb"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_python_tool(runner, self.name(), "oitnb", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        let fix_arg = if request.fix { "" } else { "--check --diff" };
        let include = include_pattern(request.extensions);
        let command = join_command(&[
            request.prefix,
            "oitnb",
            fix_arg,
            "--include",
            &include,
            request.args,
            "\".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, _dir: &Path, output: &RunOutput) -> Result<LintResult> {
        Ok(diff_result(output, &output.stdout))
    }
}

/// https://flake8.pycqa.org
pub struct Flake8;

static FLAKE8_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*):([0-9]+):[0-9]+: (\w*) (.*)$").expect("valid flake8 regex"));

impl Linter for Flake8 {
    fn name(&self) -> &'static str {
        "Flake8"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_python_tool(runner, self.name(), "flake8", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        warn_fix_unsupported(self.name(), request.fix);
        let files = request
            .extensions
            .iter()
            .map(|ext| format!("\"**{}*.{ext}\"", std::path::MAIN_SEPARATOR))
            .collect::<Vec<_>>()
            .join(",");
        let command = join_command(&[request.prefix, "flake8 --filename", &files, request.args]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        for line in output.stdout.lines() {
            let Some(caps) = FLAKE8_LINE.captures(line) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stdout)?;
            result.push(
                Severity::Error,
                Finding::single_line(
                    strip_dir(&caps[1], dir),
                    line_nr,
                    format!("{} ({})", capitalize_first_letter(&caps[4]), &caps[3]),
                ),
            );
        }
        Ok(result)
    }
}

/// https://mypy-lang.org
pub struct Mypy;

static MYPY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*):([0-9]+): (\w*): (.*)$").expect("valid mypy regex"));

fn mypy_severity(level: &str) -> Option<Severity> {
    match level {
        "error" => Some(Severity::Error),
        "warning" => Some(Severity::Warning),
        _ => None,
    }
}

impl Linter for Mypy {
    fn name(&self) -> &'static str {
        "Mypy"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_python_tool(runner, self.name(), "mypy", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "py")?;
        warn_fix_unsupported(self.name(), request.fix);

        // Only lint the whole directory when no path was passed in the args
        let specified_path = request
            .args
            .split_whitespace()
            .any(|arg| Path::new(arg).exists() || dir.join(arg).exists());
        let target = if specified_path {
            String::new()
        } else {
            shell_quote(&dir.to_string_lossy())
        };

        let command = join_command(&[request.prefix, "mypy", request.args, &target]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        for line in output.stdout.lines() {
            let Some(caps) = MYPY_LINE.captures(line) else {
                continue;
            };
            // "note" lines and anything else unrecognised are dropped
            let Some(severity) = mypy_severity(&caps[3]) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stdout)?;
            result.push(
                severity,
                Finding::single_line(strip_dir(&caps[1], dir), line_nr, &caps[4]),
            );
        }
        Ok(result)
    }
}

/// https://pylint.pycqa.org
pub struct Pylint;

static PYLINT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*):([0-9]+):[0-9]+: (\w*): (.*) (.*)$").expect("valid pylint regex")
});

impl Linter for Pylint {
    fn name(&self) -> &'static str {
        "Pylint"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_python_tool(runner, self.name(), "pylint", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "py")?;
        warn_fix_unsupported(self.name(), request.fix);
        let command = join_command(&[request.prefix, "pylint --recursive=y \".\"", request.args]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        for line in output.stdout.lines() {
            let Some(caps) = PYLINT_LINE.captures(line) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stdout)?;
            let rule = caps[5].replace(['(', ')'], "");
            result.push(
                Severity::Error,
                Finding::single_line(
                    strip_dir(&caps[1], dir),
                    line_nr,
                    format!("{} ({rule}, {})", capitalize_first_letter(&caps[4]), &caps[3]),
                ),
            );
        }
        Ok(result)
    }
}
