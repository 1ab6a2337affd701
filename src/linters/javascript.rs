use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::{
    LintRequest, Linter, extensions_glob, join_command, npm_bin_command, parse_json,
    parse_line_number, probe, require_extensions, require_runtime, run_tool, strip_dir,
    warn_fix_unsupported,
};
use crate::error::{Error, Result};
use crate::lint_result::{Finding, LintResult, Severity, remove_trailing_period};
use crate::process::{CommandRunner, RunOutput};

fn verify_npm_tool(
    runner: &dyn CommandRunner,
    name: &str,
    version_cmd: &str,
    dir: &Path,
    prefix: &str,
) -> Result<()> {
    require_runtime(runner, name, "npm", "NPM")?;
    let bin = npm_bin_command(dir, prefix);
    probe(runner, name, &join_command(&[&bin, version_cmd]), dir)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFile {
    file_path: String,
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    rule_id: Option<String>,
    severity: u8,
    message: String,
    #[serde(default)]
    line: u32,
    #[serde(default)]
    fatal: bool,
}

/// Parse the ESLint JSON report format, shared by every tool that emits it.
pub(crate) fn parse_eslint_report(name: &str, dir: &Path, output: &RunOutput) -> Result<LintResult> {
    let mut result = LintResult::from_status(output.status);
    if output.stdout.trim().is_empty() {
        return Ok(result);
    }

    let files: Vec<EslintFile> = parse_json(name, &output.stdout)?;
    for file in files {
        let path = strip_dir(&file.file_path, dir);
        for msg in file.messages {
            if msg.fatal {
                return Err(Error::FatalLint {
                    linter: name.to_string(),
                    message: msg.message,
                });
            }
            let text = remove_trailing_period(&msg.message);
            let message = match msg.rule_id {
                Some(rule) => format!("{text} ({rule})"),
                None => text.to_string(),
            };
            let severity = match msg.severity {
                1 => Severity::Warning,
                2 => Severity::Error,
                _ => continue,
            };
            result.push(severity, Finding::single_line(path.clone(), msg.line, message));
        }
    }
    Ok(result)
}

/// https://eslint.org
pub struct Eslint;

impl Linter for Eslint {
    fn name(&self) -> &'static str {
        "ESLint"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["js"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_npm_tool(runner, self.name(), "eslint -v", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        let bin = npm_bin_command(dir, request.prefix);
        let ext = request
            .extensions
            .iter()
            .map(|e| format!(".{e}"))
            .collect::<Vec<_>>()
            .join(",");
        let command = join_command(&[
            &bin,
            "eslint --ext",
            &ext,
            if request.fix { "--fix" } else { "" },
            "--no-color --format json",
            request.args,
            "\".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        parse_eslint_report(self.name(), dir, output)
    }
}

/// https://github.com/xojs/xo
pub struct Xo;

impl Linter for Xo {
    fn name(&self) -> &'static str {
        "XO"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["js"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_npm_tool(runner, self.name(), "xo --version", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        let bin = npm_bin_command(dir, request.prefix);
        let ext = request
            .extensions
            .iter()
            .map(|e| format!("--extension {e}"))
            .collect::<Vec<_>>()
            .join(" ");
        let command = join_command(&[
            &bin,
            "xo",
            &ext,
            if request.fix { "--fix" } else { "" },
            "--reporter json",
            request.args,
            "\".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        parse_eslint_report(self.name(), dir, output)
    }
}

/// https://prettier.io
pub struct Prettier;

const PRETTIER_MESSAGE: &str =
    "There are issues with this file's formatting, please run Prettier to fix the errors";

impl Linter for Prettier {
    fn name(&self) -> &'static str {
        "Prettier"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &[
            "css", "html", "js", "json", "jsx", "md", "sass", "scss", "ts", "tsx", "vue", "yaml",
            "yml",
        ]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_npm_tool(runner, self.name(), "prettier -v", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        let bin = npm_bin_command(dir, request.prefix);
        let files = format!("\"{}\"", extensions_glob(request.extensions));
        let command = join_command(&[
            &bin,
            "prettier",
            if request.fix { "--write" } else { "--list-different" },
            "--no-color",
            request.args,
            &files,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        // `--write` lists every file it touched, so only a failing run is read
        if result.is_success {
            return Ok(result);
        }
        for line in output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            result.push(
                Severity::Error,
                Finding::single_line(strip_dir(line, dir), 1, PRETTIER_MESSAGE),
            );
        }
        Ok(result)
    }
}

/// https://stylelint.io
pub struct Stylelint;

#[derive(Debug, Deserialize)]
struct StylelintFile {
    source: String,
    #[serde(default)]
    warnings: Vec<StylelintWarning>,
}

#[derive(Debug, Deserialize)]
struct StylelintWarning {
    #[serde(default)]
    line: u32,
    severity: String,
    text: String,
}

impl Linter for Stylelint {
    fn name(&self) -> &'static str {
        "stylelint"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["css", "sass", "scss"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_npm_tool(runner, self.name(), "stylelint -v", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        let bin = npm_bin_command(dir, request.prefix);
        let files = format!("\"{}\"", extensions_glob(request.extensions));
        let command = join_command(&[
            &bin,
            "stylelint --no-color --formatter json",
            if request.fix { "--fix" } else { "" },
            request.args,
            &files,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        // Warnings alone leave the exit status at 0
        let mut result = LintResult::from_status(output.status);

        // Newer releases write the report to stderr
        let report = if output.stdout.trim().is_empty() {
            &output.stderr
        } else {
            &output.stdout
        };
        if report.trim().is_empty() {
            return Ok(result);
        }

        let files: Vec<StylelintFile> = parse_json(self.name(), report)?;
        for file in files {
            let path = strip_dir(&file.source, dir);
            for warning in file.warnings {
                let severity = match warning.severity.as_str() {
                    "error" => Severity::Error,
                    "warning" => Severity::Warning,
                    _ => continue,
                };
                result.push(
                    severity,
                    Finding::single_line(path.clone(), warning.line, warning.text),
                );
            }
        }
        Ok(result)
    }
}

/// https://www.typescriptlang.org
pub struct Tsc;

static TSC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)\((\d+),(\d+)\):\s(\w+)\s(.+)$").expect("valid tsc regex")
});

impl Linter for Tsc {
    fn name(&self) -> &'static str {
        "TypeScript"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["ts"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_npm_tool(runner, self.name(), "tsc -v", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "ts")?;
        warn_fix_unsupported(self.name(), request.fix);
        let bin = npm_bin_command(dir, request.prefix);
        let command = join_command(&[&bin, "tsc --noEmit --pretty false", request.args]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        for line in output.stdout.lines() {
            let Some(caps) = TSC_LINE.captures(line) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stdout)?;
            result.push(
                Severity::Error,
                Finding::single_line(strip_dir(&caps[1], dir), line_nr, &caps[5]),
            );
        }
        Ok(result)
    }
}
