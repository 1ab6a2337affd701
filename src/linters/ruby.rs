use std::path::Path;

use serde::Deserialize;

use super::{
    LintRequest, Linter, join_command, parse_json, probe, require_extensions, require_runtime,
    run_tool, strip_dir, warn_fix_unsupported,
};
use crate::error::Result;
use crate::lint_result::{Finding, LintResult, Severity, remove_trailing_period};
use crate::process::{CommandRunner, RunOutput};

/// Shape shared by the RuboCop and ERB Lint JSON formatters.
#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    files: Vec<ReportFile>,
}

#[derive(Debug, Deserialize)]
struct ReportFile {
    path: String,
    #[serde(default)]
    offenses: Vec<Offense>,
}

#[derive(Debug, Deserialize)]
struct Offense {
    #[serde(default)]
    severity: Option<String>,
    message: String,
    #[serde(default)]
    cop_name: Option<String>,
    #[serde(default)]
    linter: Option<String>,
    #[serde(default)]
    corrected: bool,
    location: Location,
}

#[derive(Debug, Deserialize)]
struct Location {
    start_line: u32,
    #[serde(default)]
    last_line: Option<u32>,
}

impl Offense {
    fn finding(&self, dir: &Path, path: &str, rule: Option<&str>) -> Finding {
        let text = remove_trailing_period(&self.message);
        let message = match rule {
            Some(rule) => format!("{text} ({rule})"),
            None => text.to_string(),
        };
        Finding::new(
            strip_dir(path, dir),
            self.location.start_line,
            self.location.last_line.unwrap_or(self.location.start_line),
            message,
        )
    }
}

fn verify_ruby_tool(
    runner: &dyn CommandRunner,
    name: &str,
    binary: &str,
    dir: &Path,
    prefix: &str,
) -> Result<()> {
    require_runtime(runner, name, "ruby", "Ruby")?;
    probe(runner, name, &join_command(&[prefix, binary, "-v"]), dir)
}

/// https://rubocop.org
pub struct RuboCop;

/// Unknown severities are reported as errors.
fn rubocop_severity(severity: Option<&str>) -> Severity {
    match severity {
        Some("info" | "refactor" | "convention" | "warning") => Severity::Warning,
        _ => Severity::Error,
    }
}

impl Linter for RuboCop {
    fn name(&self) -> &'static str {
        "RuboCop"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["rb"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_ruby_tool(runner, self.name(), "rubocop", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "rb")?;
        let command = join_command(&[
            request.prefix,
            "rubocop --format json",
            if request.fix { "--auto-correct" } else { "" },
            request.args,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        if output.stdout.trim().is_empty() {
            return Ok(result);
        }

        let report: Report = parse_json(self.name(), &output.stdout)?;
        for file in &report.files {
            for offense in file.offenses.iter().filter(|o| !o.corrected) {
                result.push(
                    rubocop_severity(offense.severity.as_deref()),
                    offense.finding(dir, &file.path, offense.cop_name.as_deref()),
                );
            }
        }
        Ok(result)
    }
}

/// https://github.com/Shopify/erb-lint
pub struct Erblint;

impl Linter for Erblint {
    fn name(&self) -> &'static str {
        "ERB Lint"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["erb"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        verify_ruby_tool(runner, self.name(), "erblint", dir, prefix)
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "erb")?;
        warn_fix_unsupported(self.name(), request.fix);
        let command = join_command(&[
            request.prefix,
            "erblint --format json --lint-all",
            request.args,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        if output.stdout.trim().is_empty() {
            return Ok(result);
        }

        // ERB Lint does not report severities
        let report: Report = parse_json(self.name(), &output.stdout)?;
        for file in &report.files {
            for offense in file.offenses.iter().filter(|o| !o.corrected) {
                result.push(
                    Severity::Error,
                    offense.finding(dir, &file.path, offense.linter.as_deref()),
                );
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linters::testing::*;

    const RUBOCOP_REPORT: &str = r#"{
        "metadata": {"rubocop_version": "1.50.0"},
        "files": [
            {"path": "file1.rb", "offenses": [
                {"severity": "convention", "message": "Prefer single-quoted strings.", "cop_name": "Style/StringLiterals", "corrected": false, "location": {"start_line": 3, "start_column": 6, "last_line": 3, "last_column": 12}},
                {"severity": "error", "message": "unexpected token $end", "cop_name": "Lint/Syntax", "corrected": false, "location": {"start_line": 10, "last_line": 10}},
                {"severity": "convention", "message": "Trailing whitespace detected.", "cop_name": "Layout/TrailingWhitespace", "corrected": true, "location": {"start_line": 4, "last_line": 4}}
            ]},
            {"path": "lib/file2.rb", "offenses": [
                {"severity": "mystery", "message": "Odd thing", "cop_name": "Custom/Odd", "location": {"start_line": 1, "last_line": 2}},
                {"severity": "info", "message": "Just saying", "cop_name": "Custom/Info", "location": {"start_line": 5, "last_line": 5}}
            ]}
        ]
    }"#;

    #[test]
    fn test_rubocop_parse_and_severity_mapping() {
        let result = RuboCop
            .parse_output(Path::new("."), &output(1, RUBOCOP_REPORT, ""))
            .unwrap();
        assert!(!result.is_success);

        assert_eq!(
            result.warning,
            vec![
                Finding::single_line(
                    "file1.rb",
                    3,
                    "Prefer single-quoted strings (Style/StringLiterals)"
                ),
                Finding::single_line("lib/file2.rb", 5, "Just saying (Custom/Info)"),
            ]
        );
        assert_eq!(
            result.error,
            vec![
                Finding::single_line("file1.rb", 10, "unexpected token $end (Lint/Syntax)"),
                Finding::new("lib/file2.rb", 1, 2, "Odd thing (Custom/Odd)"),
            ]
        );
    }

    #[test]
    fn test_rubocop_command() {
        let runner = RecordingRunner::new();
        let extensions = exts(&["rb"]);
        RuboCop
            .lint(
                &runner,
                Path::new("."),
                &LintRequest {
                    extensions: &extensions,
                    args: "--parallel",
                    fix: true,
                    prefix: "bundle exec",
                },
            )
            .unwrap();
        assert_eq!(
            runner.last_command(),
            "bundle exec rubocop --format json --auto-correct --parallel"
        );
    }

    #[test]
    fn test_erblint_parse() {
        let report = r#"{"files": [{"path": "app/views/a.html.erb", "offenses": [
            {"linter": "SpaceAroundErbTag", "message": "Use 1 space after `<%=`.", "location": {"start_line": 2, "last_line": 2}}
        ]}]}"#;
        let result = Erblint
            .parse_output(Path::new("."), &output(1, report, ""))
            .unwrap();
        assert_eq!(
            result.error,
            vec![Finding::single_line(
                "app/views/a.html.erb",
                2,
                "Use 1 space after `<%=` (SpaceAroundErbTag)"
            )]
        );
        assert!(result.warning.is_empty());
    }

    #[test]
    fn test_verify_requires_ruby() {
        let runner = RecordingRunner::new().missing("ruby");
        let err = Erblint
            .verify_setup(&runner, Path::new("."), "")
            .unwrap_err();
        assert_eq!(err.to_string(), "ERB Lint: Ruby is not installed");
    }
}
