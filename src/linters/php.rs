use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::{
    LintRequest, Linter, join_command, parse_json, probe, require_runtime, run_tool, strip_dir,
    warn_fix_unsupported,
};
use crate::error::Result;
use crate::lint_result::{Finding, LintResult, Severity, remove_trailing_period};
use crate::process::{CommandRunner, RunOutput};

/// https://github.com/PHPCSStandards/PHP_CodeSniffer
pub struct PhpCodeSniffer;

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    files: BTreeMap<String, FileReport>,
}

#[derive(Debug, Deserialize)]
struct FileReport {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    line: u32,
    message: String,
    source: String,
    #[serde(rename = "type")]
    kind: String,
}

impl Linter for PhpCodeSniffer {
    fn name(&self) -> &'static str {
        "PHP_CodeSniffer"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["php"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, dir: &Path, prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "php", "PHP")?;
        probe(
            runner,
            self.name(),
            &join_command(&[prefix, "phpcs --version"]),
            dir,
        )
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        warn_fix_unsupported(self.name(), request.fix);
        let extensions = format!("--extensions={}", request.extensions.join(","));
        let command = join_command(&[
            request.prefix,
            "phpcs",
            &extensions,
            "--report=json -q",
            request.args,
            "\".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        if output.stdout.trim().is_empty() {
            return Ok(result);
        }

        let report: Report = parse_json(self.name(), &output.stdout)?;
        for (file, violations) in report.files {
            let path = strip_dir(&file, dir);
            for msg in violations.messages {
                let severity = match msg.kind.as_str() {
                    "WARNING" => Severity::Warning,
                    "ERROR" => Severity::Error,
                    _ => continue,
                };
                result.push(
                    severity,
                    Finding::single_line(
                        path.clone(),
                        msg.line,
                        format!("{} ({})", remove_trailing_period(&msg.message), msg.source),
                    ),
                );
            }
        }
        Ok(result)
    }
}
