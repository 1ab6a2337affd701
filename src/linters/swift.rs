use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{
    LintRequest, Linter, join_command, parse_line_number, require_extensions, require_runtime,
    run_tool, strip_dir,
};
use crate::error::Result;
use crate::lint_result::{Finding, LintResult, Severity};
use crate::process::{CommandRunner, RunOutput};

/// https://github.com/nicklockwood/SwiftFormat
pub struct SwiftFormatLockwood;

static LOCKWOOD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*):([0-9]+):[0-9]+: \w+: \((\w+)\) (.*)\.$").expect("valid swiftformat regex")
});

impl Linter for SwiftFormatLockwood {
    fn name(&self) -> &'static str {
        "SwiftFormat"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["swift"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, _dir: &Path, _prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "swiftformat", self.name())
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "swift")?;
        let command = join_command(&[
            request.prefix,
            "swiftformat",
            if request.fix { "" } else { "--lint" },
            request.args,
            "\".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        // Only the warning level is used; it is treated as an error
        for line in output.stderr.lines() {
            let Some(caps) = LOCKWOOD_LINE.captures(line) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stderr)?;
            result.push(
                Severity::Error,
                Finding::single_line(
                    strip_dir(&caps[1], dir),
                    line_nr,
                    format!("{} ({})", &caps[4], &caps[3]),
                ),
            );
        }
        Ok(result)
    }
}

/// https://github.com/apple/swift-format
pub struct SwiftFormatOfficial;

static OFFICIAL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*):([0-9]+):([0-9]+): (warning|error): (.*)$").expect("valid swift-format regex")
});

impl Linter for SwiftFormatOfficial {
    fn name(&self) -> &'static str {
        "swift-format"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["swift"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, _dir: &Path, _prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "swift-format", self.name())
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "swift")?;
        let mode = if request.fix { "format -i" } else { "lint" };
        let command = join_command(&[
            request.prefix,
            "swift-format",
            mode,
            request.args,
            "--recursive \".\"",
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut error = Vec::new();
        for line in output.stderr.lines() {
            let Some(caps) = OFFICIAL_LINE.captures(line) else {
                continue;
            };
            let line_nr = parse_line_number(self.name(), &caps[2], &output.stderr)?;
            error.push(Finding::single_line(
                strip_dir(&caps[1], dir),
                line_nr,
                &caps[5],
            ));
        }
        // Exits 0 even when it reports issues
        Ok(LintResult {
            is_success: error.is_empty(),
            error,
            warning: Vec::new(),
        })
    }
}

/// https://github.com/realm/SwiftLint
pub struct SwiftLint;

static SWIFTLINT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*):([0-9]+):[0-9]+: (warning|error): (.*)$").expect("valid swiftlint regex")
});

impl Linter for SwiftLint {
    fn name(&self) -> &'static str {
        "SwiftLint"
    }

    fn default_extensions(&self) -> &'static [&'static str] {
        &["swift"]
    }

    fn verify_setup(&self, runner: &dyn CommandRunner, _dir: &Path, _prefix: &str) -> Result<()> {
        require_runtime(runner, self.name(), "swiftlint", self.name())
    }

    fn lint(
        &self,
        runner: &dyn CommandRunner,
        dir: &Path,
        request: &LintRequest<'_>,
    ) -> Result<RunOutput> {
        require_extensions(self.name(), request.extensions, "swift")?;
        let command = join_command(&[
            request.prefix,
            "swiftlint",
            if request.fix { "--fix" } else { "" },
            request.args,
        ]);
        run_tool(runner, &command, dir)
    }

    fn parse_output(&self, dir: &Path, output: &RunOutput) -> Result<LintResult> {
        let mut result = LintResult::from_status(output.status);
        for line in output.stdout.lines() {
            let Some(caps) = SWIFTLINT_LINE.captures(line) else {
                continue;
            };
            let severity = if &caps[3] == "warning" {
                Severity::Warning
            } else {
                Severity::Error
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
