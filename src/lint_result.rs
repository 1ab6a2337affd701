use serde::{Deserialize, Serialize};

/// Two-level severity every tool's native vocabulary is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One reported issue at a file and line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub path: String,
    pub first_line: u32,
    pub last_line: u32,
    pub message: String,
}

impl Finding {
    /// Lines are 1-based; `last_line` never precedes `first_line`.
    pub fn new(
        path: impl Into<String>,
        first_line: u32,
        last_line: u32,
        message: impl Into<String>,
    ) -> Self {
        let first_line = first_line.max(1);
        Self {
            path: path.into(),
            first_line,
            last_line: last_line.max(first_line),
            message: message.into(),
        }
    }

    pub fn single_line(path: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self::new(path, line, line, message)
    }
}

/// Canonical result of one linter run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintResult {
    #[serde(rename = "isSuccess")]
    pub is_success: bool,
    pub error: Vec<Finding>,
    pub warning: Vec<Finding>,
}

impl Default for LintResult {
    fn default() -> Self {
        Self {
            is_success: true,
            error: Vec::new(),
            warning: Vec::new(),
        }
    }
}

impl LintResult {
    /// Empty result whose success is taken from the tool's exit status.
    pub fn from_status(status: i32) -> Self {
        Self {
            is_success: status == 0,
            ..Default::default()
        }
    }

    pub fn push(&mut self, severity: Severity, finding: Finding) {
        match severity {
            Severity::Error => self.error.push(finding),
            Severity::Warning => self.warning.push(finding),
        }
    }

    pub fn has_findings(&self) -> bool {
        !self.error.is_empty() || !self.warning.is_empty()
    }

    /// Human-readable count, e.g. `2 errors and 1 warning` or `no issues`.
    pub fn summary(&self) -> String {
        let errors = self.error.len();
        let warnings = self.warning.len();
        let plural = |n: usize, word: &str| format!("{n} {word}{}", if n > 1 { "s" } else { "" });

        match (errors, warnings) {
            (0, 0) => "no issues".to_string(),
            (e, 0) => plural(e, "error"),
            (0, w) => plural(w, "warning"),
            (e, w) => format!("{} and {}", plural(e, "error"), plural(w, "warning")),
        }
    }
}

pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn remove_trailing_period(s: &str) -> &str {
    s.strip_suffix('.').unwrap_or(s)
}
