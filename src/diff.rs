//! Unified diff parsing for formatters whose check mode prints a diff.
//!
//! Every hunk becomes one [`Finding`]: the range covers the hunk's old start
//! through old start + old length, and the message is the hunk body itself.

use std::sync::LazyLock;

use regex::Regex;

use crate::lint_result::Finding;

static HUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    old_start: u32,
    old_lines: u32,
    new_lines: u32,
}

fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let caps = HUNK_HEADER.captures(line)?;
    let num = |i: usize, default: u32| {
        caps.get(i)
            .map_or(Some(default), |m| m.as_str().parse::<u32>().ok())
    };
    Some(HunkHeader {
        old_start: num(1, 0)?,
        old_lines: num(2, 1)?,
        new_lines: num(4, 1)?,
    })
}

/// Extract the file path from a `---`/`+++` header, dropping any tab-separated
/// timestamp and the conventional `a/`/`b/` marker.
fn parse_header_path(rest: &str, marker: &str) -> String {
    let path = rest.split('\t').next().unwrap_or(rest).trim_end();
    path.strip_prefix(marker).unwrap_or(path).to_string()
}

/// Parse findings out of a unified diff.
pub fn parse_errors_from_diff(diff: &str) -> Vec<Finding> {
    let lines: Vec<&str> = diff.lines().collect();
    let mut findings = Vec::new();
    let mut from_path: Option<String> = None;
    let mut to_path: Option<String> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if let Some(rest) = line.strip_prefix("--- ") {
            from_path = Some(parse_header_path(rest, "a/"));
            to_path = None;
            i += 1;
            continue;
        }
        if let Some(rest) = line.strip_prefix("+++ ") {
            to_path = Some(parse_header_path(rest, "b/"));
            i += 1;
            continue;
        }

        let Some(header) = parse_hunk_header(line) else {
            i += 1;
            continue;
        };
        i += 1;

        // Consume exactly the lines the header announces so that removed lines
        // starting with "--- " are not mistaken for file headers.
        let mut old_remaining = header.old_lines;
        let mut new_remaining = header.new_lines;
        let mut body: Vec<&str> = Vec::new();
        while i < lines.len() && (old_remaining > 0 || new_remaining > 0) {
            let change = lines[i];
            match change.chars().next() {
                Some(' ') | None => {
                    old_remaining = old_remaining.saturating_sub(1);
                    new_remaining = new_remaining.saturating_sub(1);
                }
                Some('-') => old_remaining = old_remaining.saturating_sub(1),
                Some('+') => new_remaining = new_remaining.saturating_sub(1),
                Some('\\') => {}
                _ => break,
            }
            body.push(change);
            i += 1;
        }
        // "\ No newline at end of file" may trail the last change
        while i < lines.len() && lines[i].starts_with('\\') {
            body.push(lines[i]);
            i += 1;
        }

        let path = match (&to_path, &from_path) {
            (Some(to), _) if to != "/dev/null" => to.clone(),
            (_, Some(from)) => from.clone(),
            (Some(to), None) => to.clone(),
            (None, None) => String::new(),
        };

        findings.push(Finding::new(
            path,
            header.old_start,
            header.old_start + header.old_lines,
            body.join("\n"),
        ));
    }

    findings
}
