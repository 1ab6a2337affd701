//! Check-run construction and submission.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::lint_result::{Finding, LintResult, capitalize_first_letter};

/// Hosting-platform limit on annotations per request.
pub const MAX_ANNOTATIONS: usize = 50;
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const ACCEPT_HEADER: &str = "application/vnd.github.antiope-preview+json";
const USER_AGENT: &str = concat!("lintpilot/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Success,
    Neutral,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Warning,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub annotation_level: AnnotationLevel,
    pub message: String,
}

impl Annotation {
    fn from_finding(finding: &Finding, level: AnnotationLevel) -> Self {
        Self {
            path: finding.path.clone(),
            start_line: finding.first_line,
            end_line: finding.last_line,
            annotation_level: level,
            message: finding.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutput {
    pub title: String,
    pub summary: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckRequest {
    pub name: String,
    pub head_sha: String,
    pub conclusion: Conclusion,
    pub output: CheckOutput,
}

/// Errors first, then warnings, cut to [`MAX_ANNOTATIONS`].
pub fn build_annotations(result: &LintResult) -> Vec<Annotation> {
    let total = result.error.len() + result.warning.len();
    let annotations: Vec<Annotation> = result
        .error
        .iter()
        .map(|f| Annotation::from_finding(f, AnnotationLevel::Failure))
        .chain(
            result
                .warning
                .iter()
                .map(|f| Annotation::from_finding(f, AnnotationLevel::Warning)),
        )
        .take(MAX_ANNOTATIONS)
        .collect();

    if total > MAX_ANNOTATIONS {
        info!(
            total,
            kept = MAX_ANNOTATIONS,
            "too many annotations, only the first {MAX_ANNOTATIONS} will be submitted"
        );
    }
    annotations
}

pub fn conclusion(is_success: bool, has_annotations: bool, neutral_on_warning: bool) -> Conclusion {
    match (is_success, has_annotations, neutral_on_warning) {
        (false, _, _) => Conclusion::Failure,
        (true, true, true) => Conclusion::Neutral,
        (true, _, _) => Conclusion::Success,
    }
}

pub fn build_check_request(
    name: &str,
    head_sha: &str,
    result: &LintResult,
    neutral_on_warning: bool,
) -> CheckRequest {
    let annotations = build_annotations(result);
    let summary = result.summary();
    CheckRequest {
        name: name.to_string(),
        head_sha: head_sha.to_string(),
        conclusion: conclusion(
            result.is_success,
            !annotations.is_empty(),
            neutral_on_warning,
        ),
        output: CheckOutput {
            title: capitalize_first_letter(&summary),
            summary: format!("{name} found {summary}"),
            annotations,
        },
    }
}

/// Destination for check runs.
pub trait CheckClient: Send + Sync {
    fn create_check(&self, request: &CheckRequest) -> Result<()>;
}

/// Check-runs REST client.
pub struct GitHubChecks {
    api_url: String,
    repo_name: String,
    token: String,
    initial_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    documentation_url: Option<String>,
}

impl GitHubChecks {
    pub fn new(api_url: &str, repo_name: &str, token: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            repo_name: repo_name.to_string(),
            token: token.to_string(),
            initial_backoff_ms: INITIAL_BACKOFF_MS,
        }
    }

    /// Shorten retry delays; used by tests.
    pub fn with_initial_backoff(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/repos/{}/check-runs", self.api_url, self.repo_name)
    }

    fn send(&self, request: &CheckRequest) -> std::result::Result<(), ureq::Error> {
        ureq::post(&self.endpoint())
            .set("Content-Type", "application/json")
            .set("Accept", ACCEPT_HEADER)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("User-Agent", USER_AGENT)
            .send_json(request)
            .map(|_| ())
    }
}

impl CheckClient for GitHubChecks {
    fn create_check(&self, request: &CheckRequest) -> Result<()> {
        info!(
            name = %request.name,
            conclusion = ?request.conclusion,
            annotations = request.output.annotations.len(),
            "creating check"
        );

        let mut backoff_ms = self.initial_backoff_ms;
        for attempt in 1..=MAX_RETRIES {
            match self.send(request) {
                Ok(()) => return Ok(()),
                Err(ref e) if attempt < MAX_RETRIES && is_retryable(e) => {
                    warn!(
                        attempt,
                        error = %e,
                        backoff_ms,
                        "retrying check creation after transient error"
                    );
                    thread::sleep(Duration::from_millis(backoff_ms));
                    backoff_ms *= 2;
                }
                Err(e) => {
                    return Err(Error::Check(format!(
                        "error trying to create check for {}: {}",
                        request.name,
                        describe_error(e)
                    )));
                }
            }
        }
        unreachable!()
    }
}

/// Only retry rate-limits (429), server errors (5xx), and transport/network errors.
fn is_retryable(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::Status(code, _) => *code == 429 || *code >= 500,
        ureq::Error::Transport(_) => true,
    }
}

fn describe_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, response) => {
            let mut description = format!("status {code}");
            if let Ok(body) = response.into_json::<ApiError>() {
                if let Some(message) = body.message {
                    description.push_str(&format!(". {message}"));
                }
                if let Some(url) = body.documentation_url {
                    description.push_str(&format!(" ({url})"));
                }
            }
            description
        }
        ureq::Error::Transport(t) => t.to_string(),
    }
}
