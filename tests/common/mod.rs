#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use lintpilot::checks::{CheckClient, CheckRequest, DEFAULT_API_URL};
use lintpilot::config::{
    Config, DEFAULT_CHECK_NAME, DEFAULT_COMMIT_MESSAGE, DEFAULT_GIT_EMAIL, DEFAULT_GIT_NAME,
    LinterSettings,
};
use lintpilot::context::{EventKind, Repository, RepositoryContext};
use lintpilot::error::{Error, Result};
use lintpilot::process::{CommandRunner, RunOptions, RunOutput};

pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a bare remote + working repo with an initial commit pushed to main.
pub fn setup_git_repo() -> (tempfile::TempDir, tempfile::TempDir) {
    let bare_dir = tempfile::TempDir::new().unwrap();
    run_git(bare_dir.path(), &["init", "--bare"]);

    let repo_dir = tempfile::TempDir::new().unwrap();
    run_git(repo_dir.path(), &["init"]);
    run_git(repo_dir.path(), &["config", "user.email", "test@test.com"]);
    run_git(repo_dir.path(), &["config", "user.name", "Test"]);
    std::fs::write(repo_dir.path().join("main.go"), "package main\n").unwrap();
    run_git(repo_dir.path(), &["add", "."]);
    run_git(repo_dir.path(), &["commit", "-m", "init"]);
    run_git(repo_dir.path(), &["branch", "-M", "main"]);
    run_git(
        repo_dir.path(),
        &["remote", "add", "origin", bare_dir.path().to_str().unwrap()],
    );
    run_git(repo_dir.path(), &["push", "-u", "origin", "main"]);

    (bare_dir, repo_dir)
}

/// Runner answering commands from a table keyed by command fragment.
/// Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct MockRunner {
    pub calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    pub responses: Vec<(String, RunOutput)>,
    pub missing: HashSet<String>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default().respond("git rev-parse HEAD", 0, "abc123")
    }

    pub fn respond(mut self, fragment: &str, status: i32, stdout: &str) -> Self {
        self.responses.insert(
            0,
            (
                fragment.to_string(),
                RunOutput {
                    status,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            ),
        );
        self
    }

    pub fn missing(mut self, binary: &str) -> Self {
        self.missing.insert(binary.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }

    pub fn ran(&self, fragment: &str) -> bool {
        self.commands().iter().any(|c| c.contains(fragment))
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &str, options: &RunOptions) -> Result<RunOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), options.env.clone()));
        let output = self
            .responses
            .iter()
            .find(|(fragment, _)| command.contains(fragment.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        if output.status != 0 && !options.ignore_errors {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status: output.status,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    fn command_exists(&self, binary: &str) -> bool {
        !self.missing.contains(binary)
    }
}

/// Check client that records requests and fails for selected check names.
#[derive(Default)]
pub struct RecordingChecks {
    pub requests: Mutex<Vec<CheckRequest>>,
    pub fail_names: HashSet<String>,
}

impl RecordingChecks {
    pub fn failing(name: &str) -> Self {
        let mut checks = Self::default();
        checks.fail_names.insert(name.to_string());
        checks
    }

    pub fn requests(&self) -> Vec<CheckRequest> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort_by(|a, b| a.name.cmp(&b.name));
        requests
    }
}

impl CheckClient for RecordingChecks {
    fn create_check(&self, request: &CheckRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_names.contains(&request.name) {
            return Err(Error::Check(format!(
                "error trying to create check for {}: status 403",
                request.name
            )));
        }
        Ok(())
    }
}

pub fn linter(id: &str, extensions: &[&str]) -> LinterSettings {
    LinterSettings {
        id: id.to_string(),
        extensions: extensions.iter().map(|e| e.to_string()).collect(),
        args: String::new(),
        dir: ".".to_string(),
        command_prefix: String::new(),
        auto_fix: true,
    }
}

/// Sensible default `Config` for tests. Callers can override fields via struct update syntax.
pub fn test_config(linters: Vec<LinterSettings>) -> Config {
    Config {
        auto_fix: false,
        commit: true,
        continue_on_error: false,
        neutral_check_on_warning: false,
        git_no_verify: false,
        git_name: DEFAULT_GIT_NAME.to_string(),
        git_email: DEFAULT_GIT_EMAIL.to_string(),
        commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
        check_name: DEFAULT_CHECK_NAME.to_string(),
        github_api_url: DEFAULT_API_URL.to_string(),
        dry_run: false,
        linters,
    }
}

pub fn test_context(event: EventKind, workspace: &Path, has_fork: bool) -> RepositoryContext {
    RepositoryContext {
        actor: "octocat".to_string(),
        branch: "feature".to_string(),
        event,
        token: "t0k3n".to_string(),
        workspace: PathBuf::from(workspace),
        repository: Repository {
            repo_name: "owner/app".to_string(),
            clone_url: "https://github.com/owner/app.git".to_string(),
            fork_name: has_fork.then(|| "contrib/app".to_string()),
            fork_clone_url: has_fork.then(|| "https://github.com/contrib/app.git".to_string()),
            has_fork,
        },
    }
}
