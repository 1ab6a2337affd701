use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Workflow trigger events a run can be started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Push,
    WorkflowDispatch,
    PullRequest,
    PullRequestTarget,
}

impl EventKind {
    pub fn is_pull_request(self) -> bool {
        matches!(self, EventKind::PullRequest | EventKind::PullRequestTarget)
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "push" => Ok(EventKind::Push),
            "workflow_dispatch" => Ok(EventKind::WorkflowDispatch),
            "pull_request" => Ok(EventKind::PullRequest),
            "pull_request_target" => Ok(EventKind::PullRequestTarget),
            other => Err(Error::UnsupportedEvent(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Push => "push",
            EventKind::WorkflowDispatch => "workflow_dispatch",
            EventKind::PullRequest => "pull_request",
            EventKind::PullRequestTarget => "pull_request_target",
        };
        f.write_str(name)
    }
}

/// The subset of the webhook payload the run depends on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub repository: Option<RepositoryPayload>,
    pub pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub full_name: String,
    pub clone_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Null when the head repository has been deleted.
    pub repo: Option<RepositoryPayload>,
}

impl EventPayload {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Context(format!("malformed event payload: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Context(format!("failed to read event payload {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    fn pull_request(&self) -> Result<&PullRequestPayload> {
        self.pull_request
            .as_ref()
            .ok_or_else(|| Error::Context("event payload has no pull_request".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub repo_name: String,
    pub clone_url: String,
    pub fork_name: Option<String>,
    pub fork_clone_url: Option<String>,
    pub has_fork: bool,
}

/// Everything a run needs to know about where it executes. Built once.
#[derive(Debug, Clone)]
pub struct RepositoryContext {
    pub actor: String,
    pub branch: String,
    pub event: EventKind,
    pub token: String,
    pub workspace: PathBuf,
    pub repository: Repository,
}

/// Hosting-platform environment variables.
#[derive(Debug, Clone)]
pub struct ActionEnv {
    pub actor: String,
    pub event_name: String,
    pub event_path: PathBuf,
    pub workspace: PathBuf,
}

fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::Context(format!(
            "environment variable {name} is not set"
        ))),
    }
}

impl ActionEnv {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            actor: required_env("GITHUB_ACTOR")?,
            event_name: required_env("GITHUB_EVENT_NAME")?,
            event_path: PathBuf::from(required_env("GITHUB_EVENT_PATH")?),
            workspace: PathBuf::from(required_env("GITHUB_WORKSPACE")?),
        })
    }
}

/// Branch the run operates on.
pub fn parse_branch(event: EventKind, payload: &EventPayload) -> Result<String> {
    if event.is_pull_request() {
        return Ok(payload.pull_request()?.head.git_ref.clone());
    }
    let git_ref = payload
        .git_ref
        .as_deref()
        .ok_or_else(|| Error::Context(format!("{event} payload has no ref")))?;
    git_ref
        .strip_prefix("refs/heads/")
        .map(str::to_string)
        .ok_or_else(|| Error::Context(format!("ref '{git_ref}' is not a branch")))
}

/// Base repository plus, on pull requests, the head repository when it differs.
pub fn parse_repository(event: EventKind, payload: &EventPayload) -> Result<Repository> {
    let base = payload
        .repository
        .as_ref()
        .ok_or_else(|| Error::Context("event payload has no repository".to_string()))?;

    let mut repository = Repository {
        repo_name: base.full_name.clone(),
        clone_url: base.clone_url.clone(),
        fork_name: None,
        fork_clone_url: None,
        has_fork: false,
    };

    if event.is_pull_request() {
        let head = payload.pull_request()?.head.repo.as_ref().ok_or_else(|| {
            Error::Context("pull request head repository is unavailable".to_string())
        })?;
        if head.full_name != base.full_name || head.clone_url != base.clone_url {
            repository.has_fork = true;
            repository.fork_name = Some(head.full_name.clone());
            repository.fork_clone_url = Some(head.clone_url.clone());
        }
    }

    Ok(repository)
}

impl RepositoryContext {
    pub fn resolve(env: &ActionEnv, payload: &EventPayload, token: String) -> Result<Self> {
        let event = env.event_name.parse::<EventKind>()?;
        let branch = parse_branch(event, payload)?;
        let repository = parse_repository(event, payload)?;
        debug!(
            %event,
            branch = %branch,
            repo = %repository.repo_name,
            has_fork = repository.has_fork,
            "resolved context"
        );
        Ok(Self {
            actor: env.actor.clone(),
            branch,
            event,
            token,
            workspace: env.workspace.clone(),
            repository,
        })
    }

    pub fn from_env(token: String) -> Result<Self> {
        let env = ActionEnv::from_env()?;
        let payload = EventPayload::load(&env.event_path)?;
        Self::resolve(&env, &payload, token)
    }
}
