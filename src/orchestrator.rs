use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::checks::{CheckClient, build_check_request};
use crate::config::{Config, LinterSettings};
use crate::context::{EventKind, RepositoryContext};
use crate::error::{Error, Result};
use crate::git::{GitAuth, GitWorkflow};
use crate::lint_result::LintResult;
use crate::linters::registry::LinterRegistry;
use crate::linters::{LintRequest, Linter};
use crate::process::CommandRunner;
use crate::template::{TemplateVars, render};

/// Result of one linter within a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinterOutcome {
    pub linter: String,
    pub name: String,
    pub check_name: String,
    pub result: LintResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub head_sha: String,
    pub outcomes: Vec<LinterOutcome>,
    pub failed_checks: usize,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.result.is_success)
    }

    /// Whether the run as a whole fails. Check submission never counts.
    pub fn is_failure(&self, continue_on_error: bool) -> bool {
        self.has_failures() && !continue_on_error
    }
}

/// An enabled linter whose setup has been verified.
struct PreparedLinter<'a> {
    settings: &'a LinterSettings,
    linter: &'a dyn Linter,
    dir: PathBuf,
    check_name: String,
    commit_message: String,
}

pub struct Orchestrator<R, C> {
    config: Config,
    context: RepositoryContext,
    runner: R,
    checks: Arc<C>,
    registry: LinterRegistry,
}

impl<R: CommandRunner, C: CheckClient + 'static> Orchestrator<R, C> {
    pub fn new(config: Config, context: RepositoryContext, runner: R, checks: C) -> Self {
        Self {
            config,
            context,
            runner,
            checks: Arc::new(checks),
            registry: LinterRegistry::new(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn checks(&self) -> &C {
        &self.checks
    }

    /// Lint with every enabled linter in order, then create one check per linter.
    pub async fn run(&self) -> Result<RunSummary> {
        let ctx = &self.context;
        let dry_run = self.config.dry_run;
        info!(
            event = %ctx.event,
            branch = %ctx.branch,
            linters = self.config.linters.len(),
            dry_run,
            "starting lint run"
        );
        self.warn_about_forks();

        if self.config.linters.is_empty() {
            warn!("no linters enabled");
        }

        let prepared = self.prepare()?;

        let git = GitWorkflow::new(
            &self.runner,
            ctx.workspace.clone(),
            GitAuth::new(ctx.token.clone()),
        );

        if !dry_run {
            if self.config.auto_fix {
                git.set_user_info(&self.config.git_name, &self.config.git_email)?;
            }
            if ctx.event.is_pull_request() {
                git.check_out_remote_branch(ctx)?;
            }
        }
        let mut head_sha = if dry_run {
            String::new()
        } else {
            git.head_sha()?
        };

        let mut outcomes = Vec::with_capacity(prepared.len());
        let mut fixed = false;
        for linter in &prepared {
            let (outcome, ran_fix) = self.lint_one(&git, linter)?;
            fixed |= ran_fix;
            outcomes.push(outcome);
        }

        let mut failed_checks = 0;
        if !dry_run {
            if fixed && ctx.event.is_pull_request() {
                head_sha = git.head_sha()?;
            }
            failed_checks = self.create_checks(&head_sha, &outcomes).await;
        }

        let summary = RunSummary {
            head_sha,
            outcomes,
            failed_checks,
        };
        if summary.has_failures() {
            info!("linting failures detected");
        }
        Ok(summary)
    }

    fn warn_about_forks(&self) {
        let ctx = &self.context;
        if !ctx.repository.has_fork {
            return;
        }
        if ctx.event == EventKind::PullRequest {
            warn!(
                "this run was triggered by a pull request from a fork; the token may not be \
                 allowed to create check runs, consider the pull_request_target event"
            );
        }
        if self.config.auto_fix {
            warn!(
                fork = ctx.repository.fork_name.as_deref().unwrap_or_default(),
                "auto-fix commits cannot be pushed to forks without write access"
            );
        }
    }

    /// Verify every enabled linter up front and report all failures at once.
    fn prepare(&self) -> Result<Vec<PreparedLinter<'_>>> {
        let mut prepared = Vec::with_capacity(self.config.linters.len());
        let mut failures = Vec::new();
        for settings in &self.config.linters {
            match self.prepare_one(settings) {
                Ok(linter) => prepared.push(linter),
                Err(e) => {
                    error!(linter = %settings.id, error = %e, "setup failed");
                    failures.push(e.to_string());
                }
            }
        }
        if failures.is_empty() {
            Ok(prepared)
        } else {
            Err(Error::Setup(failures))
        }
    }

    fn prepare_one<'a>(&'a self, settings: &'a LinterSettings) -> Result<PreparedLinter<'a>> {
        let linter = self
            .registry
            .get(&settings.id)
            .ok_or_else(|| Error::ConfigValidation(format!("unknown linter: {}", settings.id)))?;

        let dir = lint_dir(&self.context.workspace, &settings.dir);
        if !dir.is_dir() {
            return Err(Error::ConfigValidation(format!(
                "{}: lint directory {} does not exist",
                linter.name(),
                dir.display()
            )));
        }

        let vars = TemplateVars::new(linter.name(), &settings.dir);
        let check_name = render(&self.config.check_name, &vars)?.trim().to_string();
        let commit_message = render(&self.config.commit_message, &vars)?;

        info!(linter = linter.name(), "verifying setup");
        linter.verify_setup(&self.runner, &dir, &settings.command_prefix)?;

        Ok(PreparedLinter {
            settings,
            linter,
            dir,
            check_name,
            commit_message,
        })
    }

    /// Returns the outcome and whether the linter ran in fix mode.
    fn lint_one(
        &self,
        git: &GitWorkflow<'_>,
        prepared: &PreparedLinter<'_>,
    ) -> Result<(LinterOutcome, bool)> {
        let settings = prepared.settings;
        let name = prepared.linter.name();
        // dry runs never rewrite files
        let fix = self.config.auto_fix && settings.auto_fix && !self.config.dry_run;

        info!(
            linter = name,
            dir = %prepared.dir.display(),
            fix,
            "running {name}"
        );
        let request = LintRequest {
            extensions: &settings.extensions,
            args: &settings.args,
            fix,
            prefix: &settings.command_prefix,
        };
        let output = prepared.linter.lint(&self.runner, &prepared.dir, &request)?;
        let mut result = prepared.linter.parse_output(&prepared.dir, &output)?;
        rebase_paths(&mut result, &settings.dir);

        info!(
            linter = name,
            success = result.is_success,
            "{name} found {}",
            result.summary()
        );

        if fix && self.config.commit && git.has_changes()? {
            git.commit_changes(&prepared.commit_message, self.config.git_no_verify)?;
            git.push_changes(self.config.git_no_verify)?;
        }

        let outcome = LinterOutcome {
            linter: settings.id.clone(),
            name: name.to_string(),
            check_name: prepared.check_name.clone(),
            result,
        };
        Ok((outcome, fix))
    }

    /// Submit all checks concurrently and wait for every one to settle.
    /// Returns the number of submissions that failed.
    async fn create_checks(&self, head_sha: &str, outcomes: &[LinterOutcome]) -> usize {
        let mut tasks = JoinSet::new();
        for outcome in outcomes {
            let request = build_check_request(
                &outcome.check_name,
                head_sha,
                &outcome.result,
                self.config.neutral_check_on_warning,
            );
            let client = Arc::clone(&self.checks);
            tasks.spawn_blocking(move || client.create_check(&request));
        }

        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(error = %e, "check creation failed");
                    failed += 1;
                }
                Err(e) => {
                    error!(error = %e, "check creation task aborted");
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            warn!(failed, "Some check runs could not be created.");
        }
        failed
    }
}

fn lint_dir(workspace: &Path, dir: &str) -> PathBuf {
    match dir.trim_start_matches("./").trim_end_matches('/') {
        "" | "." => workspace.to_path_buf(),
        relative => workspace.join(relative),
    }
}

/// Make finding paths relative to the workspace instead of the lint directory.
fn rebase_paths(result: &mut LintResult, dir: &str) {
    let dir = dir.trim_start_matches("./").trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        return;
    }
    for finding in result.error.iter_mut().chain(result.warning.iter_mut()) {
        if !finding.path.starts_with('/') {
            finding.path = format!("{dir}/{}", finding.path);
        }
    }
}
