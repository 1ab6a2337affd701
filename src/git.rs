use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use tracing::{debug, info};

use crate::context::RepositoryContext;
use crate::error::{Error, Result};
use crate::process::{CommandRunner, RunOptions, shell_quote};

const FORK_REMOTE: &str = "fork";
const ORIGIN_REMOTE: &str = "origin";

/// HTTP credentials handed to git through `GIT_CONFIG_*` variables, so they
/// never appear in a remote URL, a command line or `.git/config`.
#[derive(Clone)]
pub struct GitAuth {
    token: String,
}

impl GitAuth {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.is_empty()).then_some(Self { token })
    }

    fn env(&self) -> Vec<(String, String)> {
        let basic = BASE64_STANDARD.encode(format!("x-access-token:{}", self.token));
        vec![
            ("GIT_CONFIG_COUNT".to_string(), "1".to_string()),
            ("GIT_CONFIG_KEY_0".to_string(), "http.extraheader".to_string()),
            (
                "GIT_CONFIG_VALUE_0".to_string(),
                format!("AUTHORIZATION: basic {basic}"),
            ),
        ]
    }
}

impl std::fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GitAuth(***)")
    }
}

/// Sequences every git operation of a run inside one working tree.
pub struct GitWorkflow<'a> {
    runner: &'a dyn CommandRunner,
    dir: PathBuf,
    auth: Option<GitAuth>,
}

impl<'a> GitWorkflow<'a> {
    pub fn new(runner: &'a dyn CommandRunner, dir: impl Into<PathBuf>, auth: Option<GitAuth>) -> Self {
        Self {
            runner,
            dir: dir.into(),
            auth,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn git(&self, args: &str) -> Result<String> {
        let output = self
            .runner
            .run(&format!("git {args}"), &RunOptions::in_dir(&self.dir))?;
        Ok(output.stdout)
    }

    /// Like [`Self::git`], with credentials for the remote in scope.
    fn git_authenticated(&self, args: &str) -> Result<String> {
        let mut options = RunOptions::in_dir(&self.dir);
        if let Some(ref auth) = self.auth {
            options = options.with_env(auth.env());
        }
        let output = self.runner.run(&format!("git {args}"), &options)?;
        Ok(output.stdout)
    }

    /// Set the global committer identity used for auto-fix commits.
    pub fn set_user_info(&self, name: &str, email: &str) -> Result<()> {
        info!(name, email, "setting git user information");
        self.git(&format!("config --global user.name {}", shell_quote(name)))?;
        self.git(&format!("config --global user.email {}", shell_quote(email)))?;
        Ok(())
    }

    /// Replace the detached checkout of a pull request with a local branch that
    /// tracks the pull request head, so auto-fix commits can be pushed.
    pub fn check_out_remote_branch(&self, context: &RepositoryContext) -> Result<()> {
        let repo = &context.repository;
        let remote = if repo.has_fork {
            let url = repo.fork_clone_url.as_deref().ok_or_else(|| {
                Error::Git("pull request comes from a fork without a clone URL".to_string())
            })?;
            info!(
                fork = repo.fork_name.as_deref().unwrap_or_default(),
                "adding remote for forked repository"
            );
            self.ensure_remote(FORK_REMOTE, url)?;
            FORK_REMOTE
        } else {
            self.git(&format!(
                "remote set-url {ORIGIN_REMOTE} {}",
                shell_quote(&repo.clone_url)
            ))?;
            ORIGIN_REMOTE
        };

        let branch = shell_quote(&context.branch);
        info!(branch = %context.branch, remote, "checking out remote branch");
        self.git_authenticated(&format!("fetch --no-tags --depth=1 {remote} {branch}"))?;
        self.git(&format!(
            "branch --force {branch} --track {}",
            shell_quote(&format!("{remote}/{}", context.branch))
        ))?;
        self.git(&format!("checkout {branch}"))?;
        Ok(())
    }

    fn ensure_remote(&self, name: &str, url: &str) -> Result<()> {
        let url = shell_quote(url);
        let existing = self.runner.run(
            &format!("git remote get-url {name}"),
            &RunOptions::in_dir(&self.dir).tolerant(),
        )?;
        if existing.success() {
            self.git(&format!("remote set-url {name} {url}"))?;
        } else {
            self.git(&format!("remote add {name} {url}"))?;
        }
        Ok(())
    }

    pub fn head_sha(&self) -> Result<String> {
        let sha = self.git("rev-parse HEAD")?;
        info!(sha = %sha, "HEAD commit");
        Ok(sha)
    }

    /// Whether the working tree differs from `HEAD`.
    pub fn has_changes(&self) -> Result<bool> {
        let output = self.runner.run(
            "git diff-index --name-status --exit-code HEAD --",
            &RunOptions::in_dir(&self.dir).tolerant(),
        )?;
        match output.status {
            0 => Ok(false),
            1 => {
                debug!(changes = %output.stdout, "working tree has changes");
                Ok(true)
            }
            status => Err(Error::Git(format!(
                "git diff-index exited with {status}: {}",
                output.stderr
            ))),
        }
    }

    pub fn commit_changes(&self, message: &str, skip_verification: bool) -> Result<()> {
        info!(message, "committing changes");
        let no_verify = if skip_verification { " --no-verify" } else { "" };
        self.git(&format!("commit -am {}{no_verify}", shell_quote(message)))?;
        Ok(())
    }

    pub fn push_changes(&self, skip_verification: bool) -> Result<()> {
        info!("pushing changes");
        let no_verify = if skip_verification { " --no-verify" } else { "" };
        self.git_authenticated(&format!("push{no_verify}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::context::{EventKind, Repository};
    use crate::process::RunOutput;

    /// Records commands with their environment and answers by prefix.
    #[derive(Default)]
    struct ScriptedRunner {
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
        responses: Vec<(&'static str, RunOutput)>,
    }

    impl ScriptedRunner {
        fn respond(mut self, prefix: &'static str, status: i32, stdout: &str) -> Self {
            self.responses.push((
                prefix,
                RunOutput {
                    status,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            ));
            self
        }

        fn commands(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(c, _)| c.clone())
                .collect()
        }

        fn env_of(&self, prefix: &str) -> Vec<(String, String)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(c, _)| c.starts_with(prefix))
                .map(|(_, env)| env.clone())
                .unwrap_or_default()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &str, options: &RunOptions) -> Result<RunOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), options.env.clone()));
            let output = self
                .responses
                .iter()
                .find(|(p, _)| command.starts_with(p))
                .map(|(_, o)| o.clone())
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

        fn command_exists(&self, _binary: &str) -> bool {
            true
        }
    }

    fn context(has_fork: bool) -> RepositoryContext {
        RepositoryContext {
            actor: "octocat".to_string(),
            branch: "feature".to_string(),
            event: EventKind::PullRequest,
            token: "t0k3n".to_string(),
            workspace: PathBuf::from("/ws"),
            repository: Repository {
                repo_name: "owner/app".to_string(),
                clone_url: "https://github.com/owner/app.git".to_string(),
                fork_name: has_fork.then(|| "contrib/app".to_string()),
                fork_clone_url: has_fork.then(|| "https://github.com/contrib/app.git".to_string()),
                has_fork,
            },
        }
    }

    #[test]
    fn test_check_out_same_repository() {
        let runner = ScriptedRunner::default();
        let git = GitWorkflow::new(&runner, "/ws", GitAuth::new("t0k3n"));
        git.check_out_remote_branch(&context(false)).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "git remote set-url origin https://github.com/owner/app.git",
                "git fetch --no-tags --depth=1 origin feature",
                "git branch --force feature --track origin/feature",
                "git checkout feature",
            ]
        );
    }

    #[test]
    fn test_check_out_fork_adds_remote() {
        let runner = ScriptedRunner::default().respond("git remote get-url fork", 2, "");
        let git = GitWorkflow::new(&runner, "/ws", GitAuth::new("t0k3n"));
        git.check_out_remote_branch(&context(true)).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "git remote get-url fork",
                "git remote add fork https://github.com/contrib/app.git",
                "git fetch --no-tags --depth=1 fork feature",
                "git branch --force feature --track fork/feature",
                "git checkout feature",
            ]
        );
    }

    #[test]
    fn test_existing_fork_remote_is_updated() {
        let runner = ScriptedRunner::default().respond(
            "git remote get-url fork",
            0,
            "https://old.example/app.git",
        );
        let git = GitWorkflow::new(&runner, "/ws", None);
        git.check_out_remote_branch(&context(true)).unwrap();
        assert_eq!(
            runner.commands()[1],
            "git remote set-url fork https://github.com/contrib/app.git"
        );
    }

    #[test]
    fn test_credentials_only_in_scoped_env() {
        let runner = ScriptedRunner::default();
        let git = GitWorkflow::new(&runner, "/ws", GitAuth::new("t0k3n"));
        git.check_out_remote_branch(&context(false)).unwrap();
        git.push_changes(false).unwrap();

        for command in runner.commands() {
            assert!(!command.contains("t0k3n"), "token leaked into {command}");
        }
        let fetch_env = runner.env_of("git fetch");
        let expected = format!(
            "AUTHORIZATION: basic {}",
            BASE64_STANDARD.encode("x-access-token:t0k3n")
        );
        assert!(fetch_env.contains(&("GIT_CONFIG_VALUE_0".to_string(), expected)));
        assert!(!runner.env_of("git push").is_empty());
        assert!(runner.env_of("git checkout").is_empty());
        assert!(runner.env_of("git remote").is_empty());
    }

    #[test]
    fn test_no_auth_without_token() {
        assert!(GitAuth::new("").is_none());
        assert_eq!(format!("{:?}", GitAuth::new("abc").unwrap()), "GitAuth(***)");
    }

    #[test]
    fn test_has_changes_status_mapping() {
        let clean = ScriptedRunner::default();
        assert!(!GitWorkflow::new(&clean, "/ws", None).has_changes().unwrap());

        let dirty = ScriptedRunner::default().respond("git diff-index", 1, "M\tsrc/a.js");
        assert!(GitWorkflow::new(&dirty, "/ws", None).has_changes().unwrap());

        let broken = ScriptedRunner::default().respond("git diff-index", 128, "");
        assert!(matches!(
            GitWorkflow::new(&broken, "/ws", None).has_changes(),
            Err(Error::Git(_))
        ));
    }

    #[test]
    fn test_commit_and_push_flags() {
        let runner = ScriptedRunner::default();
        let git = GitWorkflow::new(&runner, "/ws", None);
        git.commit_changes("Fix code style issues with ESLint", true)
            .unwrap();
        git.push_changes(true).unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "git commit -am 'Fix code style issues with ESLint' --no-verify",
                "git push --no-verify",
            ]
        );
    }

    #[test]
    fn test_user_info_is_global() {
        let runner = ScriptedRunner::default();
        let git = GitWorkflow::new(&runner, "/ws", None);
        git.set_user_info("Lint Pilot", "lintpilot@users.noreply.github.com")
            .unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "git config --global user.name 'Lint Pilot'",
                "git config --global user.email lintpilot@users.noreply.github.com",
            ]
        );
    }

    #[test]
    fn test_failed_git_step_propagates() {
        let runner = ScriptedRunner::default().respond("git fetch", 128, "");
        let git = GitWorkflow::new(&runner, "/ws", None);
        assert!(matches!(
            git.check_out_remote_branch(&context(false)),
            Err(Error::CommandFailed { .. })
        ));
        assert_eq!(runner.commands().len(), 2);
    }
}
