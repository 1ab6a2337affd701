use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// Options for a single shell invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dir: Option<PathBuf>,
    /// Return non-zero exits as data instead of failing.
    pub ignore_errors: bool,
    pub env: Vec<(String, String)>,
}

impl RunOptions {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Default::default()
        }
    }

    pub fn tolerant(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }
}

/// Output of a completed shell invocation. Stdout and stderr are trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Executes shell commands. Every tool and git invocation goes through this seam.
pub trait CommandRunner: Send + Sync {
    /// Run `command` through the shell. A non-zero exit is an error unless
    /// `options.ignore_errors` is set; failing to spawn is always an error.
    fn run(&self, command: &str, options: &RunOptions) -> Result<RunOutput>;

    /// Whether `binary` resolves on the `PATH`.
    fn command_exists(&self, binary: &str) -> bool;
}

/// Runs commands with `sh -c`.
#[derive(Debug, Default, Clone)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, options: &RunOptions) -> Result<RunOutput> {
        debug!(command, dir = ?options.dir, "running command");

        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = options.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .map_err(|e| Error::Process(format!("failed to spawn '{command}': {e}")))?;

        let status = extract_exit_status(&output.status);
        let run_output = RunOutput {
            status,
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        debug!(status, "exit code");
        if !run_output.stdout.is_empty() {
            debug!("stdout: {}", run_output.stdout);
        }
        if !run_output.stderr.is_empty() {
            debug!("stderr: {}", run_output.stderr);
        }

        if status != 0 && !options.ignore_errors {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                status,
                stderr: run_output.stderr,
            });
        }

        Ok(run_output)
    }

    fn command_exists(&self, binary: &str) -> bool {
        which::which(binary).is_ok()
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

fn extract_exit_status(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    -1
}

/// Quote a single argument for a POSIX shell.
pub fn shell_quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@,+%".contains(c))
    {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_plain() {
        assert_eq!(shell_quote("src/main.rs"), "src/main.rs");
        assert_eq!(shell_quote("--flag=value"), "--flag=value");
    }

    #[test]
    fn test_shell_quote_spaces_and_quotes() {
        assert_eq!(shell_quote("my file.c"), "'my file.c'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_shell_quote_metacharacters() {
        assert_eq!(shell_quote("a;rm -rf"), "'a;rm -rf'");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
    }

    #[test]
    fn test_run_output_success() {
        let ok = RunOutput::default();
        assert!(ok.success());
        let failed = RunOutput {
            status: 1,
            ..Default::default()
        };
        assert!(!failed.success());
    }

    #[test]
    fn test_run_options_builders() {
        let opts = RunOptions::in_dir("/tmp")
            .tolerant()
            .with_env(vec![("A".into(), "1".into())]);
        assert_eq!(opts.dir, Some(PathBuf::from("/tmp")));
        assert!(opts.ignore_errors);
        assert_eq!(opts.env.len(), 1);
    }
}
