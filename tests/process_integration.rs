use lintpilot::error::Error;
use lintpilot::process::{CommandRunner, RunOptions, ShellRunner};

#[test]
fn test_stdout_and_stderr_are_captured_and_trimmed() {
    let output = ShellRunner::new()
        .run("echo line1; echo line2; echo err >&2", &RunOptions::default())
        .unwrap();
    assert!(output.success());
    assert_eq!(output.stdout, "line1\nline2");
    assert_eq!(output.stderr, "err");
}

#[test]
fn test_nonzero_exit_is_an_error_by_default() {
    let err = ShellRunner::new()
        .run("echo boom >&2; exit 3", &RunOptions::default())
        .unwrap_err();
    match err {
        Error::CommandFailed {
            command,
            status,
            stderr,
        } => {
            assert_eq!(command, "echo boom >&2; exit 3");
            assert_eq!(status, 3);
            assert_eq!(stderr, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_tolerant_run_returns_exit_status_as_data() {
    let output = ShellRunner::new()
        .run("echo found; exit 1", &RunOptions::default().tolerant())
        .unwrap();
    assert_eq!(output.status, 1);
    assert_eq!(output.stdout, "found");
}

#[test]
fn test_runs_in_directory_with_scoped_env() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "").unwrap();
    let options = RunOptions::in_dir(dir.path())
        .with_env(vec![("LINTPILOT_TEST_VALUE".to_string(), "42".to_string())]);
    let output = ShellRunner::new()
        .run("ls; echo \"$LINTPILOT_TEST_VALUE\"", &options)
        .unwrap();
    assert_eq!(output.stdout, "marker.txt\n42");

    let unset = ShellRunner::new()
        .run("echo \"[$LINTPILOT_TEST_VALUE]\"", &RunOptions::default())
        .unwrap();
    assert_eq!(unset.stdout, "[]");
}

#[test]
#[cfg(unix)]
fn test_signal_termination_maps_to_128_plus_signal() {
    let output = ShellRunner::new()
        .run("kill -9 $$", &RunOptions::default().tolerant())
        .unwrap();
    assert_eq!(output.status, 128 + 9);
}

#[test]
fn test_command_exists() {
    let runner = ShellRunner::new();
    assert!(runner.command_exists("sh"));
    assert!(!runner.command_exists("lintpilot-definitely-missing-tool"));
}
