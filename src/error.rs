use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process error: {0}")]
    Process(String),

    #[error("command `{command}` failed with exit code {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("{linter}: {dependency} is not installed")]
    MissingDependency { linter: String, dependency: String },

    #[error("setup failed for {} linter(s):\n{}", .0.len(), .0.join("\n"))]
    Setup(Vec<String>),

    #[error("{linter} error: file extensions are not configurable (expected: {expected})")]
    UnsupportedExtensions { linter: String, expected: String },

    #[error("error parsing {linter} output: {message}. Output: \"{output}\"")]
    Parse {
        linter: String,
        message: String,
        output: String,
    },

    #[error("{linter} error: {message}")]
    FatalLint { linter: String, message: String },

    #[error("lintpilot does not support \"{0}\" events")]
    UnsupportedEvent(String),

    #[error("context error: {0}")]
    Context(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("check error: {0}")]
    Check(String),

    #[error("template error: {0}")]
    Template(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_converts() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().starts_with("json error:"));
    }

    #[test]
    fn test_setup_error_lists_every_failure() {
        let err = Error::Setup(vec![
            "ESLint: NPM is not installed".to_string(),
            "gofmt: gofmt is not installed".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "setup failed for 2 linter(s):\nESLint: NPM is not installed\ngofmt: gofmt is not installed"
        );
    }
}
