use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

static DOLLAR_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\s*(\w+)\s*\}").expect("valid template regex"));

/// Variables available to check-name and commit-message templates.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateVars<'a> {
    pub linter: &'a str,
    pub dir: &'a str,
}

impl<'a> TemplateVars<'a> {
    /// The workspace root (`.`) renders as an empty `dir`.
    pub fn new(linter: &'a str, dir: &'a str) -> Self {
        let dir = if dir == "." { "" } else { dir };
        Self { linter, dir }
    }
}

/// Render `template`, accepting both `${linter}` and `{{ linter }}` syntax.
pub fn render(template: &str, vars: &TemplateVars<'_>) -> Result<String> {
    let normalized = DOLLAR_VAR.replace_all(template, "{{ $1 }}");
    let engine = upon::Engine::new();
    engine
        .compile(normalized.as_ref())
        .map_err(|e| Error::Template(format!("invalid template '{template}': {e}")))?
        .render(&engine, vars)
        .to_string()
        .map_err(|e| Error::Template(format!("failed to render '{template}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dollar_syntax() {
        let vars = TemplateVars::new("ESLint", ".");
        assert_eq!(
            render("Fix code style issues with ${linter}", &vars).unwrap(),
            "Fix code style issues with ESLint"
        );
    }

    #[test]
    fn test_brace_syntax_and_dir() {
        let vars = TemplateVars::new("Black", "backend");
        assert_eq!(
            render("{{ linter }} ({{dir}})", &vars).unwrap(),
            "Black (backend)"
        );
    }

    #[test]
    fn test_root_dir_renders_empty() {
        let vars = TemplateVars::new("Black", ".");
        assert_eq!(render("${linter} ${dir}", &vars).unwrap(), "Black ");
    }

    #[test]
    fn test_unknown_variable_errors() {
        let vars = TemplateVars::new("Black", ".");
        let err = render("${branch}", &vars).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_unclosed_tag_errors() {
        let vars = TemplateVars::new("Black", ".");
        assert!(render("{{ linter", &vars).is_err());
    }

    #[test]
    fn test_plain_text_passthrough() {
        let vars = TemplateVars::new("Black", ".");
        assert_eq!(render("lint", &vars).unwrap(), "lint");
    }
}
