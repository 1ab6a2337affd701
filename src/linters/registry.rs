//! Keyed table of every supported linter.
//!
//! Order matters: linters run before formatters so that a formatter's
//! auto-fix commit does not hide issues a linter would have annotated.

use super::Linter;
use super::c_family::{ClangFormat, DotnetFormat};
use super::golang::{Gofmt, Golint};
use super::javascript::{Eslint, Prettier, Stylelint, Tsc, Xo};
use super::php::PhpCodeSniffer;
use super::python::{Autopep8, Black, Flake8, Mypy, Oitnb, Pylint};
use super::ruby::{Erblint, RuboCop};
use super::rust::{Clippy, Rustfmt};
use super::swift::{SwiftFormatLockwood, SwiftFormatOfficial, SwiftLint};

/// Deprecated id kept for configurations written against older releases.
pub const SWIFTFORMAT_ALIAS: &str = "swiftformat";
/// Id the alias stands for.
pub const SWIFTFORMAT_TARGET: &str = "swift_format_lockwood";

pub struct LinterRegistry {
    entries: Vec<(&'static str, Box<dyn Linter>)>,
}

impl Default for LinterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LinterRegistry {
    pub fn new() -> Self {
        let entries: Vec<(&'static str, Box<dyn Linter>)> = vec![
            // Linters
            ("clippy", Box::new(Clippy)),
            ("erblint", Box::new(Erblint)),
            ("eslint", Box::new(Eslint)),
            ("flake8", Box::new(Flake8)),
            ("golint", Box::new(Golint)),
            ("mypy", Box::new(Mypy)),
            ("php_codesniffer", Box::new(PhpCodeSniffer)),
            ("pylint", Box::new(Pylint)),
            ("rubocop", Box::new(RuboCop)),
            ("stylelint", Box::new(Stylelint)),
            ("swiftlint", Box::new(SwiftLint)),
            ("xo", Box::new(Xo)),
            ("tsc", Box::new(Tsc)),
            // Formatters
            ("autopep8", Box::new(Autopep8)),
            ("black", Box::new(Black)),
            ("clang_format", Box::new(ClangFormat)),
            ("dotnet_format", Box::new(DotnetFormat)),
            ("gofmt", Box::new(Gofmt)),
            ("oitnb", Box::new(Oitnb)),
            ("rustfmt", Box::new(Rustfmt)),
            ("prettier", Box::new(Prettier)),
            (SWIFTFORMAT_TARGET, Box::new(SwiftFormatLockwood)),
            ("swift_format_official", Box::new(SwiftFormatOfficial)),
            (SWIFTFORMAT_ALIAS, Box::new(SwiftFormatLockwood)),
        ];
        Self { entries }
    }

    /// All linters in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &dyn Linter)> {
        self.entries.iter().map(|(id, linter)| (*id, linter.as_ref()))
    }

    pub fn get(&self, id: &str) -> Option<&dyn Linter> {
        self.entries
            .iter()
            .find(|(key, _)| *key == id)
            .map(|(_, linter)| linter.as_ref())
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Linters whose id satisfies `enabled`, in execution order.
    pub fn enabled<'a>(
        &'a self,
        enabled: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = (&'static str, &'a dyn Linter)> + 'a {
        self.iter().filter(move |(id, _)| enabled(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linters_precede_formatters() {
        let registry = LinterRegistry::new();
        let ids = registry.ids();
        let pos = |id: &str| ids.iter().position(|i| *i == id).unwrap();
        assert!(pos("eslint") < pos("prettier"));
        assert!(pos("flake8") < pos("black"));
        assert!(pos("clippy") < pos("rustfmt"));
        assert!(pos("tsc") < pos("autopep8"));
    }

    #[test]
    fn test_lookup_and_alias() {
        let registry = LinterRegistry::new();
        assert_eq!(registry.get("eslint").unwrap().name(), "ESLint");
        assert_eq!(registry.get("swiftformat").unwrap().name(), "SwiftFormat");
        assert_eq!(
            registry.get("swift_format_lockwood").unwrap().name(),
            "SwiftFormat"
        );
        assert!(registry.get("nope").is_none());
        assert!(!registry.is_known("ESLint"));
    }

    #[test]
    fn test_ids_are_unique_and_complete() {
        let registry = LinterRegistry::new();
        let ids = registry.ids();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert_eq!(ids.len(), 24);
    }

    #[test]
    fn test_every_linter_has_default_extensions() {
        for (id, linter) in LinterRegistry::new().iter() {
            assert!(
                !linter.default_extensions().is_empty(),
                "{id} has no default extensions"
            );
        }
    }

    #[test]
    fn test_enabled_keeps_registry_order() {
        let registry = LinterRegistry::new();
        let picked: Vec<_> = registry
            .enabled(|id| matches!(id, "prettier" | "eslint" | "black"))
            .map(|(id, _)| id)
            .collect();
        assert_eq!(picked, vec!["eslint", "black", "prettier"]);
    }
}
