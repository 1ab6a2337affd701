pub mod checks;
pub mod cli;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod git;
pub mod lint_result;
pub mod linters;
pub mod orchestrator;
pub mod process;
pub mod template;
