//! CLI argument parsing (spec §6 "CLI surface", SPEC_FULL §13).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ReporterFormat {
    Text,
    Junit,
}

/// `runbook-test <runbook-path>...` — the headless test executor entry
/// point.
#[derive(Parser, Debug, Clone)]
#[command(name = "runbook-test", version, about = "Headless test executor for runbook documents")]
pub struct Cli {
    /// One or more runbook documents to parse and test. Each document's test
    /// plan is discovered at the same path with its extension replaced by
    /// `.test.yaml` (falling back to `.test.yml`).
    #[arg(value_name = "RUNBOOK", required = true)]
    pub runbooks: Vec<PathBuf>,

    /// Override the plan's `settings.timeout`, e.g. `2m`, `90s`. Never
    /// lowers a plan's own timeout, only raises it.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Raise the default log level from `warn` to `debug` for the
    /// executor's own crates.
    #[arg(long)]
    pub verbose: bool,

    /// Report format.
    #[arg(long, value_enum, default_value_t = ReporterFormat::Text)]
    pub reporter: ReporterFormat,

    /// Write the report to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Parse and validate every runbook and test plan, print the resolved
    /// step sequence and any config errors, then exit without executing
    /// anything.
    #[arg(long)]
    pub list: bool,
}

/// Derive a test-plan path from a runbook document path (SPEC_FULL §13).
pub fn test_plan_path(runbook: &std::path::Path) -> PathBuf {
    let yaml = runbook.with_extension("test.yaml");
    if yaml.is_file() {
        return yaml;
    }
    runbook.with_extension("test.yml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_path_prefers_yaml_extension() {
        let dir = tempfile::tempdir().unwrap();
        let runbook = dir.path().join("deploy.md");
        std::fs::write(dir.path().join("deploy.test.yaml"), "tests: []\n").unwrap();
        assert_eq!(test_plan_path(&runbook), dir.path().join("deploy.test.yaml"));
    }

    #[test]
    fn test_plan_path_falls_back_to_yml() {
        let dir = tempfile::tempdir().unwrap();
        let runbook = dir.path().join("deploy.md");
        assert_eq!(test_plan_path(&runbook), dir.path().join("deploy.test.yml"));
    }
}
