//! Result types (spec §3 "Test result").

use std::time::Duration;

use runbook_assert::AssertionResult;

/// Actual outcome of running (or not running) a step (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActualStatus {
    Success,
    Fail,
    Warn,
    Blocked,
    Skipped,
    ConfigError,
    Error,
}

impl ActualStatus {
    /// Exit-code classification table (spec §6 "Exit-code taxonomy").
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            2 => Self::Warn,
            _ => Self::Fail,
        }
    }

    pub fn matches_expect(self, expect: runbook_config::ExpectedStatus) -> bool {
        use runbook_config::ExpectedStatus as E;
        matches!(
            (expect, self),
            (E::Success, Self::Success)
                | (E::Fail, Self::Fail)
                | (E::Warn, Self::Warn)
                | (E::Blocked, Self::Blocked)
                | (E::Skip, Self::Skipped)
                | (E::ConfigError, Self::ConfigError)
        )
    }
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub block_id: String,
    pub expected: String,
    pub actual: ActualStatus,
    pub passed: bool,
    pub exit_code: Option<i32>,
    pub outputs: std::collections::HashMap<String, String>,
    pub log: String,
    pub duration: Duration,
    pub assertions: Vec<AssertionResult>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub status: CaseStatus,
    pub duration: Duration,
    pub error: Option<String>,
    pub steps: Vec<StepResult>,
    pub assertions: Vec<AssertionResult>,
}

impl TestResult {
    /// Newline-joined per-step and per-assertion error messages (spec §4.6
    /// "JUnit XML format" failure body).
    pub fn error_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for step in &self.steps {
            if let Some(err) = &step.error {
                lines.push(format!("{}: {err}", step.block_id));
            }
            for assertion in &step.assertions {
                if !assertion.passed {
                    lines.push(format!("{}: {}", assertion.kind, assertion.message));
                }
            }
        }
        for assertion in &self.assertions {
            if !assertion.passed {
                lines.push(format!("{}: {}", assertion.kind, assertion.message));
            }
        }
        lines
    }
}
