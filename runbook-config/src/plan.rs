//! Test-plan data model (spec §3 "Test plan", §6 "Test-plan YAML").
//!
//! Fields that the plan validator (not serde) is responsible for rejecting —
//! `expect`, `timeout` — are kept as raw strings here. Spec §4.2 requires an
//! unparsable duration or an out-of-enum `expect` to become a *config error*,
//! not a hard parse failure, so deserialization must always succeed and
//! validation happens as a separate pass (see `crate::validate`).

use std::collections::HashMap;

use serde::Deserialize;

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> String {
    "5m".to_string()
}

fn default_expect() -> String {
    "success".to_string()
}

/// Global settings (spec §6: `use_temp_output`, `working_dir`, `timeout`,
/// `parallelizable`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timeout")]
    pub timeout: String,
    #[serde(default = "default_true")]
    pub parallelizable: bool,
    #[serde(default)]
    pub use_temp_output: bool,
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            parallelizable: true,
            use_temp_output: false,
            working_dir: None,
        }
    }
}

/// One `<inputsId>.<variableName>` value: either passed through literally or
/// generated by the fuzz engine (spec §4.3).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Fuzz { fuzz: FuzzSpec },
    Literal(serde_yaml::Value),
}

/// Loose bag of fuzz-generation knobs. The shape varies by the target
/// variable's declared `type` (spec §4.3), so this stays a map rather than a
/// fixed struct; `runbook-fuzz` interprets it against the schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FuzzSpec {
    #[serde(flatten)]
    pub params: HashMap<String, serde_yaml::Value>,
}

/// A single assertion (spec §4.5). Kept as one flat struct with optional
/// fields rather than a tagged enum per variant: an assertion with a bad
/// `type` or missing fields must become a *config error*, not a
/// deserialization failure, so the validator inspects `kind` at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct Assertion {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub min_count: Option<usize>,
    #[serde(default)]
    pub command: Option<String>,
}

/// A step referencing a block by id plus its expected outcome (spec §3
/// "Step").
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub block: Option<String>,
    #[serde(default = "default_expect")]
    pub expect: String,
    #[serde(default)]
    pub missing_outputs: Vec<String>,
    #[serde(default)]
    pub error_contains: Option<String>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

/// An inline command or path-to-script cleanup action (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupAction {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// One test case (spec §3 "Test plan").
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: HashMap<String, InputValue>,
    #[serde(default)]
    pub steps: Option<Vec<Step>>,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    #[serde(default)]
    pub cleanup: Vec<CleanupAction>,
}

/// Top-level test-plan document (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct TestPlan {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// The enum `expect` is restricted to (spec §3 "Step").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStatus {
    Success,
    Fail,
    Warn,
    Blocked,
    Skip,
    ConfigError,
}

impl ExpectedStatus {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "success" => Some(Self::Success),
            "fail" => Some(Self::Fail),
            "warn" => Some(Self::Warn),
            "blocked" => Some(Self::Blocked),
            "skip" => Some(Self::Skip),
            "config_error" => Some(Self::ConfigError),
            _ => None,
        }
    }
}

/// The nine assertion types the evaluator recognizes (spec §4.5), with the
/// fields each requires.
pub const KNOWN_ASSERTION_TYPES: &[(&str, &[&str])] = &[
    ("file_exists", &["path"]),
    ("file_not_exists", &["path"]),
    ("dir_exists", &["path"]),
    ("dir_not_exists", &["path"]),
    ("file_contains", &["path", "contains"]),
    ("file_not_contains", &["path", "contains"]),
    ("file_matches", &["path", "pattern"]),
    ("file_equals", &["path", "value"]),
    ("output_equals", &["block", "output", "value"]),
    ("output_matches", &["block", "output", "pattern"]),
    ("output_exists", &["block", "output"]),
    ("files_generated", &["min_count"]),
    ("script", &["command"]),
];
