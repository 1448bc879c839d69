//! Test-plan loading and static validation for the runbook test executor
//! (spec §4.2).

pub mod duration;
pub mod loader;
pub mod plan;
pub mod validate;

pub use duration::{parse_duration, script_assertion_timeout, CLEANUP_TIMEOUT, DEFAULT_CASE_TIMEOUT};
pub use loader::{load_test_plan, ConfigLoadError};
pub use plan::{
    Assertion, CleanupAction, ExpectedStatus, FuzzSpec, InputValue, Settings, Step, TestCase,
    TestPlan, KNOWN_ASSERTION_TYPES,
};
pub use validate::{validate_blocks, validate_plan};
