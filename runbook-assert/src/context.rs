//! Evaluation context: everything an assertion needs besides its own
//! fields (spec §4.5: "All path-bearing assertions resolve paths relative
//! to the case's output directory").

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use runbook_commons::normalize_id;

/// Read-only view into a running case's session, as far as assertions need
/// it (spec §3 "Execution session").
pub struct AssertionContext {
    pub output_dir: PathBuf,
    pub outputs: HashMap<String, HashMap<String, String>>,
    pub env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl AssertionContext {
    pub fn new(output_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            output_dir,
            outputs: HashMap::new(),
            env: Vec::new(),
            timeout,
        }
    }

    /// Look up a captured output by (possibly un-normalized) block id.
    pub fn output(&self, block_id: &str, name: &str) -> Option<&str> {
        self.outputs
            .get(&normalize_id(block_id))
            .and_then(|slots| slots.get(name))
            .map(String::as_str)
    }
}
