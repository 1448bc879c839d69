//! Execution session (spec §3 "Execution session", §9 "Output map
//! mutability"). Owned exclusively by one test case; passed by mutable
//! reference through the step loop rather than shared, since spec §5
//! guarantees no concurrent writers within a case.

use std::collections::HashMap;
use std::path::PathBuf;

use runbook_commons::normalize_id;

#[derive(Debug, Clone)]
pub struct Session {
    /// Current environment vector, replaced wholesale by each successful
    /// step's sidecar capture (spec §5 "Shared resources").
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
    /// `block_id (normalized) -> (output_name -> value)`.
    pub outputs: HashMap<String, HashMap<String, String>>,
}

impl Session {
    pub fn new(working_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            env: std::env::vars().collect(),
            working_dir,
            output_dir,
            outputs: HashMap::new(),
        }
    }

    pub fn record_outputs(&mut self, block_id: &str, values: HashMap<String, String>) {
        self.outputs.entry(normalize_id(block_id)).or_default().extend(values);
    }

    pub fn replace_env(&mut self, env: Vec<(String, String)>) {
        self.env = env;
    }

    pub fn output(&self, block_id: &str, name: &str) -> Option<&str> {
        self.outputs
            .get(&normalize_id(block_id))
            .and_then(|slots| slots.get(name))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_outputs_under_normalized_block_id() {
        let mut session = Session::new(PathBuf::from("/tmp"), PathBuf::from("/tmp/out"));
        session.record_outputs("gen-outputs", HashMap::from([("foo".to_string(), "bar".to_string())]));
        assert_eq!(session.output("gen_outputs", "foo"), Some("bar"));
    }
}
