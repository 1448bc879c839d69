//! Output-reference scanning and the `RUNBOOK_OUTPUT`/environment-sidecar
//! protocols (spec §6 "Block-output protocol").

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Matches `_blocks.<blockId>.outputs.<name>` anywhere in a script or
/// template body (spec §4.4 "output reference").
static OUTPUT_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_blocks\.([A-Za-z0-9_-]+)\.outputs\.([A-Za-z0-9_-]+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRef {
    pub block_id: String,
    pub output_name: String,
}

/// Every `_blocks.<id>.outputs.<name>` reference in `body`, in order of
/// appearance (duplicates kept — callers dedupe if they care).
pub fn scan_output_refs(body: &str) -> Vec<OutputRef> {
    OUTPUT_REF
        .captures_iter(body)
        .map(|caps| OutputRef {
            block_id: caps[1].to_string(),
            output_name: caps[2].to_string(),
        })
        .collect()
}

/// References not yet satisfied by `outputs` (normalized-id lookup, per
/// spec §9 "Id normalization").
pub fn missing_output_refs(
    refs: &[OutputRef],
    outputs: &HashMap<String, HashMap<String, String>>,
) -> Vec<OutputRef> {
    refs.iter()
        .filter(|r| {
            outputs
                .get(&runbook_commons::normalize_id(&r.block_id))
                .is_none_or(|slots| !slots.contains_key(&r.output_name))
        })
        .cloned()
        .collect()
}

/// Parse a `RUNBOOK_OUTPUT` file's contents: each non-empty line of the
/// form `key=value` (first `=` splits) contributes one output; malformed
/// lines are ignored (spec §6, §8 invariant).
pub fn parse_output_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .collect()
}

/// Parse a `declare -x NAME="value"` sidecar environment dump (spec §6
/// "Environment capture"). Unrecognized lines are ignored.
pub fn parse_env_sidecar(contents: &str) -> Vec<(String, String)> {
    static DECLARE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"^declare -x ([A-Za-z_][A-Za-z0-9_]*)="(.*)"$"#).unwrap());
    contents
        .lines()
        .filter_map(|line| DECLARE.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_output_references() {
        let refs = scan_output_refs("echo {{ _blocks.gen.outputs.foo }} and {{ _blocks.gen-two.outputs.bar }}");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].block_id, "gen");
        assert_eq!(refs[1].block_id, "gen-two");
    }

    #[test]
    fn missing_refs_respects_normalization() {
        let refs = vec![OutputRef {
            block_id: "gen-outputs".to_string(),
            output_name: "foo".to_string(),
        }];
        let mut outputs = HashMap::new();
        outputs.insert(
            "gen_outputs".to_string(),
            HashMap::from([("foo".to_string(), "bar".to_string())]),
        );
        assert!(missing_output_refs(&refs, &outputs).is_empty());
    }

    #[test]
    fn parses_well_formed_and_ignores_malformed_lines() {
        let parsed = parse_output_file("foo=bar\nnotakeyvalue\nbaz=qux=extra\n\n");
        assert_eq!(parsed.get("foo").unwrap(), "bar");
        assert_eq!(parsed.get("baz").unwrap(), "qux=extra");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn parses_env_sidecar_lines() {
        let parsed = parse_env_sidecar("declare -x PATH=\"/usr/bin\"\nnot a declare line\n");
        assert_eq!(parsed, vec![("PATH".to_string(), "/usr/bin".to_string())]);
    }
}
