//! Builds the template-variables map passed to every render call (spec
//! §4.4 "Template-variables map").

use std::collections::HashMap;

use runbook_fuzz::ResolvedInputs;

use crate::session::Session;

fn yaml_to_json(value: &serde_yaml::Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Resolved inputs spread at the root by variable name, plus the reserved
/// `_blocks` map keyed by *normalized* block id (spec §4.4).
pub fn build_template_variables(resolved: &ResolvedInputs, session: &Session) -> serde_json::Value {
    let mut root = serde_json::Map::new();
    for (var_name, value) in resolved.flattened_by_variable_name() {
        root.insert(var_name, yaml_to_json(&value));
    }

    let mut blocks = serde_json::Map::new();
    for (block_id, slots) in &session.outputs {
        let mut outputs = serde_json::Map::new();
        for (name, value) in slots {
            outputs.insert(name.clone(), serde_json::Value::String(value.clone()));
        }
        let mut entry = serde_json::Map::new();
        entry.insert("outputs".to_string(), serde_json::Value::Object(outputs));
        blocks.insert(block_id.clone(), serde_json::Value::Object(entry));
    }
    root.insert("_blocks".to_string(), serde_json::Value::Object(blocks));

    serde_json::Value::Object(root)
}

/// Environment vector as a lookup-friendly map, for callers (e.g. `script`
/// assertions) that want an env snapshot rather than the vector.
pub fn env_map(session: &Session) -> HashMap<String, String> {
    session.env.iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn blocks_map_uses_normalized_ids() {
        let mut session = Session::new(PathBuf::from("/tmp"), PathBuf::from("/tmp/out"));
        session.record_outputs("gen-outputs", HashMap::from([("foo".to_string(), "bar".to_string())]));
        let resolved = ResolvedInputs::default();
        let vars = build_template_variables(&resolved, &session);
        let value = vars
            .get("_blocks")
            .and_then(|b| b.get("gen_outputs"))
            .and_then(|b| b.get("outputs"))
            .and_then(|o| o.get("foo"))
            .and_then(|v| v.as_str());
        assert_eq!(value, Some("bar"));
    }
}
