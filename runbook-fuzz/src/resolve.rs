//! Input resolution: turn a test case's `inputs` map into concrete values
//! and validate them against the known schemas (spec §4.3).

use std::collections::HashMap;

use runbook_config::plan::InputValue;
use runbook_core::schema::InputSchema;

use crate::generate::generate;
use crate::rng::rng_for;
use crate::validate::{validate_value, ValidationErrors};

/// Concrete values for every `<inputsId>.<variableName>` key in a test
/// case, keyed exactly as supplied (spec §3 "Test plan").
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs(pub HashMap<String, serde_yaml::Value>);

impl ResolvedInputs {
    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    /// The map passed to template rendering: every resolved input spread at
    /// the root by its variable name, with the `<inputsId>.` prefix
    /// stripped (spec §4.4 "Template-variables map").
    pub fn flattened_by_variable_name(&self) -> HashMap<String, serde_yaml::Value> {
        self.0
            .iter()
            .map(|(key, value)| {
                let var_name = key.rsplit('.').next().unwrap_or(key);
                (var_name.to_string(), value.clone())
            })
            .collect()
    }
}

/// Resolve and validate every input for a test case.
///
/// Literal values pass through unchanged. Fuzz values are generated from a
/// seed derived from `case_name` and the input key. Unknown keys (no
/// matching schema) are resolved as-is but never validated — spec §4.3:
/// "Unknown keys are silently ignored."
pub fn resolve_and_validate(
    case_name: &str,
    raw_inputs: &HashMap<String, InputValue>,
    schemas: &HashMap<String, InputSchema>,
) -> Result<ResolvedInputs, ValidationErrors> {
    let mut resolved = HashMap::new();
    let mut errors = Vec::new();

    for (key, input) in raw_inputs {
        let (inputs_id, var_name) = match key.split_once('.') {
            Some(parts) => parts,
            None => (key.as_str(), ""),
        };
        let variable = schemas.get(inputs_id).and_then(|schema| schema.variable(var_name));

        let value = match input {
            InputValue::Literal(value) => value.clone(),
            InputValue::Fuzz { fuzz } => match variable {
                Some(variable) => {
                    let mut rng = rng_for(case_name, key);
                    generate(&mut rng, variable, &fuzz.params)
                }
                None => serde_yaml::Value::Null,
            },
        };

        if let Some(variable) = variable {
            validate_value(key, variable, &value, &mut errors);
        }

        resolved.insert(key.clone(), value);
    }

    // Catch `required` variables that were never supplied at all, not just
    // supplied-but-empty (the loop above only sees keys the case provided).
    for (inputs_id, schema) in schemas {
        for variable in &schema.variables {
            if !variable.validations.required {
                continue;
            }
            let key = format!("{inputs_id}.{}", variable.name);
            if !raw_inputs.contains_key(&key) {
                errors.push(format!("{key}: required value is missing"));
            }
        }
    }

    if errors.is_empty() {
        Ok(ResolvedInputs(resolved))
    } else {
        Err(ValidationErrors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbook_config::plan::FuzzSpec;
    use runbook_core::schema::{Validations, Variable, VariableType};

    fn schema_with(var_name: &str, var_type: VariableType, validations: Validations) -> InputSchema {
        InputSchema {
            variables: vec![Variable {
                name: var_name.to_string(),
                var_type,
                description: None,
                default: None,
                options: Vec::new(),
                validations,
                fuzz: Default::default(),
            }],
        }
    }

    #[test]
    fn literal_value_passes_through() {
        let mut raw = HashMap::new();
        raw.insert(
            "cfg.env".to_string(),
            InputValue::Literal(serde_yaml::Value::String("dev".to_string())),
        );
        let mut schemas = HashMap::new();
        schemas.insert("cfg".to_string(), schema_with("env", VariableType::String, Validations::default()));

        let resolved = resolve_and_validate("case", &raw, &schemas).unwrap();
        assert_eq!(resolved.get("cfg.env").unwrap().as_str(), Some("dev"));
    }

    #[test]
    fn fuzz_value_is_generated_and_deterministic() {
        let mut raw = HashMap::new();
        raw.insert(
            "cfg.env".to_string(),
            InputValue::Fuzz { fuzz: FuzzSpec::default() },
        );
        let mut schemas = HashMap::new();
        schemas.insert("cfg".to_string(), schema_with("env", VariableType::String, Validations::default()));

        let first = resolve_and_validate("case", &raw, &schemas).unwrap();
        let second = resolve_and_validate("case", &raw, &schemas).unwrap();
        assert_eq!(first.get("cfg.env"), second.get("cfg.env"));
    }

    #[test]
    fn missing_required_input_is_an_error() {
        let raw = HashMap::new();
        let mut schemas = HashMap::new();
        schemas.insert(
            "cfg".to_string(),
            schema_with(
                "env",
                VariableType::String,
                Validations {
                    required: true,
                    ..Default::default()
                },
            ),
        );
        let err = resolve_and_validate("case", &raw, &schemas).unwrap_err();
        assert!(err.0.iter().any(|m| m.contains("cfg.env")));
    }

    #[test]
    fn unknown_key_is_silently_ignored() {
        let mut raw = HashMap::new();
        raw.insert(
            "unrelated.key".to_string(),
            InputValue::Literal(serde_yaml::Value::String("x".to_string())),
        );
        let schemas = HashMap::new();
        let resolved = resolve_and_validate("case", &raw, &schemas).unwrap();
        assert!(resolved.get("unrelated.key").is_some());
    }

    #[test]
    fn flattened_map_strips_inputs_id_prefix() {
        let mut raw = HashMap::new();
        raw.insert(
            "cfg.env".to_string(),
            InputValue::Literal(serde_yaml::Value::String("dev".to_string())),
        );
        let schemas = HashMap::new();
        let resolved = resolve_and_validate("case", &raw, &schemas).unwrap();
        let flat = resolved.flattened_by_variable_name();
        assert_eq!(flat.get("env").unwrap().as_str(), Some("dev"));
    }
}
