//! Input schema data model (spec §3 "Input schema").

use std::collections::HashMap;

use serde::Deserialize;

/// One schema-declared variable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Int,
    Float,
    Bool,
    Enum,
    Email,
    Url,
    Uuid,
    Date,
    Timestamp,
    Words,
    List,
    Map,
}

/// Presence-tracked numeric/length bound. Spec §9's open question: the
/// source corpus short-circuits bound checks when a bound equals zero,
/// dropping legitimate zero bounds. We track "was this bound set at all"
/// explicitly instead of using zero as a sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bound(Option<f64>);

impl Bound {
    pub fn some(value: f64) -> Self {
        Self(Some(value))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn get(self) -> Option<f64> {
        self.0
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value: Option<f64> = Option::deserialize(deserializer)?;
        Ok(Self(value))
    }
}

/// Validation predicates attached to a variable (spec §3 "validations bag").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Validations {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub url: bool,
    #[serde(default)]
    pub min: Bound,
    #[serde(default)]
    pub max: Bound,
    #[serde(default, rename = "minLength")]
    pub min_length: Bound,
    #[serde(default, rename = "maxLength")]
    pub max_length: Bound,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// One named variable in an input schema.
#[derive(Debug, Clone, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub validations: Validations,
    /// Fuzz-generation knobs (length, min/max count, word count, etc). Kept
    /// as a loose map since the shape varies per `var_type` (spec §4.3).
    #[serde(flatten)]
    pub fuzz: HashMap<String, serde_yaml::Value>,
}

/// A full input schema: the set of variables declared by an `Inputs` or
/// `Template` block (spec §3).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputSchema {
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl InputSchema {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Unwrap an inline schema body from an optional fenced YAML region, per
/// spec §4.2 "the body is unwrapped from an optional fenced YAML region".
pub fn unwrap_fenced_yaml(body: &str) -> String {
    let trimmed = body.trim();
    if let Some(rest) = trimmed.strip_prefix("```yaml") {
        rest.trim_start()
            .strip_suffix("```")
            .unwrap_or(rest)
            .to_string()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.trim_start()
            .strip_suffix("```")
            .unwrap_or(rest)
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_fenced_yaml_block() {
        let body = "```yaml\nvariables:\n  - name: env\n    type: string\n```";
        let unwrapped = unwrap_fenced_yaml(body);
        assert!(unwrapped.starts_with("variables:"));
    }

    #[test]
    fn passes_through_plain_yaml() {
        let body = "variables:\n  - name: env\n    type: string\n";
        assert_eq!(unwrap_fenced_yaml(body), body.trim());
    }

    #[test]
    fn zero_bound_is_distinguishable_from_absent() {
        let present = Bound::some(0.0);
        let absent = Bound::none();
        assert_eq!(present.get(), Some(0.0));
        assert_eq!(absent.get(), None);
    }

    #[test]
    fn parses_enum_variable() {
        let yaml = "variables:\n  - name: env\n    type: enum\n    options: [dev, staging, prod]\n";
        let schema: InputSchema = serde_yaml::from_str(yaml).unwrap();
        let var = schema.variable("env").unwrap();
        assert_eq!(var.options, vec!["dev", "staging", "prod"]);
    }
}
