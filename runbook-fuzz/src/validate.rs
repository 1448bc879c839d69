//! Validation pass over resolved input values (spec §4.3 "Validation
//! pass"). Runs after generation/literal resolution so both kinds of value
//! are checked identically.

use std::fmt;

use runbook_core::schema::Variable;

/// Aggregated validation failures, one line per offending key (spec §4.3:
/// "a single `ValidationErrors` value whose rendering lists each offending
/// key with a precise reason").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("\n"))
    }
}

impl std::error::Error for ValidationErrors {}

fn numeric_value(value: &serde_yaml::Value) -> Option<f64> {
    match value {
        serde_yaml::Value::Number(n) => n.as_f64(),
        serde_yaml::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string_len(value: &serde_yaml::Value) -> Option<usize> {
    match value {
        serde_yaml::Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

fn as_display_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

fn looks_like_email(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn looks_like_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Check `value` (bound to `key` for error messages) against `variable`'s
/// validations bag, appending any failures to `errors`.
pub fn validate_value(key: &str, variable: &Variable, value: &serde_yaml::Value, errors: &mut Vec<String>) {
    let validations = &variable.validations;

    if validations.required && matches!(value, serde_yaml::Value::Null) {
        errors.push(format!("{key}: required value is missing"));
        return;
    }
    if matches!(value, serde_yaml::Value::Null) {
        return;
    }

    if let Some(min) = validations.min.get() {
        match numeric_value(value) {
            Some(n) if n < min => errors.push(format!("{key}: value {n} is below minimum {min}")),
            None => errors.push(format!("{key}: value \"{}\" is not numeric", as_display_string(value))),
            _ => {}
        }
    }
    if let Some(max) = validations.max.get() {
        if let Some(n) = numeric_value(value) {
            if n > max {
                errors.push(format!("{key}: value {n} is above maximum {max}"));
            }
        }
    }

    if let Some(min_len) = validations.min_length.get() {
        match string_len(value) {
            Some(len) if (len as f64) < min_len => {
                errors.push(format!("{key}: length {len} is below minimum length {min_len}"))
            }
            _ => {}
        }
    }
    if let Some(max_len) = validations.max_length.get() {
        if let Some(len) = string_len(value) {
            if (len as f64) > max_len {
                errors.push(format!("{key}: length {len} is above maximum length {max_len}"));
            }
        }
    }

    if let Some(pattern) = &validations.pattern {
        match regex::Regex::new(pattern) {
            Ok(re) => {
                let text = as_display_string(value);
                if !re.is_match(&text) {
                    errors.push(format!("{key}: value \"{text}\" does not match pattern `{pattern}`"));
                }
            }
            Err(err) => errors.push(format!("{key}: pattern `{pattern}` does not compile: {err}")),
        }
    }

    if validations.email {
        let text = as_display_string(value);
        if !looks_like_email(&text) {
            errors.push(format!("{key}: value \"{text}\" is not a well-formed email address"));
        }
    }

    if validations.url {
        let text = as_display_string(value);
        if !looks_like_url(&text) {
            errors.push(format!("{key}: value \"{text}\" is not a well-formed URL"));
        }
    }

    if variable.var_type == runbook_core::schema::VariableType::Enum && !variable.options.is_empty() {
        let text = as_display_string(value);
        if !variable.options.contains(&text) {
            errors.push(format!(
                "{key}: value \"{text}\" not in enum options [{}]",
                variable.options.join(" ")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runbook_core::schema::{Bound, Validations, VariableType};

    fn variable_with(validations: Validations) -> Variable {
        Variable {
            name: "v".to_string(),
            var_type: VariableType::String,
            description: None,
            default: None,
            options: Vec::new(),
            validations,
            fuzz: Default::default(),
        }
    }

    #[test]
    fn reports_missing_required_value() {
        let v = variable_with(Validations {
            required: true,
            ..Default::default()
        });
        let mut errors = Vec::new();
        validate_value("cfg.x", &v, &serde_yaml::Value::Null, &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("required"));
    }

    #[test]
    fn reports_below_minimum() {
        let v = variable_with(Validations {
            min: Bound::some(10.0),
            ..Default::default()
        });
        let mut errors = Vec::new();
        validate_value("cfg.x", &v, &serde_yaml::Value::from(3), &mut errors);
        assert!(errors[0].contains("below minimum"));
    }

    #[test]
    fn zero_minimum_is_enforced() {
        let v = variable_with(Validations {
            min: Bound::some(0.0),
            ..Default::default()
        });
        let mut errors = Vec::new();
        validate_value("cfg.x", &v, &serde_yaml::Value::from(-1), &mut errors);
        assert!(errors[0].contains("below minimum 0"));
    }

    #[test]
    fn enum_validation_matches_spec_scenario() {
        let mut v = variable_with(Validations::default());
        v.var_type = VariableType::Enum;
        v.options = vec!["dev".to_string(), "staging".to_string(), "prod".to_string()];
        let mut errors = Vec::new();
        validate_value(
            "cfg.env",
            &v,
            &serde_yaml::Value::String("dev2".to_string()),
            &mut errors,
        );
        assert_eq!(
            errors[0],
            "cfg.env: value \"dev2\" not in enum options [dev staging prod]"
        );
    }
}
