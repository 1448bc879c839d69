//! Test-plan YAML loader (spec §4.2).

use thiserror::Error;

use crate::plan::TestPlan;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("test plan is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config version {0} (expected 1)")]
    UnsupportedVersion(u32),
}

/// Parse a test-plan YAML document, applying the defaults listed in spec
/// §4.2 ("Defaults"). This is the only hard-failure point in config
/// loading: a YAML document that doesn't even parse as a mapping, or whose
/// version is newer than this executor understands, can't produce a
/// `TestPlan` to validate against at all. Everything else discovered after
/// this point is a soft config error (see [`crate::validate`]).
pub fn load_test_plan(source: &str) -> Result<TestPlan, ConfigLoadError> {
    let plan: TestPlan = serde_yaml::from_str(source)?;
    if plan.version > 1 {
        return Err(ConfigLoadError::UnsupportedVersion(plan.version));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_defaults() {
        let plan = load_test_plan("tests: []\n").unwrap();
        assert_eq!(plan.version, 1);
        assert_eq!(plan.settings.timeout, "5m");
        assert!(plan.settings.parallelizable);
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = load_test_plan("version: 2\ntests: []\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = load_test_plan("tests: [\n").unwrap_err();
        assert!(matches!(err, ConfigLoadError::Yaml(_)));
    }

    #[test]
    fn parses_a_full_case() {
        let yaml = r#"
version: 1
settings:
  timeout: 10s
tests:
  - name: smoke
    inputs:
      cfg.env: dev
    steps:
      - block: a
        expect: success
    assertions:
      - type: file_exists
        path: out.txt
"#;
        let plan = load_test_plan(yaml).unwrap();
        assert_eq!(plan.tests.len(), 1);
        assert_eq!(plan.tests[0].name.as_deref(), Some("smoke"));
        assert_eq!(plan.settings.timeout, "10s");
    }
}
