//! Plan validation and block-structure validation (spec §4.2).
//!
//! Both passes produce [`ConfigError`] values rather than failing fast —
//! spec §4.2 "Failure semantics" requires config errors to be collected and
//! surfaced per test case as `config_error` step results, never to abort
//! construction of the executor.

use std::collections::HashMap;
use std::path::Path;

use runbook_commons::resolve_within;
use runbook_core::block::{Block, BlockRegistry, BlockType};
use runbook_core::schema::{unwrap_fenced_yaml, InputSchema};
use runbook_core::ConfigError;

use crate::duration::parse_duration;
use crate::plan::{Assertion, ExpectedStatus, TestPlan, KNOWN_ASSERTION_TYPES};

/// Validate plan-level shape (spec §4.2 "Plan validation").
pub fn validate_plan(plan: &TestPlan) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if plan.tests.is_empty() {
        errors.push(ConfigError::global("test plan has no test cases"));
    }

    if parse_duration(&plan.settings.timeout).is_err() {
        errors.push(ConfigError::global(format!(
            "settings.timeout `{}` is not a parsable duration",
            plan.settings.timeout
        )));
    }

    for case in &plan.tests {
        let case_label = case.name.clone();
        if case.name.as_deref().is_none_or(str::is_empty) {
            errors.push(ConfigError::global("test case is missing a name"));
        }

        if let Some(steps) = &case.steps {
            for step in steps {
                if step.block.as_deref().is_none_or(str::is_empty) {
                    errors.push(ConfigError::new(
                        case_label.clone(),
                        "step is missing a block reference",
                    ));
                }
                if ExpectedStatus::parse(&step.expect).is_none() {
                    errors.push(ConfigError::new(
                        case_label.clone(),
                        format!("step has unknown expect value `{}`", step.expect),
                    ));
                }
                errors.extend(validate_assertions(&step.assertions, case_label.clone()));
            }
        }

        errors.extend(validate_assertions(&case.assertions, case_label.clone()));
    }

    errors
}

fn validate_assertions(assertions: &[Assertion], case_label: Option<String>) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    for assertion in assertions {
        match KNOWN_ASSERTION_TYPES
            .iter()
            .find(|(name, _)| *name == assertion.kind)
        {
            None => errors.push(ConfigError::new(
                case_label.clone(),
                format!("assertion has unknown type `{}`", assertion.kind),
            )),
            Some((_, required_fields)) => {
                for field in *required_fields {
                    if !assertion_field_present(assertion, field) {
                        errors.push(ConfigError::new(
                            case_label.clone(),
                            format!("`{}` assertion is missing required field `{field}`", assertion.kind),
                        ));
                    }
                }
            }
        }
    }
    errors
}

fn assertion_field_present(assertion: &Assertion, field: &str) -> bool {
    match field {
        "path" => assertion.path.as_deref().is_some_and(|s| !s.is_empty()),
        "contains" => assertion.contains.is_some(),
        "pattern" => assertion.pattern.as_deref().is_some_and(|s| !s.is_empty()),
        "value" => assertion.value.is_some(),
        "block" => assertion.block.as_deref().is_some_and(|s| !s.is_empty()),
        "output" => assertion.output.as_deref().is_some_and(|s| !s.is_empty()),
        "min_count" => assertion.min_count.is_some(),
        "command" => assertion.command.as_deref().is_some_and(|s| !s.is_empty()),
        _ => false,
    }
}

/// Load and validate every block's structure against the table in spec
/// §4.2. Returns the schemas registered under their owning block's id and
/// the config errors discovered while loading them.
pub fn validate_blocks(
    registry: &BlockRegistry,
    runbook_dir: &Path,
) -> (HashMap<String, InputSchema>, Vec<ConfigError>) {
    let mut schemas = HashMap::new();
    let mut errors = Vec::new();

    // `id` presence for Check/Command/Inputs/Template/AwsAuth/GitHubAuth/
    // GitClone is already enforced by the document parser (spec §4.1); this
    // pass only checks the structure specific to each block type.
    for block in registry.iter() {
        match block.block_type {
            BlockType::Check | BlockType::Command | BlockType::AwsAuth | BlockType::GitHubAuth => {}
            BlockType::GitClone => {}
            BlockType::Inputs => {
                load_inputs_schema(block, runbook_dir, &mut schemas, &mut errors);
            }
            BlockType::Template => {
                require_attr(block, "path", &mut errors);
                load_template_schema(block, runbook_dir, &mut schemas, &mut errors);
            }
            BlockType::TemplateInline => {
                if block.properties.get("outputPath").is_none_or(|p| p.is_empty()) {
                    errors.push(ConfigError::new(
                        block.id.clone(),
                        "TemplateInline block is missing required `outputPath` attribute",
                    ));
                }
                if block.content.trim().is_empty() {
                    errors.push(ConfigError::new(
                        block.id.clone(),
                        "TemplateInline block has an empty body",
                    ));
                }
            }
            BlockType::Admonition => {}
        }
    }

    (schemas, errors)
}

fn require_attr(block: &Block, name: &str, errors: &mut Vec<ConfigError>) {
    if block.properties.get(name).is_none_or(|v| v.is_empty()) {
        errors.push(ConfigError::new(
            block.id.clone(),
            format!("{:?} block is missing required `{name}` attribute", block.block_type),
        ));
    }
}

fn load_inputs_schema(
    block: &Block,
    runbook_dir: &Path,
    schemas: &mut HashMap<String, InputSchema>,
    errors: &mut Vec<ConfigError>,
) {
    let body = if let Some(path) = block.properties.get("path").filter(|p| !p.is_empty()) {
        match resolve_within(runbook_dir, Path::new(path)) {
            Ok(resolved) => match std::fs::read_to_string(&resolved) {
                Ok(text) => text,
                Err(err) => {
                    errors.push(ConfigError::new(
                        block.id.clone(),
                        format!("could not read schema file `{path}`: {err}"),
                    ));
                    return;
                }
            },
            Err(err) => {
                errors.push(ConfigError::new(block.id.clone(), err.to_string()));
                return;
            }
        }
    } else if !block.content.trim().is_empty() {
        unwrap_fenced_yaml(&block.content)
    } else {
        errors.push(ConfigError::new(
            block.id.clone(),
            "Inputs block has neither a `path` attribute nor a non-empty inline body",
        ));
        return;
    };

    match serde_yaml::from_str::<InputSchema>(&body) {
        Ok(schema) => {
            schemas.insert(block.id.clone(), schema);
        }
        Err(err) => errors.push(ConfigError::new(
            block.id.clone(),
            format!("input schema is not valid YAML: {err}"),
        )),
    }
}

/// Template directories carry their schema in a `schema.yaml` (or
/// `schema.yml`) file at the directory root.
fn load_template_schema(
    block: &Block,
    runbook_dir: &Path,
    schemas: &mut HashMap<String, InputSchema>,
    errors: &mut Vec<ConfigError>,
) {
    let Some(path) = block.properties.get("path").filter(|p| !p.is_empty()) else {
        return;
    };
    let template_dir = match resolve_within(runbook_dir, Path::new(path)) {
        Ok(resolved) => resolved,
        Err(err) => {
            errors.push(ConfigError::new(block.id.clone(), err.to_string()));
            return;
        }
    };
    if !template_dir.is_dir() {
        errors.push(ConfigError::new(
            block.id.clone(),
            format!("template directory `{path}` does not exist"),
        ));
        return;
    }

    let schema_file = ["schema.yaml", "schema.yml"]
        .into_iter()
        .map(|name| template_dir.join(name))
        .find(|candidate| candidate.is_file());

    let Some(schema_file) = schema_file else {
        errors.push(ConfigError::new(
            block.id.clone(),
            format!("template directory `{path}` has no schema.yaml"),
        ));
        return;
    };

    match std::fs::read_to_string(&schema_file)
        .map_err(|err| err.to_string())
        .and_then(|text| serde_yaml::from_str::<InputSchema>(&text).map_err(|err| err.to_string()))
    {
        Ok(schema) => {
            schemas.insert(block.id.clone(), schema);
        }
        Err(message) => errors.push(ConfigError::new(
            block.id.clone(),
            format!("template schema is invalid: {message}"),
        )),
    }
}
