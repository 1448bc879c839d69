//! Templating boundary (spec §1: "the templating engine (treated as a pure
//! function that maps `(template-text-or-directory, variables) →
//! rendered-text-or-file-tree`)"). Out of scope as a real engine — this
//! crate only needs *a* renderer behind a trait: a narrow trait plus one
//! default implementation, so a production build can swap in the real
//! engine without touching the execution loop.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template references unknown variable `{0}`")]
    UnknownVariable(String),
    #[error("template directory `{0}` does not exist")]
    MissingTemplateDir(PathBuf),
}

/// Renders inline text or a template directory against a JSON variable
/// tree. `{{ dotted.path }}` references are resolved against `variables`,
/// including the reserved `_blocks.<id>.outputs.<name>` paths (spec §4.4).
pub trait TemplateEngine: Send + Sync {
    fn render_text(&self, body: &str, variables: &serde_json::Value) -> Result<String, RenderError>;

    /// Render every file in `template_dir` into `output_dir`, preserving
    /// relative layout. The default implementation treats every file as
    /// plain text; a production engine would also handle binary assets.
    fn render_directory(
        &self,
        template_dir: &Path,
        output_dir: &Path,
        variables: &serde_json::Value,
    ) -> Result<(), RenderError> {
        if !template_dir.is_dir() {
            return Err(RenderError::MissingTemplateDir(template_dir.to_path_buf()));
        }
        for entry in walkdir::WalkDir::new(template_dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let relative = entry.path().strip_prefix(template_dir).unwrap_or(entry.path());
            let dest = output_dir.join(relative);
            if let Some(parent) = dest.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let body = std::fs::read_to_string(entry.path()).unwrap_or_default();
            let rendered = self.render_text(&body, variables)?;
            let _ = std::fs::write(dest, rendered);
        }
        Ok(())
    }
}

static VAR_REF: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}").unwrap());

/// A minimal `{{ dotted.path }}` substitution engine, sufficient to drive
/// the executor's own output-plumbing tests without pulling in a real
/// templating dependency this crate doesn't otherwise need.
#[derive(Debug, Default, Clone, Copy)]
pub struct MiniMustache;

impl MiniMustache {
    fn lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
        path.split('.').try_fold(value, |current, segment| match current {
            serde_json::Value::Object(map) => map.get(segment),
            _ => None,
        })
    }

    fn stringify(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl TemplateEngine for MiniMustache {
    fn render_text(&self, body: &str, variables: &serde_json::Value) -> Result<String, RenderError> {
        let mut missing = None;
        let rendered = VAR_REF.replace_all(body, |caps: &regex::Captures| {
            let path = &caps[1];
            // Leave `_blocks...` references alone here; the execution
            // engine resolves and rewrites those itself before rendering
            // (spec §4.4 output-reference scan runs first).
            match Self::lookup(variables, path) {
                Some(value) => Self::stringify(value),
                None => {
                    missing.get_or_insert_with(|| path.to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(path) => Err(RenderError::UnknownVariable(path)),
            None => Ok(rendered.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_a_flat_variable() {
        let engine = MiniMustache;
        let vars = json!({"env": "dev"});
        let rendered = engine.render_text("hello {{ env }}", &vars).unwrap();
        assert_eq!(rendered, "hello dev");
    }

    #[test]
    fn substitutes_a_nested_blocks_output() {
        let engine = MiniMustache;
        let vars = json!({"_blocks": {"gen": {"outputs": {"foo": "bar"}}}});
        let rendered = engine
            .render_text("value: {{ _blocks.gen.outputs.foo }}", &vars)
            .unwrap();
        assert_eq!(rendered, "value: bar");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let engine = MiniMustache;
        let rendered = engine.render_text("{{ missing }}", &json!({}));
        assert!(rendered.is_err());
    }
}
