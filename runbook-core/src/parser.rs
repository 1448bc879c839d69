//! Document parser (spec §4.1).
//!
//! Converts a UTF-8 runbook document into a [`BlockRegistry`] plus the
//! config errors discovered along the way (missing required ids, unknown
//! tags, normalized collisions). Not a markdown renderer — the executor
//! only needs tag/fence recognition, so this is a hand-written scanner
//! rather than a `pulldown-cmark`-style full parser, matching the scoped
//! "treated as a pure function" framing of spec §1.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::block::{Block, BlockRegistry, BlockType};
use crate::error::ConfigError;

static TAG_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Z][A-Za-z0-9]*)").unwrap());

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|\{`([^`]*)`\}|\{"([^"]*)"\}|\{'([^']*)'\})"#,
    )
    .unwrap()
});

static FENCE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*```").unwrap());

pub struct ParseOutput {
    pub registry: BlockRegistry,
    pub config_errors: Vec<ConfigError>,
}

/// Byte ranges covered by fenced code blocks (spec §4.1 "Fenced-code
/// exclusion"). An unmatched opening fence runs to the end of the document.
fn fenced_ranges(source: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut fences = FENCE_LINE.find_iter(source).peekable();
    while let Some(open) = fences.next() {
        let end = fences.next().map_or(source.len(), |close| {
            // include through the end of the closing fence's line
            source[close.end()..]
                .find('\n')
                .map_or(source.len(), |nl| close.end() + nl)
        });
        ranges.push((open.start(), end));
        if end == source.len() {
            break;
        }
    }
    ranges
}

fn in_fenced_range(ranges: &[(usize, usize)], pos: usize) -> bool {
    ranges.iter().any(|(start, end)| pos >= *start && pos < *end)
}

/// Parse an attribute-text fragment into its key/value map, honoring the
/// five quoting forms in the order spec §4.1 lists them (first match wins —
/// the forms don't overlap in practice since each requires a distinct
/// delimiter, so "first wins" only matters for well-formedness, not choice).
fn parse_attributes(attr_text: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for caps in ATTR.captures_iter(attr_text) {
        let name = caps.get(1).unwrap().as_str().to_string();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .or_else(|| caps.get(5))
            .or_else(|| caps.get(6))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        attrs.insert(name, value);
    }
    attrs
}

struct RawTag<'a> {
    name: &'a str,
    start: usize,
    attr_text: &'a str,
    self_closing: bool,
    /// Byte offset just past the opening tag's `>`.
    open_end: usize,
}

/// Scan for `<Name ...>` occurrences, splitting each into its name,
/// attribute text, and self-closing flag. Stops at the first unescaped `>`.
fn scan_tags(source: &str) -> Vec<RawTag<'_>> {
    let mut tags = Vec::new();
    for m in TAG_OPEN.find_iter(source) {
        let start = m.start();
        let name_end = m.end();
        let Some(rel_close) = source[name_end..].find('>') else {
            continue;
        };
        let close_at = name_end + rel_close;
        let raw_inner = &source[name_end..close_at];
        let self_closing = raw_inner.trim_end().ends_with('/');
        let attr_text = if self_closing {
            raw_inner.trim_end().trim_end_matches('/')
        } else {
            raw_inner
        };
        tags.push(RawTag {
            name: &source[start + 1..name_end],
            start,
            attr_text,
            self_closing,
            open_end: close_at + 1,
        });
    }
    tags
}

fn template_inline_id(properties: &HashMap<String, String>, counter: &mut usize) -> String {
    match properties.get("outputPath") {
        Some(path) if !path.is_empty() => {
            let basename = std::path::Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            let mut hasher = Sha256::new();
            hasher.update(path.as_bytes());
            let digest = hasher.finalize();
            let hash8 = digest.iter().take(4).map(|b| format!("{b:02x}")).collect::<String>();
            format!("template-{basename}-{hash8}")
        }
        _ => {
            let id = format!("template-inline-{counter}");
            *counter += 1;
            id
        }
    }
}

/// Parse a runbook document into its block registry (spec §4.1–§4.2
/// "Block-structure validation" feeds from the same scan: a missing
/// required `id` is recorded here, not deferred to the validator, since the
/// parser is the only stage that knows whether the attribute was present at
/// all versus present-but-empty).
pub fn parse_document(source: &str) -> ParseOutput {
    let fenced = fenced_ranges(source);
    let mut blocks = Vec::new();
    let mut config_errors = Vec::new();
    let mut inline_counter = 0usize;
    let mut admonition_counter = 0usize;

    for raw in scan_tags(source) {
        if in_fenced_range(&fenced, raw.start) {
            continue;
        }

        let Some(block_type) = BlockType::from_tag_name(raw.name) else {
            config_errors.push(ConfigError::global(format!(
                "unknown block type `{}`",
                raw.name
            )));
            continue;
        };

        let properties = parse_attributes(raw.attr_text);

        let content = if raw.self_closing {
            String::new()
        } else {
            let close_tag = format!("</{}>", raw.name);
            match source[raw.open_end..].find(close_tag.as_str()) {
                Some(rel) => source[raw.open_end..raw.open_end + rel].to_string(),
                None => String::new(),
            }
        };

        let id = match block_type {
            BlockType::TemplateInline => template_inline_id(&properties, &mut inline_counter),
            BlockType::Admonition => {
                let id = properties
                    .get("id")
                    .cloned()
                    .unwrap_or_else(|| {
                        let id = format!("admonition-{admonition_counter}");
                        admonition_counter += 1;
                        id
                    });
                id
            }
            _ => match properties.get("id") {
                Some(id) if !id.is_empty() => id.clone(),
                _ => {
                    let sentinel = format!("__missing_id_{}", raw.start);
                    config_errors.push(ConfigError::new(
                        sentinel.clone(),
                        format!("{} block is missing required `id` attribute", raw.name),
                    ));
                    sentinel
                }
            },
        };

        blocks.push(Block {
            block_type,
            id,
            properties,
            content,
            document_position: raw.start,
        });
    }

    let registry = BlockRegistry::from_sorted(blocks);
    for (a, b) in registry.normalized_collisions() {
        config_errors.push(ConfigError::global(format!(
            "normalized id collision between `{a}` and `{b}`"
        )));
    }

    ParseOutput {
        registry,
        config_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_tags_inside_fenced_code() {
        let doc = "<Command id=\"real\" command=\"echo ok\" />\n\n```\n<Command id=\"fake\" />\n```\n";
        let out = parse_document(doc);
        assert!(out.registry.get("real").is_some());
        assert!(out.registry.get("fake").is_none());
        assert_eq!(out.registry.len(), 1);
    }

    #[test]
    fn container_block_captures_body() {
        let doc = "<Check id=\"c1\">\necho hi\n</Check>\n";
        let out = parse_document(doc);
        let block = out.registry.get("c1").unwrap();
        assert_eq!(block.content.trim(), "echo hi");
    }

    #[test]
    fn missing_id_is_a_config_error() {
        let doc = "<Command command=\"echo hi\" />\n";
        let out = parse_document(doc);
        assert_eq!(out.config_errors.len(), 1);
        assert!(out.config_errors[0].message.contains("missing required"));
    }

    #[test]
    fn unknown_tag_is_a_config_error() {
        let doc = "<Mystery id=\"x\" />\n";
        let out = parse_document(doc);
        assert!(out.registry.is_empty());
        assert!(out.config_errors[0].message.contains("unknown block type"));
    }

    #[test]
    fn template_inline_id_from_output_path() {
        let doc = "<TemplateInline outputPath=\"out/service.yaml\">\nbody\n</TemplateInline>\n";
        let out = parse_document(doc);
        let block = out.registry.iter().next().unwrap();
        assert!(block.id.starts_with("template-service-"));
    }

    #[test]
    fn template_inline_falls_back_to_counter() {
        let doc = "<TemplateInline>\nbody\n</TemplateInline>\n<TemplateInline>\nbody2\n</TemplateInline>\n";
        let out = parse_document(doc);
        let ids: Vec<_> = out.registry.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids, vec!["template-inline-0", "template-inline-1"]);
    }

    #[test]
    fn attribute_quoting_forms() {
        let doc = r#"<Check id="c1" a="double" b='single' c={`backtick`} d={"brace-double"} e={'brace-single'} />"#;
        let out = parse_document(doc);
        let block = out.registry.get("c1").unwrap();
        assert_eq!(block.properties.get("a").unwrap(), "double");
        assert_eq!(block.properties.get("b").unwrap(), "single");
        assert_eq!(block.properties.get("c").unwrap(), "backtick");
        assert_eq!(block.properties.get("d").unwrap(), "brace-double");
        assert_eq!(block.properties.get("e").unwrap(), "brace-single");
    }

    #[test]
    fn normalized_collision_is_reported() {
        let doc = "<Command id=\"gen-outputs\" /><Command id=\"gen_outputs\" />";
        let out = parse_document(doc);
        assert!(
            out.config_errors
                .iter()
                .any(|e| e.message.contains("collision"))
        );
    }

    #[test]
    fn document_order_is_preserved() {
        let doc = "<Command id=\"second\" />\n<Command id=\"first-but-later\" />";
        let out = parse_document(doc);
        // parse twice, confirm stability (spec §8 "parsing the same document
        // twice produces equal registries")
        let out2 = parse_document(doc);
        let ids1: Vec<_> = out.registry.iter().map(|b| b.id.clone()).collect();
        let ids2: Vec<_> = out2.registry.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids1, ids2);
    }
}
