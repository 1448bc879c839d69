//! Block data model (spec §3 "Block (parsed component)").

use std::collections::HashMap;

use runbook_commons::normalize_id;

/// The closed set of tags the document parser recognizes. Blocks are a
/// closed tagged variant; dispatch everywhere is by this enum, never by
/// open inheritance (spec §9 "Block polymorphism").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Check,
    Command,
    Template,
    TemplateInline,
    Inputs,
    AwsAuth,
    GitHubAuth,
    GitClone,
    Admonition,
}

impl BlockType {
    /// Map a tag name (`<Name ...>`) to a known block type, or `None` for an
    /// unrecognized PascalCase tag (spec §4.1 "Unknown tags").
    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "Check" => Some(Self::Check),
            "Command" => Some(Self::Command),
            "Template" => Some(Self::Template),
            "TemplateInline" => Some(Self::TemplateInline),
            "Inputs" => Some(Self::Inputs),
            "AwsAuth" => Some(Self::AwsAuth),
            "GitHubAuth" => Some(Self::GitHubAuth),
            "GitClone" => Some(Self::GitClone),
            "Admonition" => Some(Self::Admonition),
            _ => None,
        }
    }

    /// True for the four block types the Execution Engine can dispatch
    /// (spec §4.4 "Step selection").
    pub fn is_executable(self) -> bool {
        matches!(
            self,
            Self::Check | Self::Command | Self::Template | Self::TemplateInline
        )
    }

    pub fn requires_explicit_id(self) -> bool {
        matches!(
            self,
            Self::Check
                | Self::Command
                | Self::Template
                | Self::Inputs
                | Self::AwsAuth
                | Self::GitHubAuth
                | Self::GitClone
        )
    }
}

/// A parsed block (spec §3).
#[derive(Debug, Clone)]
pub struct Block {
    pub block_type: BlockType,
    pub id: String,
    pub properties: HashMap<String, String>,
    pub content: String,
    pub document_position: usize,
}

impl Block {
    pub fn normalized_id(&self) -> String {
        normalize_id(&self.id)
    }
}

/// Ordered sequence of blocks plus the id lookups described in spec §3.
///
/// Invariant: normalized ids are unique. Violations are reported as config
/// errors by the parser, never enforced by panicking here — the registry
/// itself stores whatever it was given and lets callers observe the
/// collision through `normalized_collisions()`.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: Vec<Block>,
    by_id: HashMap<String, usize>,
}

impl BlockRegistry {
    pub fn from_sorted(mut blocks: Vec<Block>) -> Self {
        blocks.sort_by_key(|b| b.document_position);
        let mut by_id = HashMap::new();
        for (idx, block) in blocks.iter().enumerate() {
            by_id.insert(block.normalized_id(), idx);
        }
        Self { blocks, by_id }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up a block by id (normalized at the lookup site, per spec §9:
    /// "never compare ids raw").
    pub fn get(&self, id: &str) -> Option<&Block> {
        self.by_id
            .get(&normalize_id(id))
            .and_then(|idx| self.blocks.get(*idx))
    }

    pub fn block_type(&self, id: &str) -> Option<BlockType> {
        self.get(id).map(|b| b.block_type)
    }

    pub fn executable_blocks_in_order(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.block_type.is_executable())
    }

    /// Distinct pairs of raw ids that collide once normalized (spec §8
    /// invariant: "For every registered block, `normalize(id)` is unique
    /// across the registry").
    pub fn normalized_collisions(&self) -> Vec<(String, String)> {
        let mut seen: HashMap<String, String> = HashMap::new();
        let mut collisions = Vec::new();
        for block in &self.blocks {
            let key = block.normalized_id();
            if let Some(existing) = seen.get(&key) {
                if existing != &block.id {
                    collisions.push((existing.clone(), block.id.clone()));
                }
            } else {
                seen.insert(key, block.id.clone());
            }
        }
        collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(block_type: BlockType, id: &str, pos: usize) -> Block {
        Block {
            block_type,
            id: id.to_string(),
            properties: HashMap::new(),
            content: String::new(),
            document_position: pos,
        }
    }

    #[test]
    fn sorts_by_document_position() {
        let registry = BlockRegistry::from_sorted(vec![
            block(BlockType::Check, "b", 50),
            block(BlockType::Check, "a", 10),
        ]);
        let ids: Vec<_> = registry.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn lookup_normalizes_hyphens() {
        let registry = BlockRegistry::from_sorted(vec![block(BlockType::Command, "gen-outputs", 0)]);
        assert!(registry.get("gen_outputs").is_some());
        assert!(registry.get("gen-outputs").is_some());
    }

    #[test]
    fn detects_normalized_collision() {
        let registry = BlockRegistry::from_sorted(vec![
            block(BlockType::Command, "gen-outputs", 0),
            block(BlockType::Command, "gen_outputs", 1),
        ]);
        assert_eq!(registry.normalized_collisions().len(), 1);
    }

    #[test]
    fn executable_blocks_exclude_inputs() {
        let registry = BlockRegistry::from_sorted(vec![
            block(BlockType::Inputs, "cfg", 0),
            block(BlockType::Check, "real", 1),
        ]);
        let ids: Vec<_> = registry
            .executable_blocks_in_order()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["real"]);
    }
}
