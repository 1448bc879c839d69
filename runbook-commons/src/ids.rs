//! Block-id normalization.
//!
//! The downstream templating engine treats `-` as a binary operator in
//! dotted access, so every site that compares or looks up a block id must
//! fold hyphens to underscores first. Model it as a single helper and never
//! compare ids raw (spec §9 "Id normalization").

/// Normalize a block id for lookup/comparison: `-` folds to `_`.
///
/// ```
/// use runbook_commons::normalize_id;
/// assert_eq!(normalize_id("my-block"), "my_block");
/// assert_eq!(normalize_id("my_block"), "my_block");
/// ```
pub fn normalize_id(id: &str) -> String {
    id.replace('-', "_")
}

/// True iff `a` and `b` normalize to the same id but are not identical —
/// i.e. a normalized collision per spec §4.1.
pub fn is_normalized_collision(a: &str, b: &str) -> bool {
    a != b && normalize_id(a) == normalize_id(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_hyphens() {
        assert_eq!(normalize_id("gen-outputs"), "gen_outputs");
    }

    #[test]
    fn leaves_underscores_alone() {
        assert_eq!(normalize_id("already_snake"), "already_snake");
    }

    #[test]
    fn detects_collision() {
        assert!(is_normalized_collision("my-block", "my_block"));
        assert!(!is_normalized_collision("my-block", "my-block"));
        assert!(!is_normalized_collision("block-a", "block-b"));
    }
}
