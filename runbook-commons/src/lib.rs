//! Shared helpers reused across the runbook executor crates: block-id
//! normalization, workspace-scoped path resolution, and the text reporter's
//! ANSI styling. Kept deliberately small — this is the executor's
//! equivalent of a `*-commons` crate, not a general utility grab-bag.

pub mod ids;
pub mod paths;
pub mod styling;

pub use ids::normalize_id;
pub use paths::{resolve_within, PathEscapeError};
