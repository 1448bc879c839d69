//! Deterministic fuzz generation and input validation (spec §4.3).

pub mod generate;
pub mod resolve;
pub mod rng;
pub mod validate;

pub use generate::generate;
pub use resolve::{resolve_and_validate, ResolvedInputs};
pub use rng::{rng_for, seed_for};
pub use validate::ValidationErrors;
