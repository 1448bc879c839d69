//! Deterministic seeding (spec §4.3: "drawn from a deterministic
//! pseudo-random generator seeded from the test-case name and variable
//! key"). A SHA-256 digest rather than a built-in `Hash` impl, so the seed
//! is stable across Rust versions and toolchains — spec §8 requires running
//! the same plan twice to reproduce identical fuzz values.

use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

pub fn seed_for(case_name: &str, key: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(case_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is >= 8 bytes"))
}

pub fn rng_for(case_name: &str, key: &str) -> StdRng {
    StdRng::seed_from_u64(seed_for(case_name, key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_seed() {
        assert_eq!(seed_for("case-a", "cfg.env"), seed_for("case-a", "cfg.env"));
    }

    #[test]
    fn different_keys_produce_different_seeds() {
        assert_ne!(seed_for("case-a", "cfg.env"), seed_for("case-a", "cfg.region"));
    }

    #[test]
    fn different_case_names_produce_different_seeds() {
        assert_ne!(seed_for("case-a", "cfg.env"), seed_for("case-b", "cfg.env"));
    }
}
