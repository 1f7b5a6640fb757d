//! Small deterministic helpers shared across the core and CLI.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Derive the 8 hex-digit suffix used by `LineupId::synthesize` from a
/// lineup's own composition, so the same feasible lineup always gets
/// the same id across repeated runs (spec §9's determinism
/// requirement) instead of a random one. Not a source of randomness
/// the optimizer depends on for correctness — purely cosmetic id
/// stability.
pub fn stable_suffix(seed: &str) -> String {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_suffix_is_deterministic_for_the_same_seed() {
        assert_eq!(stable_suffix("a,b,c"), stable_suffix("a,b,c"));
    }

    #[test]
    fn stable_suffix_differs_for_different_seeds() {
        assert_ne!(stable_suffix("a,b,c"), stable_suffix("a,b,d"));
    }

    #[test]
    fn stable_suffix_is_eight_hex_digits() {
        let suffix = stable_suffix("anything");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
