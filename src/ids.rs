//! Opaque, type-safe identifiers used throughout the optimizer core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque player identifier, as supplied by the caller's player pool.
///
/// Wrapping the raw string keeps "player id" distinct from other
/// stringly-typed fields (team codes, slot names) at the type level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Synthesized identifier for a lineup in a portfolio, of the stable
/// form `lineup_{k}_{random8}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineupId(pub String);

impl LineupId {
    /// Build the stable `lineup_{k}_{random8}` form from a rank index
    /// and an 8-character suffix (hex digits of an id-derived hash, not
    /// a source of randomness the optimizer depends on for correctness —
    /// see `crate::util::stable_suffix`).
    pub fn synthesize(rank: usize, suffix: &str) -> Self {
        Self(format!("lineup_{rank}_{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Team code, e.g. `"BOS"`. Distinct from `PlayerId` for clarity at
/// call sites and to make the empty-string default explicit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TeamCode(pub String);

impl TeamCode {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TeamCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TeamCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lineup_id_synthesizes_stable_form() {
        let id = LineupId::synthesize(3, "a1b2c3d4");
        assert_eq!(id.as_str(), "lineup_3_a1b2c3d4");
    }

    #[test]
    fn team_code_default_is_empty() {
        assert!(TeamCode::default().is_empty());
    }
}
