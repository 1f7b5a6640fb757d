//! Core data model (spec §3): players, contests, slots, lineups, and
//! the request-shaped configuration that drives a single `optimize()`
//! call.

use crate::ids::{LineupId, PlayerId, TeamCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Roster position, e.g. `PG`, `QB`, `G`. Case-normalized to upper case
/// so pool data and slot catalogs compare reliably regardless of how
/// the caller spelled it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position(pub String);

impl Position {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_uppercase())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Position {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// DFS platform. Canonicalized case-insensitively per spec §3/§6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Draftkings,
    Fanduel,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Draftkings => "draftkings",
            Platform::Fanduel => "fanduel",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draftkings" | "dk" => Ok(Self::Draftkings),
            "fanduel" | "fd" => Ok(Self::Fanduel),
            other => Err(format!("unrecognized platform: {other:?}")),
        }
    }
}

/// Sport key, lower-cased for catalog lookups (e.g. `"nba"`, `"golf"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sport(pub String);

impl Sport {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_lowercase())
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sport {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Raw player record as supplied by the caller's pool (spec §3).
///
/// Optional numeric fields default to `0` and optional team/opponent
/// default to the empty string during indexing (§4.2) — this struct
/// keeps the caller-visible "missing" state explicit rather than
/// silently coercing at construction time, so `PlayerIndex` is the
/// single place that applies the zero-default rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub team: Option<TeamCode>,
    #[serde(default)]
    pub opponent: Option<TeamCode>,
    pub position: Position,
    #[serde(default)]
    pub salary_dk: Option<u32>,
    #[serde(default)]
    pub salary_fd: Option<u32>,
    #[serde(default)]
    pub projected_points: Option<f64>,
    #[serde(default)]
    pub floor_points: Option<f64>,
    #[serde(default)]
    pub ceiling_points: Option<f64>,
    #[serde(default)]
    pub ownership_dk: Option<f64>,
    #[serde(default)]
    pub ownership_fd: Option<f64>,
    #[serde(default)]
    pub is_injured: Option<bool>,
    #[serde(default)]
    pub injury_status: Option<String>,
}

impl Player {
    /// Team code, defaulting to empty per spec §3.
    pub fn team_or_empty(&self) -> TeamCode {
        self.team.clone().unwrap_or_default()
    }

    /// Opponent code, defaulting to empty per spec §3.
    pub fn opponent_or_empty(&self) -> TeamCode {
        self.opponent.clone().unwrap_or_default()
    }

    /// Unordered `team@opponent` game key, per spec §4.3.
    pub fn game_key(&self) -> Option<String> {
        let team = self.team_or_empty();
        let opp = self.opponent_or_empty();
        if team.is_empty() || opp.is_empty() {
            return None;
        }
        let (lo, hi) = if team.0 <= opp.0 {
            (team.0, opp.0)
        } else {
            (opp.0, team.0)
        };
        Some(format!("{lo}@{hi}"))
    }

    pub fn projected_or_zero(&self) -> f64 {
        self.projected_points.unwrap_or(0.0)
    }
}

/// Contest definition (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contest {
    pub platform: Platform,
    pub sport: Sport,
    pub salary_cap: u32,
    #[serde(default)]
    pub contest_type: Option<String>,
}

/// A roster slot within a contest's lineup grammar (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub allowed_positions: BTreeSet<Position>,
    pub priority: i32,
}

impl Slot {
    pub fn new(name: impl Into<String>, allowed: &[&str], priority: i32) -> Self {
        Self {
            name: name.into(),
            allowed_positions: allowed.iter().map(|p| Position::new(p)).collect(),
            priority,
        }
    }

    /// Membership test per spec §4.1.
    pub fn can_fill(&self, player: &Player) -> bool {
        self.allowed_positions.contains(&player.position)
    }

    pub fn is_flex(&self) -> bool {
        self.allowed_positions.len() > 1
    }
}

/// A stacking constraint (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackingRuleType {
    Team,
    Game,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingRule {
    #[serde(rename = "type")]
    pub rule_type: StackingRuleType,
    pub min_players: usize,
    pub max_players: usize,
    #[serde(default)]
    pub teams: Vec<TeamCode>,
}

impl StackingRule {
    /// True if this rule applies to every team/game present (empty list).
    pub fn applies_to_all(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn applies_to(&self, team: &TeamCode) -> bool {
        self.applies_to_all() || self.teams.contains(team)
    }
}

/// Objective-scoring strategy (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    MaxCeiling,
    MaxFloor,
    Balanced,
    Contrarian,
    Correlation,
    Value,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::MaxCeiling => "max_ceiling",
            Strategy::MaxFloor => "max_floor",
            Strategy::Balanced => "balanced",
            Strategy::Contrarian => "contrarian",
            Strategy::Correlation => "correlation",
            Strategy::Value => "value",
        };
        write!(f, "{s}")
    }
}

/// Portfolio-level constraints (spec §4.7), active only when
/// `use_portfolio_constraints` is set on `OptimizeConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioConstraints {
    /// Risk aversion coefficient used in the mean-variance branch.
    #[serde(default = "default_risk_aversion")]
    pub risk_aversion: f64,
    /// Maximum weight (fraction of the portfolio) any single lineup may carry.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,
    /// Use equal (risk-parity) weights instead of mean-variance weights.
    #[serde(default)]
    pub use_risk_parity: bool,
    /// Minimum acceptable single-lineup diversification (1 - HHI of team shares).
    #[serde(default)]
    pub min_diversification: f64,
    /// Optional per-team min/max allocation fractions.
    #[serde(default)]
    pub team_min: HashMap<TeamCode, f64>,
    #[serde(default)]
    pub team_max: HashMap<TeamCode, f64>,
}

fn default_risk_aversion() -> f64 {
    1.0
}

fn default_max_position_size() -> f64 {
    0.35
}

impl Default for PortfolioConstraints {
    fn default() -> Self {
        Self {
            risk_aversion: default_risk_aversion(),
            max_position_size: default_max_position_size(),
            use_risk_parity: false,
            min_diversification: 0.0,
            team_min: HashMap::new(),
            team_max: HashMap::new(),
        }
    }
}

/// Per-request optimization configuration (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeConfig {
    pub salary_cap: u32,
    pub num_lineups: usize,
    #[serde(default)]
    pub strategy: Option<Strategy>,
    #[serde(default = "default_true")]
    pub use_correlations: bool,
    #[serde(default = "default_correlation_weight")]
    pub correlation_weight: f64,
    #[serde(default)]
    pub stacking_rules: Vec<StackingRule>,
    #[serde(default)]
    pub locked_players: HashSet<PlayerId>,
    #[serde(default)]
    pub excluded_players: HashSet<PlayerId>,
    #[serde(default = "default_min_different_players")]
    pub min_different_players: usize,
    #[serde(default)]
    pub min_exposure: HashMap<PlayerId, f64>,
    #[serde(default)]
    pub max_exposure: HashMap<PlayerId, f64>,
    #[serde(default)]
    pub use_portfolio_constraints: bool,
    #[serde(default)]
    pub portfolio: PortfolioConstraints,
    #[serde(default)]
    pub ownership_strategy: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_correlation_weight() -> f64 {
    1.0
}

fn default_min_different_players() -> usize {
    1
}

impl OptimizeConfig {
    pub fn new(salary_cap: u32, num_lineups: usize) -> Self {
        Self {
            salary_cap,
            num_lineups,
            strategy: None,
            use_correlations: true,
            correlation_weight: default_correlation_weight(),
            stacking_rules: Vec::new(),
            locked_players: HashSet::new(),
            excluded_players: HashSet::new(),
            min_different_players: default_min_different_players(),
            min_exposure: HashMap::new(),
            max_exposure: HashMap::new(),
            use_portfolio_constraints: false,
            portfolio: PortfolioConstraints::default(),
            ownership_strategy: None,
        }
    }
}

/// A completed, feasible lineup (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineup {
    pub players: Vec<Player>,
    pub total_salary: u32,
    pub projected_points: f64,
    pub slot_assignment: HashMap<PlayerId, String>,
}

impl Lineup {
    pub fn player_ids(&self) -> HashSet<&PlayerId> {
        self.players.iter().map(|p| &p.id).collect()
    }

    /// Count of players per team, used by stacking validation and
    /// Herfindahl-based diversity (spec §4.5, §4.7).
    pub fn team_counts(&self) -> HashMap<TeamCode, usize> {
        let mut counts = HashMap::new();
        for p in &self.players {
            let team = p.team_or_empty();
            if !team.is_empty() {
                *counts.entry(team).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn game_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for p in &self.players {
            if let Some(key) = p.game_key() {
                *counts.entry(key).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Symmetric difference in player ids between two lineups (spec §8 property 6).
    pub fn differs_by(&self, other: &Lineup) -> usize {
        let a = self.player_ids();
        let b = other.player_ids();
        a.symmetric_difference(&b).count()
    }
}

/// A per-slot player record for the output boundary (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotPlayer {
    pub id: PlayerId,
    pub name: String,
    pub team: TeamCode,
    pub position: Position,
    pub salary: u32,
    pub projected_points: f64,
}

/// A lineup in its final, ranked, boundary-facing form (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedLineup {
    pub id: LineupId,
    pub slots: Vec<SlotPlayer>,
    pub total_salary: u32,
    pub projected_points: f64,
    pub exposure: f64,
    #[serde(default)]
    pub stack_description: Option<String>,
}

/// Per-call metadata attached to the optimizer result (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub execution_time_ms: u64,
    pub algorithm: String,
    pub performance_mode: String,
    pub valid_combinations: usize,
    #[serde(default)]
    pub partial: bool,
}

/// Full result of an `optimize()` call (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResult {
    pub lineups: Vec<RankedLineup>,
    pub optimization_time_ms: u64,
    pub valid_combinations: usize,
    pub metadata: RunMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, pos: &str, team: &str, opp: &str) -> Player {
        Player {
            id: PlayerId::from(id),
            name: id.to_string(),
            team: Some(TeamCode::from(team)),
            opponent: Some(TeamCode::from(opp)),
            position: Position::new(pos),
            salary_dk: Some(5000),
            salary_fd: Some(5000),
            projected_points: Some(20.0),
            floor_points: None,
            ceiling_points: None,
            ownership_dk: None,
            ownership_fd: None,
            is_injured: None,
            injury_status: None,
        }
    }

    #[test]
    fn game_key_is_order_independent() {
        let a = player("a", "QB", "BOS", "NYJ");
        let b = player("b", "WR", "NYJ", "BOS");
        assert_eq!(a.game_key(), b.game_key());
        assert_eq!(a.game_key().unwrap(), "BOS@NYJ");
    }

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!(
            "DraftKings".parse::<Platform>().unwrap(),
            Platform::Draftkings
        );
        assert_eq!("fd".parse::<Platform>().unwrap(), Platform::Fanduel);
        assert!("unknown".parse::<Platform>().is_err());
    }

    #[test]
    fn slot_can_fill_respects_allowed_positions() {
        let slot = Slot::new("UTIL", &["PG", "SG", "SF", "PF", "C"], 10);
        assert!(slot.can_fill(&player("x", "pg", "BOS", "NYJ")));
        assert!(!slot.can_fill(&player("x", "K", "BOS", "NYJ")));
    }

    #[test]
    fn lineup_differs_by_counts_symmetric_difference() {
        let p1 = player("1", "QB", "A", "B");
        let p2 = player("2", "WR", "A", "B");
        let p3 = player("3", "WR", "A", "B");
        let lineup_a = Lineup {
            players: vec![p1.clone(), p2.clone()],
            total_salary: 10000,
            projected_points: 40.0,
            slot_assignment: HashMap::new(),
        };
        let lineup_b = Lineup {
            players: vec![p1, p3],
            total_salary: 10000,
            projected_points: 40.0,
            slot_assignment: HashMap::new(),
        };
        assert_eq!(lineup_a.differs_by(&lineup_b), 2);
    }
}
