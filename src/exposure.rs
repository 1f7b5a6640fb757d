//! C6 — Exposure Manager (spec §4.6).
//!
//! Tracks how often each player, team, and game appears across the
//! lineups accepted so far into a portfolio, and vetoes additions that
//! would push any of those past their cap. This is local, per-request
//! state — a fresh manager is built for every `optimize()` call (spec
//! §5), never shared across requests.

use crate::ids::{PlayerId, TeamCode};
use crate::model::{Lineup, OptimizeConfig};
use std::collections::HashMap;

const DEFAULT_PLAYER_CAP: f64 = 0.30;
const DEFAULT_TEAM_CAP: f64 = 0.40;
const DEFAULT_GAME_CAP: f64 = 0.35;

/// Per-entity exposure caps, resolved once from `OptimizeConfig` and
/// reused across every `can_add` check.
#[derive(Debug, Clone)]
struct Caps {
    player_max: HashMap<PlayerId, f64>,
    player_min: HashMap<PlayerId, f64>,
    default_player: f64,
    default_team: f64,
    default_game: f64,
}

pub struct ExposureManager {
    target_lineups: usize,
    caps: Caps,
    accepted: usize,
    player_counts: HashMap<PlayerId, usize>,
    team_counts: HashMap<TeamCode, usize>,
    game_counts: HashMap<String, usize>,
    /// `diversity_matrix[lineup_idx] -> [id...]` per spec §4.6 — the
    /// player ids of each accepted lineup, in acceptance order, used
    /// only to compute `ExposureReport::diversity_score`.
    diversity_matrix: Vec<Vec<PlayerId>>,
}

/// Exposure fraction for one player/team/game, reported after a run
/// completes (spec §4.6, surfaced via `RankedLineup::exposure`).
#[derive(Debug, Clone)]
pub struct ExposureReport {
    pub player_exposure: HashMap<PlayerId, f64>,
    pub team_exposure: HashMap<TeamCode, f64>,
    pub game_exposure: HashMap<String, f64>,
    /// Average number of differing players between all pairs of
    /// accepted lineups, divided by slot count (spec §4.6): `1.0` for a
    /// fully disjoint portfolio, `0.0` for identical lineups.
    pub diversity_score: f64,
    /// Human-readable descriptions of any cap that ended up exceeded.
    /// Normally empty, since `can_add` rejects a lineup before it would
    /// push a count over its cap — populated only when a forced
    /// inclusion (e.g. a locked player present in every lineup) leaves
    /// no way to honor every cap simultaneously.
    pub violations: Vec<String>,
}

impl ExposureManager {
    pub fn new(target_lineups: usize, config: &OptimizeConfig) -> Self {
        Self {
            target_lineups: target_lineups.max(1),
            caps: Caps {
                player_max: config.max_exposure.clone(),
                player_min: config.min_exposure.clone(),
                default_player: DEFAULT_PLAYER_CAP,
                default_team: DEFAULT_TEAM_CAP,
                default_game: DEFAULT_GAME_CAP,
            },
            accepted: 0,
            player_counts: HashMap::new(),
            team_counts: HashMap::new(),
            game_counts: HashMap::new(),
            diversity_matrix: Vec::new(),
        }
    }

    /// True if accepting `lineup` would keep every player/team/game at
    /// or below its exposure cap, expressed as a fraction of
    /// `target_lineups` (spec §4.6).
    pub fn can_add(&self, lineup: &Lineup) -> bool {
        for player in &lineup.players {
            let cap = self
                .caps
                .player_max
                .get(&player.id)
                .copied()
                .unwrap_or(self.caps.default_player);
            let next = self.player_counts.get(&player.id).copied().unwrap_or(0) + 1;
            if fraction(next, self.target_lineups) > cap + f64::EPSILON {
                return false;
            }
        }

        for (team, count) in lineup.team_counts() {
            let next = self.team_counts.get(&team).copied().unwrap_or(0) + count;
            if fraction(next, self.target_lineups) > self.caps.default_team + f64::EPSILON {
                return false;
            }
        }

        for (game, count) in lineup.game_counts() {
            let next = self.game_counts.get(&game).copied().unwrap_or(0) + count;
            if fraction(next, self.target_lineups) > self.caps.default_game + f64::EPSILON {
                return false;
            }
        }

        true
    }

    /// Record `lineup` as accepted, without checking caps (call
    /// `can_add` first).
    pub fn add(&mut self, lineup: &Lineup) {
        self.accepted += 1;
        for player in &lineup.players {
            *self.player_counts.entry(player.id.clone()).or_insert(0) += 1;
        }
        for (team, count) in lineup.team_counts() {
            *self.team_counts.entry(team).or_insert(0) += count;
        }
        for (game, count) in lineup.game_counts() {
            *self.game_counts.entry(game).or_insert(0) += count;
        }
        self.diversity_matrix
            .push(lineup.players.iter().map(|p| p.id.clone()).collect());
    }

    /// Convenience combining the check and the record: accepts
    /// `lineup` into the tracked exposure if it fits under every cap,
    /// returning whether it was accepted.
    pub fn complete_lineup(&mut self, lineup: &Lineup) -> bool {
        if !self.can_add(lineup) {
            return false;
        }
        self.add(lineup);
        true
    }

    /// Players below their configured `min_exposure` given how many
    /// lineups have been accepted so far versus `target_lineups` —
    /// used by the portfolio stage to decide whether a forced top-up
    /// pass is needed (spec §4.6, §4.7).
    pub fn players_under_min(&self) -> Vec<PlayerId> {
        self.caps
            .player_min
            .iter()
            .filter_map(|(id, &min)| {
                let have = self.player_counts.get(id).copied().unwrap_or(0);
                if fraction(have, self.target_lineups) < min {
                    Some(id.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Undo the most recent `add(lineup)` call. Used by the portfolio
    /// stage's minimum-exposure top-up pass to tentatively evict the
    /// weakest accepted lineup and put it back if a replacement doesn't
    /// pan out. Only valid when `lineup` is the most recently accepted
    /// one — `diversity_matrix` is a plain push/pop stack, not indexed
    /// by lineup identity.
    pub fn remove_last(&mut self, lineup: &Lineup) {
        self.accepted = self.accepted.saturating_sub(1);
        for player in &lineup.players {
            if let Some(c) = self.player_counts.get_mut(&player.id) {
                *c -= 1;
                if *c == 0 {
                    self.player_counts.remove(&player.id);
                }
            }
        }
        for (team, count) in lineup.team_counts() {
            if let Some(c) = self.team_counts.get_mut(&team) {
                *c = c.saturating_sub(count);
                if *c == 0 {
                    self.team_counts.remove(&team);
                }
            }
        }
        for (game, count) in lineup.game_counts() {
            if let Some(c) = self.game_counts.get_mut(&game) {
                *c = c.saturating_sub(count);
                if *c == 0 {
                    self.game_counts.remove(&game);
                }
            }
        }
        self.diversity_matrix.pop();
    }

    /// Build the final diagnostic report. `slot_count` is the lineup's
    /// roster size, used to normalize `diversity_score` (spec §4.6).
    pub fn report(&self, slot_count: usize) -> ExposureReport {
        let player_exposure = self
            .player_counts
            .iter()
            .map(|(id, &count)| (id.clone(), fraction(count, self.target_lineups)))
            .collect();
        let team_exposure = self
            .team_counts
            .iter()
            .map(|(team, &count)| (team.clone(), fraction(count, self.target_lineups)))
            .collect();
        let game_exposure = self
            .game_counts
            .iter()
            .map(|(game, &count)| (game.clone(), fraction(count, self.target_lineups)))
            .collect();

        ExposureReport {
            player_exposure,
            team_exposure,
            game_exposure,
            diversity_score: self.pairwise_diversity_score(slot_count),
            violations: self.cap_violations(),
        }
    }

    /// Average symmetric difference between every pair of accepted
    /// lineups, divided by `slot_count` (spec §4.6): `1.0` when every
    /// pair is fully disjoint, `0.0` when every accepted lineup is
    /// identical. Undefined with fewer than two lineups; by convention
    /// that returns `1.0` (nothing yet to call "not diverse").
    fn pairwise_diversity_score(&self, slot_count: usize) -> f64 {
        let n = self.diversity_matrix.len();
        if n < 2 || slot_count == 0 {
            return 1.0;
        }
        let mut total_diff = 0usize;
        let mut pairs = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                let a: HashMap<&PlayerId, ()> = self.diversity_matrix[i].iter().map(|id| (id, ())).collect();
                let b: HashMap<&PlayerId, ()> = self.diversity_matrix[j].iter().map(|id| (id, ())).collect();
                let diff = a.keys().filter(|id| !b.contains_key(*id)).count()
                    + b.keys().filter(|id| !a.contains_key(*id)).count();
                total_diff += diff;
                pairs += 1;
            }
        }
        let avg_diff = total_diff as f64 / pairs.max(1) as f64;
        (avg_diff / slot_count as f64).min(1.0)
    }

    /// Final sanity pass over every tracked count against its
    /// configured or default cap. Normally empty; see `ExposureReport`.
    fn cap_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (id, &count) in &self.player_counts {
            let cap = self.caps.player_max.get(id).copied().unwrap_or(self.caps.default_player);
            let actual = fraction(count, self.target_lineups);
            if actual > cap + f64::EPSILON {
                violations.push(format!("player {id} exposure {actual:.2} exceeds cap {cap:.2}"));
            }
        }
        for (team, &count) in &self.team_counts {
            let actual = fraction(count, self.target_lineups);
            if actual > self.caps.default_team + f64::EPSILON {
                violations.push(format!("team {team} exposure {actual:.2} exceeds cap {:.2}", self.caps.default_team));
            }
        }
        for (game, &count) in &self.game_counts {
            let actual = fraction(count, self.target_lineups);
            if actual > self.caps.default_game + f64::EPSILON {
                violations.push(format!("game {game} exposure {actual:.2} exceeds cap {:.2}", self.caps.default_game));
            }
        }
        violations
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted
    }
}

fn fraction(count: usize, target: usize) -> f64 {
    count as f64 / target as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TeamCode;
    use crate::model::{Player, Position};
    use std::collections::HashMap as Map;

    fn lineup(players: Vec<Player>) -> Lineup {
        Lineup {
            players,
            total_salary: 10_000,
            projected_points: 100.0,
            slot_assignment: Map::new(),
        }
    }

    fn player(id: &str, team: &str) -> Player {
        Player {
            id: id.into(),
            name: id.to_string(),
            team: Some(TeamCode::from(team)),
            opponent: Some(TeamCode::from("OPP")),
            position: Position::new("WR"),
            salary_dk: Some(5000),
            salary_fd: None,
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
    fn default_player_cap_blocks_the_fourth_of_ten_appearances() {
        let config = OptimizeConfig::new(50_000, 10);
        let mut manager = ExposureManager::new(10, &config);
        let p = player("p1", "BOS");

        for _ in 0..3 {
            assert!(manager.complete_lineup(&lineup(vec![p.clone()])));
        }
        // 4th of 10 lineups would be 40% exposure, over the 30% default cap.
        assert!(!manager.can_add(&lineup(vec![p.clone()])));
    }

    #[test]
    fn per_player_max_exposure_override_is_honored() {
        let mut config = OptimizeConfig::new(50_000, 10);
        let p = player("p1", "BOS");
        config.max_exposure.insert(p.id.clone(), 0.50);
        let mut manager = ExposureManager::new(10, &config);

        for _ in 0..4 {
            assert!(manager.complete_lineup(&lineup(vec![p.clone()])));
        }
        assert!(manager.can_add(&lineup(vec![p.clone()])));
    }

    #[test]
    fn diversity_score_is_perfect_with_fewer_than_two_lineups() {
        let config = OptimizeConfig::new(50_000, 10);
        let manager = ExposureManager::new(10, &config);
        assert_eq!(manager.report(3).diversity_score, 1.0);
    }

    #[test]
    fn diversity_score_is_zero_for_two_identical_lineups() {
        let config = OptimizeConfig::new(50_000, 10);
        let mut manager = ExposureManager::new(10, &config);
        let bos_stack = lineup(vec![player("a", "BOS"), player("b", "BOS"), player("c", "BOS")]);
        manager.add(&bos_stack.clone());
        manager.add(&bos_stack);
        assert_eq!(manager.report(3).diversity_score, 0.0);
    }

    #[test]
    fn diversity_score_is_one_for_two_fully_disjoint_lineups() {
        let config = OptimizeConfig::new(50_000, 10);
        let mut manager = ExposureManager::new(10, &config);
        manager.add(&lineup(vec![player("a", "BOS"), player("b", "BOS")]));
        manager.add(&lineup(vec![player("c", "NYJ"), player("d", "NYJ")]));
        assert_eq!(manager.report(2).diversity_score, 1.0);
    }

    #[test]
    fn remove_last_undoes_the_counts_from_the_matching_add() {
        let config = OptimizeConfig::new(50_000, 4);
        let mut manager = ExposureManager::new(4, &config);
        let p = player("p1", "BOS");
        let l = lineup(vec![p.clone()]);

        manager.add(&l);
        assert_eq!(manager.accepted_count(), 1);
        manager.remove_last(&l);

        assert_eq!(manager.accepted_count(), 0);
        assert_eq!(manager.report(1).player_exposure.get(&p.id), None);
    }

    #[test]
    fn report_reflects_accepted_counts_as_fractions_of_target() {
        let config = OptimizeConfig::new(50_000, 4);
        let mut manager = ExposureManager::new(4, &config);
        let p = player("p1", "BOS");
        manager.add(&lineup(vec![p.clone()]));
        let report = manager.report(1);
        assert_eq!(report.player_exposure[&p.id], 0.25);
        assert!(report.violations.is_empty());
    }
}
