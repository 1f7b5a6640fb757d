//! C7 — Portfolio Selector (spec §4.7).
//!
//! Turns the ranked candidate pool from C5 into the final set of
//! `num_lineups` lineups. The default path is rank-order acceptance
//! gated by C6's exposure caps and a minimum-difference rule against
//! the closest lineup already accepted (spec §8 property 6). When
//! `use_portfolio_constraints` is set, accepted lineups are additionally
//! weighted by a mean-variance or risk-parity allocation, the same
//! shape of computation as `6256bb71_praveen686-shrivenQ`'s portfolio
//! optimizer (`minimum_variance_allocation`, `max_sharpe_allocation`,
//! `risk_parity_allocation`), adapted from asset positions to DFS
//! lineups and from nalgebra inverse-covariance weights to this
//! crate's plain `f64` (no fixed-point requirement here).

use crate::exposure::ExposureManager;
use crate::ids::TeamCode;
use crate::model::{Lineup, OptimizeConfig, PortfolioConstraints};
use crate::scoring::default_volatility;
use nalgebra::{DMatrix, DVector};
use std::collections::HashSet;

/// A lineup paired with its portfolio weight (spec §4.7). Weight is
/// `1 / accepted.len()` outside portfolio mode.
pub struct WeightedLineup {
    pub lineup: Lineup,
    pub weight: f64,
}

/// Herfindahl-based diversity of a single lineup's team composition:
/// `1 - sum(share^2)`, `0` for an all-one-team lineup (spec §4.7).
pub fn lineup_diversity(lineup: &Lineup) -> f64 {
    let n = lineup.players.len();
    if n == 0 {
        return 1.0;
    }
    let hhi: f64 = lineup
        .team_counts()
        .values()
        .map(|&c| {
            let share = c as f64 / n as f64;
            share * share
        })
        .sum();
    (1.0 - hhi).max(0.0)
}

/// Select and weight the final portfolio from `candidates`, which must
/// already be ranked best-first (spec §4.5's output order).
pub fn select_portfolio(
    candidates: &[Lineup],
    config: &OptimizeConfig,
    exposure: &mut ExposureManager,
) -> Vec<WeightedLineup> {
    let mut accepted: Vec<Lineup> = Vec::with_capacity(config.num_lineups);

    for candidate in candidates {
        if accepted.len() >= config.num_lineups {
            break;
        }
        if config.use_portfolio_constraints && lineup_diversity(candidate) < config.portfolio.min_diversification {
            continue;
        }
        if config.use_portfolio_constraints && !within_team_allocation_bounds(candidate, &config.portfolio) {
            continue;
        }

        let min_diff = accepted
            .iter()
            .map(|a| a.differs_by(candidate))
            .min()
            .unwrap_or(usize::MAX);
        if min_diff < config.min_different_players {
            continue;
        }

        if !exposure.can_add(candidate) {
            continue;
        }

        exposure.add(candidate);
        accepted.push(candidate.clone());
    }

    top_up_min_exposure(&mut accepted, candidates, config, exposure);

    if accepted.is_empty() {
        return Vec::new();
    }

    let weights = if config.use_portfolio_constraints {
        if config.portfolio.use_risk_parity {
            risk_parity_weights(&accepted)
        } else {
            mean_variance_weights(&accepted, config.portfolio.risk_aversion)
        }
    } else {
        equal_weights(accepted.len())
    };

    let weights = clip_and_renormalize(weights, config.portfolio.max_position_size);

    accepted
        .into_iter()
        .zip(weights)
        .map(|(lineup, weight)| WeightedLineup { lineup, weight })
        .collect()
}

/// True if `candidate`'s team composition stays within every configured
/// `team_min`/`team_max` allocation bound (spec §3, §4.7 step 1). A team
/// absent from both maps is unconstrained; share is the team's fraction
/// of the lineup's roster.
fn within_team_allocation_bounds(candidate: &Lineup, portfolio: &PortfolioConstraints) -> bool {
    if portfolio.team_min.is_empty() && portfolio.team_max.is_empty() {
        return true;
    }
    let roster = candidate.players.len().max(1) as f64;
    let counts = candidate.team_counts();
    let mut teams: HashSet<&TeamCode> = portfolio.team_min.keys().collect();
    teams.extend(portfolio.team_max.keys());

    for team in teams {
        let share = counts.get(team).copied().unwrap_or(0) as f64 / roster;
        if let Some(&min) = portfolio.team_min.get(team) {
            if share < min {
                return false;
            }
        }
        if let Some(&max) = portfolio.team_max.get(team) {
            if share > max {
                return false;
            }
        }
    }
    true
}

/// Force players below their configured `min_exposure` into the
/// portfolio (spec §3, §4.6), by swapping out the weakest accepted
/// lineup (the last one, since `accepted` preserves rank order) for the
/// best-ranked remaining candidate that carries the needy player —
/// rolling the swap back if it would violate the minimum-difference
/// rule or another exposure cap.
fn top_up_min_exposure(accepted: &mut Vec<Lineup>, candidates: &[Lineup], config: &OptimizeConfig, exposure: &mut ExposureManager) {
    for player_id in exposure.players_under_min() {
        if accepted.iter().any(|l| l.players.iter().any(|p| p.id == player_id)) {
            continue;
        }
        let already_in = |c: &Lineup| accepted.iter().any(|a| a.player_ids() == c.player_ids());
        let Some(candidate) = candidates.iter().find(|c| c.players.iter().any(|p| p.id == player_id) && !already_in(c)) else {
            continue;
        };

        if accepted.len() < config.num_lineups {
            let min_diff = accepted.iter().map(|a| a.differs_by(candidate)).min().unwrap_or(usize::MAX);
            if min_diff >= config.min_different_players && exposure.can_add(candidate) {
                exposure.add(candidate);
                accepted.push(candidate.clone());
            }
            continue;
        }

        let Some(victim) = accepted.pop() else { continue };
        exposure.remove_last(&victim);

        let min_diff = accepted.iter().map(|a| a.differs_by(candidate)).min().unwrap_or(usize::MAX);
        if min_diff >= config.min_different_players && exposure.can_add(candidate) {
            exposure.add(candidate);
            accepted.push(candidate.clone());
        } else {
            exposure.add(&victim);
            accepted.push(victim);
        }
    }
}

fn equal_weights(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

/// Each lineup's estimated outcome volatility: `sqrt(sum(var_i))` over
/// its players, treating within-lineup player outcomes as independent
/// (spec §4.4's per-player volatility bucket, reused here at the
/// lineup level).
fn lineup_volatility(lineup: &Lineup) -> f64 {
    let variance: f64 = lineup
        .players
        .iter()
        .map(|p| {
            let proj = p.projected_or_zero();
            let sigma = default_volatility(proj) * proj;
            sigma * sigma
        })
        .sum();
    variance.sqrt().max(1e-6)
}

/// Player-overlap similarity between two lineups, in `[0, 1]`: the
/// fraction of the smaller lineup's players also present in the
/// other. Used as the off-diagonal correlation term in the
/// lineup-covariance matrix — two lineups sharing most of their
/// players should have strongly correlated outcomes.
fn lineup_overlap(a: &Lineup, b: &Lineup) -> f64 {
    let ids_a = a.player_ids();
    let ids_b = b.player_ids();
    let shared = ids_a.intersection(&ids_b).count();
    let smaller = ids_a.len().min(ids_b.len()).max(1);
    shared as f64 / smaller as f64
}

fn build_covariance(lineups: &[Lineup]) -> (DVector<f64>, DMatrix<f64>) {
    let n = lineups.len();
    let returns = DVector::from_iterator(n, lineups.iter().map(|l| l.projected_points));
    let volatilities: Vec<f64> = lineups.iter().map(lineup_volatility).collect();

    let mut cov = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                cov[(i, j)] = volatilities[i] * volatilities[i];
            } else {
                let corr = lineup_overlap(&lineups[i], &lineups[j]);
                cov[(i, j)] = volatilities[i] * volatilities[j] * corr;
            }
        }
    }
    (returns, cov)
}

/// Mean-variance weights proportional to `Σ⁻¹ · (μ - risk_aversion)`,
/// normalized to sum to 1 and floored at 0 (long-only, spec §4.7).
/// Falls back to equal weights when the covariance matrix is singular
/// (small portfolios with near-identical lineups are prone to this).
fn mean_variance_weights(lineups: &[Lineup], risk_aversion: f64) -> Vec<f64> {
    let n = lineups.len();
    if n == 1 {
        return vec![1.0];
    }
    let (returns, cov) = build_covariance(lineups);

    if let Some(inv_cov) = cov.clone().try_inverse() {
        let adjusted_returns = returns.map(|r| r - risk_aversion);
        let raw = &inv_cov * &adjusted_returns;
        let positive: Vec<f64> = raw.iter().map(|&w| w.max(0.0)).collect();
        let sum: f64 = positive.iter().sum();
        if sum > 1e-9 {
            return positive.iter().map(|&w| w / sum).collect();
        }
    }

    equal_weights(n)
}

/// Risk-parity weights: inversely proportional to each lineup's
/// volatility, normalized to sum to 1 (spec §4.7).
fn risk_parity_weights(lineups: &[Lineup]) -> Vec<f64> {
    let inv_vol: Vec<f64> = lineups.iter().map(|l| 1.0 / lineup_volatility(l)).collect();
    let sum: f64 = inv_vol.iter().sum();
    if sum <= 1e-9 {
        return equal_weights(lineups.len());
    }
    inv_vol.iter().map(|&w| w / sum).collect()
}

/// Clamp every weight to `max_position_size` and renormalize so the
/// portfolio still sums to 1 (spec §4.7).
fn clip_and_renormalize(weights: Vec<f64>, max_position_size: f64) -> Vec<f64> {
    let clipped: Vec<f64> = weights.iter().map(|&w| w.min(max_position_size)).collect();
    let sum: f64 = clipped.iter().sum();
    if sum <= 1e-9 {
        return equal_weights(weights.len());
    }
    clipped.iter().map(|&w| w / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PlayerId, TeamCode};
    use crate::model::{Player, Position};
    use std::collections::HashMap;

    fn player(id: &str, team: &str, proj: f64) -> Player {
        Player {
            id: id.into(),
            name: id.to_string(),
            team: Some(TeamCode::from(team)),
            opponent: Some(TeamCode::from("OPP")),
            position: Position::new("WR"),
            salary_dk: Some(5000),
            salary_fd: None,
            projected_points: Some(proj),
            floor_points: None,
            ceiling_points: None,
            ownership_dk: None,
            ownership_fd: None,
            is_injured: None,
            injury_status: None,
        }
    }

    fn lineup(players: Vec<Player>, projected_points: f64) -> Lineup {
        let total_salary = players.len() as u32 * 5000;
        Lineup {
            players,
            total_salary,
            projected_points,
            slot_assignment: HashMap::new(),
        }
    }

    #[test]
    fn lineup_diversity_is_zero_for_a_single_team_stack() {
        let l = lineup(vec![player("a", "BOS", 20.0), player("b", "BOS", 18.0)], 38.0);
        assert_eq!(lineup_diversity(&l), 0.0);
    }

    #[test]
    fn lineup_diversity_is_higher_with_more_teams() {
        let stacked = lineup(vec![player("a", "BOS", 20.0), player("b", "BOS", 18.0)], 38.0);
        let spread = lineup(vec![player("a", "BOS", 20.0), player("c", "NYJ", 18.0)], 38.0);
        assert!(lineup_diversity(&spread) > lineup_diversity(&stacked));
    }

    #[test]
    fn default_path_rejects_candidates_too_similar_to_an_accepted_lineup() {
        let mut config = OptimizeConfig::new(50_000, 2);
        config.min_different_players = 2;
        let mut exposure = ExposureManager::new(2, &config);

        let l1 = lineup(vec![player("a", "BOS", 20.0), player("b", "NYJ", 18.0)], 38.0);
        // Differs from l1 by only 1 player (swap b -> c).
        let l2 = lineup(vec![player("a", "BOS", 20.0), player("c", "NYJ", 17.0)], 37.0);
        let l3 = lineup(vec![player("d", "MIA", 19.0), player("e", "BUF", 16.0)], 35.0);

        let selected = select_portfolio(&[l1, l2, l3], &config, &mut exposure);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].lineup.player_ids().len(), 2);
    }

    #[test]
    fn portfolio_mode_filters_candidates_breaching_team_max_allocation() {
        let mut config = OptimizeConfig::new(50_000, 1);
        config.use_portfolio_constraints = true;
        config.portfolio.team_max.insert(TeamCode::from("BOS"), 0.6);
        let mut exposure = ExposureManager::new(1, &config);

        let stacked = lineup(vec![player("a", "BOS", 20.0), player("b", "BOS", 18.0)], 38.0);
        let spread = lineup(vec![player("c", "BOS", 19.0), player("d", "NYJ", 17.0)], 36.0);

        let selected = select_portfolio(&[stacked, spread.clone()], &config, &mut exposure);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].lineup.player_ids(), spread.player_ids());
    }

    #[test]
    fn min_exposure_top_up_forces_in_a_player_below_their_minimum() {
        let mut config = OptimizeConfig::new(50_000, 1);
        config.min_exposure.insert(PlayerId::from("needed"), 1.0);
        let mut exposure = ExposureManager::new(1, &config);

        let best = lineup(vec![player("a", "BOS", 30.0), player("b", "NYJ", 28.0)], 58.0);
        let with_needed = lineup(vec![player("needed", "MIA", 10.0), player("c", "BUF", 9.0)], 19.0);

        let selected = select_portfolio(&[best, with_needed.clone()], &config, &mut exposure);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].lineup.player_ids(), with_needed.player_ids());
    }

    #[test]
    fn equal_weights_are_used_outside_portfolio_mode() {
        let config = OptimizeConfig::new(50_000, 2);
        let mut exposure = ExposureManager::new(2, &config);
        let l1 = lineup(vec![player("a", "BOS", 20.0)], 20.0);
        let l2 = lineup(vec![player("b", "NYJ", 15.0)], 15.0);

        let selected = select_portfolio(&[l1, l2], &config, &mut exposure);
        assert_eq!(selected.len(), 2);
        for wl in &selected {
            assert!((wl.weight - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn risk_parity_weights_sum_to_one() {
        let l1 = lineup(vec![player("a", "BOS", 40.0)], 40.0);
        let l2 = lineup(vec![player("b", "NYJ", 10.0)], 10.0);
        let weights = risk_parity_weights(&[l1, l2]);
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clip_and_renormalize_keeps_sum_at_one_after_clamping() {
        let weights = clip_and_renormalize(vec![0.8, 0.1, 0.1], 0.35);
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(weights[0] <= 0.35 + 1e-9);
    }
}
