//! C4 — Objective Scorer (spec §4.4).
//!
//! Pure, stateless per-player scoring parameterized by strategy, plus
//! strategy auto-selection. Strategy weightings follow the design
//! intent in spec §4.4; implementations are explicitly allowed to tune
//! within ±10%, which this module does not exploit (weights below are
//! the literal design-intent values).

use crate::correlation::CorrelationMatrix;
use crate::model::{Contest, OptimizeConfig, Player, Strategy};
use crate::player_index::value;

/// Volatility (coefficient of variation) default buckets, per spec §4.4.
pub(crate) fn default_volatility(projection: f64) -> f64 {
    if projection > 40.0 {
        0.25
    } else if projection < 20.0 {
        0.45
    } else {
        0.35
    }
}

fn consistency(volatility: f64) -> f64 {
    1.0 / (1.0 + volatility)
}

/// `k` used for the default ceiling/floor spread, bucketed with the
/// same thresholds as volatility (spec §4.4).
fn default_k(projection: f64) -> f64 {
    if projection > 40.0 {
        0.25
    } else if projection < 20.0 {
        0.45
    } else {
        0.35
    }
}

fn resolved_floor(p: &Player) -> f64 {
    let proj = p.projected_or_zero();
    p.floor_points.unwrap_or(proj * (1.0 - default_k(proj)))
}

fn resolved_ceiling(p: &Player) -> f64 {
    let proj = p.projected_or_zero();
    p.ceiling_points.unwrap_or(proj * (1.0 + default_k(proj)))
}

/// Normal-model approximation of P(score >= ceiling), clipped to
/// [0.05, 0.35] (spec §4.4).
fn ceiling_prob(p: &Player) -> f64 {
    let proj = p.projected_or_zero();
    let vol = default_volatility(proj);
    let sigma = (vol * proj).max(1e-6);
    let ceiling = resolved_ceiling(p);
    let z = (ceiling - proj) / sigma;
    // Rough tail-probability approximation: monotonically decreasing in z.
    let raw = (0.5 - 0.5 * (z / (1.0 + z.abs())).tanh()).clamp(0.0, 1.0);
    raw.clamp(0.05, 0.35)
}

fn ownership_of(p: &Player) -> f64 {
    p.ownership_dk.or(p.ownership_fd).unwrap_or(0.0)
}

fn injury_penalty(p: &Player) -> f64 {
    match p.is_injured {
        Some(true) => 5.0,
        _ => 0.0,
    }
}

/// Per-player score under `strategy` given the partial lineup already
/// assembled and the request's correlation matrix (spec §4.4).
///
/// `platform` resolves the salary used for `value`.
pub fn score_player(
    player: &Player,
    partial_lineup: &[Player],
    strategy: Strategy,
    correlation: &CorrelationMatrix,
    config: &OptimizeConfig,
    platform: crate::model::Platform,
) -> f64 {
    let proj = player.projected_or_zero();
    let floor = resolved_floor(player);
    let ceiling = resolved_ceiling(player);
    let val = value(player, platform);
    let ownership = ownership_of(player);
    let vol = default_volatility(proj);

    match strategy {
        Strategy::MaxCeiling => {
            let penalty = (ownership / 100.0).powi(2) * 10.0;
            0.60 * ceiling + 0.25 * proj + 0.15 * ceiling_prob(player) * proj
                + 0.20 * safe_ratio(ceiling, proj)
                - penalty
        }
        Strategy::MaxFloor => {
            let cons = consistency(vol);
            0.50 * floor + 0.30 * cons * proj + 0.20 * proj + 0.10 * (1.0 - vol) * proj
                - injury_penalty(player)
        }
        Strategy::Balanced => {
            let tilt = if ownership > 20.0 { -0.02 * ownership } else { 0.02 * (20.0 - ownership) };
            0.40 * proj + 0.20 * ceiling + 0.20 * floor + 0.20 * val * proj + tilt
        }
        Strategy::Contrarian => {
            let threshold = 15.0;
            let bonus = if ownership < threshold {
                (threshold - ownership).exp2() * 0.01
            } else {
                0.0
            };
            let penalty = if ownership > 25.0 {
                (ownership - 25.0).powi(2) * 0.02
            } else {
                0.0
            };
            0.60 * proj + bonus - penalty
        }
        Strategy::Correlation => {
            let w = config.correlation_weight;
            let corr_sum: f64 = partial_lineup
                .iter()
                .map(|other| correlation.get(&player.id, &other.id) * proj * w)
                .sum();
            let stack_bonus = if !partial_lineup.is_empty()
                && partial_lineup.iter().any(|o| o.team_or_empty() == player.team_or_empty() && !player.team_or_empty().is_empty())
            {
                proj * 0.05
            } else {
                0.0
            };
            0.50 * proj + corr_sum + stack_bonus
        }
        Strategy::Value => {
            let bonus = if val > 5.0 { proj * 0.05 } else { 0.0 };
            0.80 * val * proj + 0.20 * floor + bonus
        }
    }
}

fn safe_ratio(num: f64, denom: f64) -> f64 {
    if denom.abs() < 1e-9 {
        0.0
    } else {
        num / denom
    }
}

/// Auto-select a strategy when the caller doesn't choose one (spec §4.4).
pub fn auto_select_strategy(contest: &Contest, config: &OptimizeConfig) -> Strategy {
    if let Some(s) = config.strategy {
        return s;
    }
    let contest_type = contest.contest_type.as_deref().unwrap_or("").to_lowercase();
    if contest_type.contains("gpp") || contest_type.contains("tournament") {
        Strategy::MaxCeiling
    } else if contest_type.contains("cash") || contest_type.contains("50-50") || contest_type.contains("50/50") {
        Strategy::MaxFloor
    } else if config.use_correlations && !config.stacking_rules.is_empty() {
        Strategy::Correlation
    } else {
        Strategy::Balanced
    }
}
