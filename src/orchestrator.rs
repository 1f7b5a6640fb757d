//! C8 — Optimize Orchestrator (spec §4.8).
//!
//! Wires C1–C7 into the single `optimize(pool, contest, config)` entry
//! point: resolve slots, filter and index the pool, build the
//! correlation matrix, search, rank, and select the final portfolio,
//! attaching run metadata. Collaborators (C9) are only ever touched
//! before this function is called — `optimize` itself is pure
//! computation, kept separate from I/O.

use crate::correlation::CorrelationMatrix;
use crate::error::{OptimizerError, Result};
use crate::exposure::ExposureManager;
use crate::generator::{self, Deadline};
use crate::ids::LineupId;
use crate::model::{Contest, OptimizeConfig, OptimizeResult, Player, RankedLineup, RunMetadata, SlotPlayer};
use crate::player_index;
use crate::portfolio;
use crate::scoring;
use crate::slots;
use crate::util::stable_suffix;
use std::time::Instant;
use tracing::info;

/// Run one full optimization over `pool` under `contest`/`config`
/// (spec §4.8's seven steps). `deadline` is optional cooperative
/// cancellation, threaded straight through to C5.
pub fn optimize(
    pool: &[Player],
    contest: &Contest,
    config: &OptimizeConfig,
    deadline: Option<Deadline>,
) -> Result<OptimizeResult> {
    let start = Instant::now();

    if let Some(id) = config.locked_players.intersection(&config.excluded_players).next() {
        return Err(OptimizerError::Conflict(format!(
            "player {id} is both locked and excluded"
        )));
    }

    let contest_slots = slots::get_position_slots(&contest.sport, contest.platform);
    if contest_slots.is_empty() {
        return Err(OptimizerError::InvalidContest(format!(
            "no slot grammar for sport={:?} platform={}",
            contest.sport, contest.platform
        )));
    }
    let contest_slots = contest_slots.to_vec();

    let (filtered, filter_report) = player_index::filter(pool, config);
    let buckets = player_index::by_position(&filtered, contest.platform);

    info!(
        retained = filter_report.retained_count,
        excluded = filter_report.excluded_count,
        injured = filter_report.injured_count,
        "orchestrator filtered pool"
    );

    let correlation = if config.use_correlations {
        CorrelationMatrix::build(&filtered, &contest.sport)
    } else {
        CorrelationMatrix::default()
    };

    let strategy = scoring::auto_select_strategy(contest, config);

    let generation = generator::generate(&contest_slots, &buckets, contest, config, &correlation, strategy, deadline);

    let mut exposure = ExposureManager::new(config.num_lineups, config);
    let weighted = portfolio::select_portfolio(&generation.candidates, config, &mut exposure);

    let report = exposure.report(contest_slots.len());
    let ranked: Vec<RankedLineup> = weighted
        .into_iter()
        .enumerate()
        .map(|(rank, wl)| to_ranked_lineup(rank, wl, &report, contest.platform))
        .collect();

    if ranked.is_empty() && !generation.cancelled {
        return Err(OptimizerError::Infeasible {
            floor: (0.95 * contest.salary_cap as f64).round() as u32,
            cap: contest.salary_cap,
        });
    }

    let execution_time_ms = start.elapsed().as_millis() as u64;
    let partial = generation.cancelled || ranked.len() < config.num_lineups;

    let metadata = RunMetadata {
        execution_time_ms,
        algorithm: generation.mode.label().to_string(),
        performance_mode: generation.mode.label().to_string(),
        valid_combinations: generation.valid_combinations,
        partial,
    };

    info!(
        lineups = ranked.len(),
        valid_combinations = generation.valid_combinations,
        mode = generation.mode.label(),
        cancelled = generation.cancelled,
        execution_time_ms,
        "optimize run complete"
    );

    Ok(OptimizeResult {
        lineups: ranked,
        optimization_time_ms: execution_time_ms,
        valid_combinations: generation.valid_combinations,
        metadata,
    })
}

fn to_ranked_lineup(
    rank: usize,
    wl: portfolio::WeightedLineup,
    report: &crate::exposure::ExposureReport,
    platform: crate::model::Platform,
) -> RankedLineup {
    let lineup = wl.lineup;
    let seed = {
        let mut ids: Vec<&str> = lineup.players.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.join(",")
    };
    let id = LineupId::synthesize(rank, &stable_suffix(&seed));

    let slot_players: Vec<SlotPlayer> = lineup
        .players
        .iter()
        .map(|p| SlotPlayer {
            id: p.id.clone(),
            name: p.name.clone(),
            team: p.team_or_empty(),
            position: p.position.clone(),
            salary: player_index::salary(p, platform),
            projected_points: p.projected_or_zero(),
        })
        .collect();

    let exposure = lineup
        .players
        .iter()
        .map(|p| report.player_exposure.get(&p.id).copied().unwrap_or(0.0))
        .sum::<f64>()
        / lineup.players.len().max(1) as f64;

    let stack_description = describe_stacks(&lineup);

    RankedLineup {
        id,
        slots: slot_players,
        total_salary: lineup.total_salary,
        projected_points: lineup.projected_points,
        exposure,
        stack_description,
    }
}

/// Human-readable summary of team stacks with 2+ players, e.g. `"3x
/// BOS, 2x NYJ"` (spec §6's optional `stack_description`).
fn describe_stacks(lineup: &crate::model::Lineup) -> Option<String> {
    let mut counts: Vec<(String, usize)> = lineup
        .team_counts()
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(team, count)| (team.0, count))
        .collect();
    if counts.is_empty() {
        return None;
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Some(counts.iter().map(|(team, count)| format!("{count}x {team}")).collect::<Vec<_>>().join(", "))
}
