//! Command implementations for the DFS lineup optimizer CLI (C10).
//!
//! `optimize` is `async` only because it may consult a `PlayerDataProvider`/
//! `Cache` collaborator before calling the synchronous `orchestrator::optimize`
//! (spec §4.8) — the rest of the core stays synchronous.

use crate::collaborators::{Cache, CsvPlayerDataProvider, FileCache, PlayerDataProvider};
use crate::error::{OptimizerError, Result};
use crate::model::{Contest, OptimizeConfig, OptimizeResult, Platform, Sport, Strategy};
use crate::orchestrator;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const POOL_CACHE_TTL: Duration = Duration::from_secs(300);

/// Handle the `optimize` command: hydrate a pool, build a contest/config,
/// run the orchestrator, and render the result.
#[allow(clippy::too_many_arguments)]
pub async fn handle_optimize(
    pool_path: &Path,
    platform: &str,
    sport: &str,
    salary_cap: u32,
    num_lineups: usize,
    strategy: Option<&str>,
    locked_players: &[String],
    excluded_players: &[String],
    min_different_players: Option<usize>,
    no_correlation: bool,
    use_portfolio: bool,
    use_risk_parity: bool,
    as_json: bool,
    use_cache: bool,
    time_budget_ms: Option<u64>,
) -> Result<()> {
    let platform = Platform::from_str(platform).map_err(OptimizerError::InvalidContest)?;
    let contest = Contest {
        platform,
        sport: Sport::new(sport),
        salary_cap,
        contest_type: None,
    };

    let pool = hydrate_pool(pool_path, &contest, use_cache)?;

    let mut config = OptimizeConfig::new(salary_cap, num_lineups);
    config.strategy = strategy.map(parse_strategy).transpose()?;
    config.use_correlations = !no_correlation;
    config.locked_players = locked_players.iter().map(|s| s.as_str().into()).collect();
    config.excluded_players = excluded_players.iter().map(|s| s.as_str().into()).collect();
    if let Some(min_diff) = min_different_players {
        config.min_different_players = min_diff;
    }
    config.use_portfolio_constraints = use_portfolio;
    config.portfolio.use_risk_parity = use_risk_parity;

    let deadline = time_budget_ms.map(|ms| {
        crate::generator::Deadline::new(
            std::sync::Arc::new(crate::collaborators::SystemClock),
            Duration::from_millis(ms),
        )
    });

    let result = orchestrator::optimize(&pool, &contest, &config, deadline)?;
    render_result(&result, as_json);
    Ok(())
}

/// Handle `show-slots`: print the resolved slot grammar for a sport/platform.
pub fn handle_show_slots(sport: &str, platform: &str) -> Result<()> {
    let platform = Platform::from_str(platform).map_err(OptimizerError::InvalidContest)?;
    let slots = crate::slots::get_position_slots(&Sport::new(sport), platform);
    if slots.is_empty() {
        println!("No slot grammar registered for {sport}/{platform}");
        return Ok(());
    }
    for slot in slots {
        let positions: Vec<String> = slot.allowed_positions.iter().map(|p| p.0.clone()).collect();
        println!("{:>3}  {} [priority {}]", slot.name, positions.join("/"), slot.priority);
    }
    Ok(())
}

/// Handle `validate-pool`: load a CSV pool and report filter diagnostics
/// without running the search.
pub fn handle_validate_pool(pool_path: &Path, platform: &str) -> Result<()> {
    let platform = Platform::from_str(platform).map_err(OptimizerError::InvalidContest)?;
    let provider = CsvPlayerDataProvider::new(pool_path);
    let placeholder_contest = Contest {
        platform,
        sport: Sport::new("nfl"),
        salary_cap: 0,
        contest_type: None,
    };
    let pool = provider.fetch_pool(&placeholder_contest)?;
    let config = OptimizeConfig::new(0, 1);
    let (_, report) = crate::player_index::filter(&pool, &config);

    println!("total: {}", pool.len());
    println!("retained: {}", report.retained_count);
    println!("excluded: {}", report.excluded_count);
    println!("injured: {}", report.injured_count);
    Ok(())
}

fn parse_strategy(s: &str) -> Result<Strategy> {
    match s.to_lowercase().as_str() {
        "max_ceiling" | "maxceiling" => Ok(Strategy::MaxCeiling),
        "max_floor" | "maxfloor" => Ok(Strategy::MaxFloor),
        "balanced" => Ok(Strategy::Balanced),
        "contrarian" => Ok(Strategy::Contrarian),
        "correlation" => Ok(Strategy::Correlation),
        "value" => Ok(Strategy::Value),
        other => Err(OptimizerError::Conflict(format!("unrecognized strategy: {other:?}"))),
    }
}

fn hydrate_pool(pool_path: &Path, contest: &Contest, use_cache: bool) -> Result<Vec<crate::model::Player>> {
    let provider = CsvPlayerDataProvider::new(pool_path);

    if !use_cache {
        return provider.fetch_pool(contest);
    }

    let cache = FileCache::new();
    let key = cache_key(pool_path, contest);
    if let Some(bytes) = cache.get(&key)? {
        if let Ok(pool) = serde_json::from_slice(&bytes) {
            return Ok(pool);
        }
    }

    let pool = provider.fetch_pool(contest)?;
    let bytes = serde_json::to_vec(&pool)?;
    cache.set(&key, &bytes, POOL_CACHE_TTL)?;
    Ok(pool)
}

fn cache_key(pool_path: &Path, contest: &Contest) -> String {
    format!("pool:{}:{}:{}", pool_path.display(), contest.sport.0, contest.platform)
}

fn render_result(result: &OptimizeResult, as_json: bool) {
    if as_json {
        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize result: {e}"),
        }
        return;
    }

    for (i, lineup) in result.lineups.iter().enumerate() {
        println!(
            "#{} {} — {:.2} pts, ${} ({})",
            i + 1,
            lineup.id,
            lineup.projected_points,
            lineup.total_salary,
            lineup.stack_description.as_deref().unwrap_or("no stack"),
        );
        for slot in &lineup.slots {
            println!("    {:<6} {:<20} {} ${}", slot.position, slot.name, slot.team, slot.salary);
        }
    }
    println!(
        "valid_combinations={} mode={} time_ms={}",
        result.valid_combinations, result.metadata.performance_mode, result.metadata.execution_time_ms
    );
}
