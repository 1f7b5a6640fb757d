//! C2 — Player Index (spec §4.2).
//!
//! Builds a platform-aware, zero-defaulted projection of the raw
//! player pool. This is the one place that resolves the "missing
//! numeric field defaults to zero" rule from spec §3, so nothing
//! downstream needs to branch on an absent salary or projection.

use crate::ids::PlayerId;
use crate::model::{OptimizeConfig, Platform, Player, Position};
use std::collections::HashMap;
use tracing::debug;

/// Resolve a player's salary on `platform`, per the fallback priority
/// in spec §4.2: the named platform's salary when present and
/// positive, else the other platform's, else zero.
pub fn salary(player: &Player, platform: Platform) -> u32 {
    match platform {
        Platform::Fanduel => player
            .salary_fd
            .filter(|&s| s > 0)
            .or(player.salary_dk.filter(|&s| s > 0))
            .unwrap_or(0),
        Platform::Draftkings => player
            .salary_dk
            .filter(|&s| s > 0)
            .or(player.salary_fd.filter(|&s| s > 0))
            .unwrap_or(0),
    }
}

/// Value: projected points per $1,000 of salary (spec §4.2, §4.4), with
/// the salary floored at 1 to avoid a divide-by-zero.
pub fn value(player: &Player, platform: Platform) -> f64 {
    let sal = salary(player, platform).max(1) as f64;
    player.projected_or_zero() / sal * 1000.0
}

/// Outcome of filtering a pool, with diagnostic drop counts (spec §4.2).
#[derive(Debug, Clone, Default)]
pub struct FilterReport {
    pub excluded_count: usize,
    pub injured_count: usize,
    pub retained_count: usize,
}

/// Drop excluded and injured players from `pool` (spec §4.2).
///
/// `is_injured` is treated as a hard filter per spec §9's open
/// question: the source hard-filters and this implementation
/// preserves that behavior, even though it may reject players with a
/// `Q` (questionable) status who could still play.
pub fn filter(pool: &[Player], config: &OptimizeConfig) -> (Vec<Player>, FilterReport) {
    let mut report = FilterReport::default();
    let mut out = Vec::with_capacity(pool.len());

    for p in pool {
        if config.excluded_players.contains(&p.id) {
            report.excluded_count += 1;
            continue;
        }
        if p.is_injured.unwrap_or(false) {
            report.injured_count += 1;
            continue;
        }
        out.push(p.clone());
    }
    report.retained_count = out.len();

    debug!(
        excluded = report.excluded_count,
        injured = report.injured_count,
        retained = report.retained_count,
        "player index filtered pool"
    );

    (out, report)
}

/// Group a filtered pool by position, each bucket sorted descending by
/// value — the search-expansion order C5 uses to reach good solutions
/// early (spec §4.2).
pub fn by_position(pool: &[Player], platform: Platform) -> HashMap<Position, Vec<Player>> {
    let mut buckets: HashMap<Position, Vec<Player>> = HashMap::new();
    for p in pool {
        buckets.entry(p.position.clone()).or_default().push(p.clone());
    }
    for bucket in buckets.values_mut() {
        bucket.sort_by(|a, b| {
            value(b, platform)
                .partial_cmp(&value(a, platform))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.0.cmp(&b.id.0))
        });
    }
    buckets
}
