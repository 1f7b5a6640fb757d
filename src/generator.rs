//! C5 — Constrained Lineup Generator (spec §4.5).
//!
//! Depth-first backtracking with early pruning over the slot sequence
//! resolved by C1. Two modes share the same leaf checks and breadth
//! limiting: pure backtracking, and a "DP mode" that adds upper-bound
//! pruning plus a coarse, size-capped memoization table (spec §4.5,
//! §5). The top-level branching factor (slot 0's candidates) is farmed
//! out across `rayon`'s global pool for per-item fan-out, while every
//! recursive call below that stays single-threaded and owns its own
//! partial-lineup stack (spec §5, §9 — "forbid sharing across
//! threads").

use crate::correlation::CorrelationMatrix;
use crate::ids::{PlayerId, TeamCode};
use crate::model::{Contest, Lineup, OptimizeConfig, Platform, Player, Position, Slot, StackingRuleType, Strategy};
use crate::player_index;
use crate::scoring::score_player;
use lru::LruCache;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

const BREADTH_LIMIT: usize = 10;
const MAX_CANDIDATES: usize = 10_000;
const MEMO_CAPACITY: usize = 50_000;
const SALARY_BUCKET: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Backtracking,
    Dp,
}

impl SearchMode {
    pub fn label(&self) -> &'static str {
        match self {
            SearchMode::Backtracking => "backtracking",
            SearchMode::Dp => "dp",
        }
    }
}

/// Mode selection rule (spec §4.5).
pub fn choose_mode(config: &OptimizeConfig) -> SearchMode {
    if config.num_lineups > 20 || config.stacking_rules.len() > 2 || config.locked_players.len() > 3 {
        SearchMode::Dp
    } else {
        SearchMode::Backtracking
    }
}

/// A deadline against which the search cooperatively checks for
/// cancellation, at the outer slot loop and before every recursive
/// call (spec §5). Built from an injected `Clock` (see
/// `crate::collaborators::Clock`) so tests can simulate expiry
/// deterministically.
#[derive(Clone)]
pub struct Deadline {
    clock: std::sync::Arc<dyn crate::collaborators::Clock>,
    expires_at: std::time::SystemTime,
}

impl Deadline {
    pub fn new(clock: std::sync::Arc<dyn crate::collaborators::Clock>, budget: std::time::Duration) -> Self {
        let expires_at = clock.now() + budget;
        Self { clock, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        self.clock.now() >= self.expires_at
    }
}

pub struct GenerationResult {
    pub candidates: Vec<Lineup>,
    pub valid_combinations: usize,
    pub mode: SearchMode,
    pub cancelled: bool,
}

struct SearchCtx<'a> {
    slots: &'a [Slot],
    buckets: &'a HashMap<Position, Vec<Player>>,
    contest: &'a Contest,
    config: &'a OptimizeConfig,
    correlation: &'a CorrelationMatrix,
    strategy: Strategy,
    mode: SearchMode,
    emit_cap: usize,
    best_per_position: Vec<HashMap<Position, f64>>,
    deadline: Option<Deadline>,
}

struct SharedState {
    candidates: Mutex<Vec<(f64, Lineup)>>,
    valid_combinations: AtomicUsize,
    cancelled: AtomicBool,
    best_score_seen: Mutex<f64>,
    memo: Mutex<LruCache<MemoKey, f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    slot_idx: usize,
    salary_bucket: u32,
    used_count: usize,
}

/// Run the lineup search over `buckets` (value-sorted per position,
/// per C2), filling `slots` in priority order.
pub fn generate(
    slots: &[Slot],
    buckets: &HashMap<Position, Vec<Player>>,
    contest: &Contest,
    config: &OptimizeConfig,
    correlation: &CorrelationMatrix,
    strategy: Strategy,
    deadline: Option<Deadline>,
) -> GenerationResult {
    let mode = choose_mode(config);
    let emit_cap = (config.num_lineups.saturating_mul(100)).min(MAX_CANDIDATES).max(1);

    let best_per_position = precompute_best_remaining(slots, buckets);

    let ctx = SearchCtx {
        slots,
        buckets,
        contest,
        config,
        correlation,
        strategy,
        mode,
        emit_cap,
        best_per_position,
        deadline,
    };

    let shared = SharedState {
        candidates: Mutex::new(Vec::new()),
        valid_combinations: AtomicUsize::new(0),
        cancelled: AtomicBool::new(false),
        best_score_seen: Mutex::new(f64::MIN),
        memo: Mutex::new(LruCache::new(NonZeroUsize::new(MEMO_CAPACITY).unwrap())),
    };

    if slots.is_empty() {
        return GenerationResult {
            candidates: Vec::new(),
            valid_combinations: 0,
            mode,
            cancelled: false,
        };
    }

    let top_level = top_level_candidates(&slots[0], buckets, config, BREADTH_LIMIT.max(20));

    top_level.par_iter().for_each(|first_player| {
        if shared.cancelled.load(Ordering::Relaxed) {
            return;
        }
        let mut used = HashSet::new();
        let mut partial = Vec::with_capacity(slots.len());
        let mut assignment = HashMap::new();
        let mut team_counts: HashMap<TeamCode, usize> = HashMap::new();
        let mut game_counts: HashMap<String, usize> = HashMap::new();

        used.insert(first_player.id.clone());
        partial.push(first_player.clone());
        assignment.insert(first_player.id.clone(), slots[0].name.clone());
        bump_counts(first_player, &mut team_counts, &mut game_counts);

        search(
            1,
            first_player.salary_used(contest_platform(contest)),
            &mut used,
            &mut partial,
            &mut assignment,
            &mut team_counts,
            &mut game_counts,
            &ctx,
            &shared,
        );

        partial.pop();
    });

    let mut scored = shared.candidates.into_inner().unwrap();
    sort_candidates(&mut scored);
    scored.truncate(emit_cap);
    let candidates = scored.into_iter().map(|(_, lineup)| lineup).collect();

    GenerationResult {
        candidates,
        valid_combinations: shared.valid_combinations.load(Ordering::Relaxed),
        mode,
        cancelled: shared.cancelled.load(Ordering::Relaxed),
    }
}

fn contest_platform(contest: &Contest) -> Platform {
    contest.platform
}

trait SalaryExt {
    fn salary_used(&self, platform: Platform) -> u32;
}
impl SalaryExt for Player {
    fn salary_used(&self, platform: Platform) -> u32 {
        player_index::salary(self, platform)
    }
}

fn bump_counts(p: &Player, team_counts: &mut HashMap<TeamCode, usize>, game_counts: &mut HashMap<String, usize>) {
    let team = p.team_or_empty();
    if !team.is_empty() {
        *team_counts.entry(team).or_insert(0) += 1;
    }
    if let Some(key) = p.game_key() {
        *game_counts.entry(key).or_insert(0) += 1;
    }
}

fn unbump_counts(p: &Player, team_counts: &mut HashMap<TeamCode, usize>, game_counts: &mut HashMap<String, usize>) {
    let team = p.team_or_empty();
    if !team.is_empty() {
        if let Some(c) = team_counts.get_mut(&team) {
            *c -= 1;
            if *c == 0 {
                team_counts.remove(&team);
            }
        }
    }
    if let Some(key) = p.game_key() {
        if let Some(c) = game_counts.get_mut(&key) {
            *c -= 1;
            if *c == 0 {
                game_counts.remove(&key);
            }
        }
    }
}

/// Candidates considered for the top-level (slot 0) branching factor:
/// locked players eligible for slot 0 first (guaranteeing they are
/// tried, per spec §4.5's locked-player handling), then the
/// value-sorted remainder up to `limit`.
fn top_level_candidates(
    slot: &Slot,
    buckets: &HashMap<crate::model::Position, Vec<Player>>,
    config: &OptimizeConfig,
    limit: usize,
) -> Vec<Player> {
    candidates_for_slot(slot, buckets, config, &HashSet::new(), limit, false)
}

fn candidates_for_slot(
    slot: &Slot,
    buckets: &HashMap<crate::model::Position, Vec<Player>>,
    config: &OptimizeConfig,
    used: &HashSet<PlayerId>,
    limit: usize,
    breadth_limited: bool,
) -> Vec<Player> {
    let mut locked_first = Vec::new();
    let mut rest = Vec::new();

    for position in &slot.allowed_positions {
        let Some(bucket) = buckets.get(position) else { continue };
        let mut taken = 0usize;
        for p in bucket {
            if used.contains(&p.id) {
                continue;
            }
            if config.locked_players.contains(&p.id) {
                locked_first.push(p.clone());
                continue;
            }
            if breadth_limited && taken >= limit {
                break;
            }
            rest.push(p.clone());
            taken += 1;
        }
    }

    locked_first.sort_by(|a, b| a.id.0.cmp(&b.id.0));
    rest.sort_by(|a, b| a.id.0.cmp(&b.id.0));
    locked_first.extend(rest);
    if !breadth_limited {
        locked_first.truncate(limit.max(locked_first.len()));
    }
    locked_first
}

#[allow(clippy::too_many_arguments)]
fn search(
    slot_idx: usize,
    salary_used: u32,
    used: &mut HashSet<PlayerId>,
    partial: &mut Vec<Player>,
    assignment: &mut HashMap<PlayerId, String>,
    team_counts: &mut HashMap<TeamCode, usize>,
    game_counts: &mut HashMap<String, usize>,
    ctx: &SearchCtx,
    shared: &SharedState,
) {
    if shared.cancelled.load(Ordering::Relaxed) {
        return;
    }
    if let Some(deadline) = &ctx.deadline {
        if deadline.is_expired() {
            shared.cancelled.store(true, Ordering::Relaxed);
            return;
        }
    }

    if slot_idx == ctx.slots.len() {
        try_emit_leaf(salary_used, partial, assignment, ctx, shared);
        return;
    }

    let platform = contest_platform(ctx.contest);

    let slot = &ctx.slots[slot_idx];
    // Every slot past the top level is breadth-limited unconditionally
    // (not contingent on whether a feasible leaf has been found yet) so
    // which candidates get explored never depends on rayon's scheduling
    // across the top-level fan-out (spec §8's idempotence property).
    let candidates = candidates_for_slot(slot, ctx.buckets, ctx.config, used, BREADTH_LIMIT, true);

    if ctx.mode == SearchMode::Dp && ctx.config.num_lineups == 1 {
        let remaining_budget = ctx.config.salary_cap.saturating_sub(salary_used);
        let bound = upper_bound(slot_idx, remaining_budget, ctx);
        let current_score: f64 = partial.iter().map(|p| p.projected_or_zero()).sum();
        let best = *shared.best_score_seen.lock().unwrap();
        if current_score + bound <= best {
            return;
        }

        let key = MemoKey {
            slot_idx,
            salary_bucket: salary_used / SALARY_BUCKET,
            used_count: used.len(),
        };
        let mut memo = shared.memo.lock().unwrap();
        if let Some(&seen_score) = memo.get(&key) {
            if seen_score >= current_score {
                return;
            }
        }
        memo.put(key, current_score);
    }

    for candidate in &candidates {
        if shared.cancelled.load(Ordering::Relaxed) {
            return;
        }
        if used.contains(&candidate.id) {
            continue;
        }
        let candidate_salary = candidate.salary_used(platform);
        if salary_used.saturating_add(candidate_salary) > ctx.config.salary_cap {
            continue;
        }

        used.insert(candidate.id.clone());
        partial.push(candidate.clone());
        assignment.insert(candidate.id.clone(), slot.name.clone());
        bump_counts(candidate, team_counts, game_counts);

        search(
            slot_idx + 1,
            salary_used + candidate_salary,
            used,
            partial,
            assignment,
            team_counts,
            game_counts,
            ctx,
            shared,
        );

        unbump_counts(candidate, team_counts, game_counts);
        assignment.remove(&candidate.id);
        partial.pop();
        used.remove(&candidate.id);
    }
}

fn try_emit_leaf(
    salary_used: u32,
    partial: &[Player],
    assignment: &HashMap<PlayerId, String>,
    ctx: &SearchCtx,
    shared: &SharedState,
) {
    let cap = ctx.config.salary_cap;
    let floor = (cap as f64 * 0.95).ceil() as u32;
    if salary_used < floor || salary_used > cap {
        return;
    }

    for locked in &ctx.config.locked_players {
        if !assignment.contains_key(locked) {
            return;
        }
    }

    if !validate_stacking(partial, &ctx.config.stacking_rules) {
        return;
    }

    shared.valid_combinations.fetch_add(1, Ordering::Relaxed);

    let base: f64 = partial.iter().map(|p| p.projected_or_zero()).sum();
    let correlation_bonus = if ctx.config.use_correlations {
        ctx.correlation.lineup_average(partial) * ctx.config.correlation_weight * partial.len() as f64
    } else {
        0.0
    };
    // Stored `projected_points` is the raw-points view used for display
    // and downstream exposure math — the correlation bonus is folded in
    // here exactly once and never re-applied by C6/C7 (spec §9).
    let score = base + correlation_bonus;

    let rank_score = total_rank_score(partial, ctx);

    {
        // Tracked in raw-points units to stay comparable with
        // `upper_bound`'s projection-based estimate.
        let mut best = shared.best_score_seen.lock().unwrap();
        if score > *best {
            *best = score;
        }
    }

    let lineup = Lineup {
        players: partial.to_vec(),
        total_salary: salary_used,
        projected_points: score,
        slot_assignment: assignment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };

    let mut candidates = shared.candidates.lock().unwrap();
    if candidates.len() < ctx.emit_cap {
        candidates.push((rank_score, lineup));
    }
}

/// Sum of each player's strategy-weighted score (spec §4.4), used only
/// to rank and select among completed lineups — distinct from the
/// stored `projected_points`, which is always a raw-points figure.
fn total_rank_score(players: &[Player], ctx: &SearchCtx) -> f64 {
    let platform = contest_platform(ctx.contest);
    let mut sum = 0.0;
    for (i, p) in players.iter().enumerate() {
        let others: Vec<Player> = players
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, pl)| pl.clone())
            .collect();
        sum += score_player(p, &others, ctx.strategy, ctx.correlation, ctx.config, platform);
    }
    sum
}

/// Stacking-rule validation on a completed lineup (spec §4.5).
pub fn validate_stacking(players: &[Player], rules: &[crate::model::StackingRule]) -> bool {
    let mut team_counts: HashMap<TeamCode, usize> = HashMap::new();
    let mut game_counts: HashMap<String, usize> = HashMap::new();
    for p in players {
        let team = p.team_or_empty();
        if !team.is_empty() {
            *team_counts.entry(team).or_insert(0) += 1;
        }
        if let Some(key) = p.game_key() {
            *game_counts.entry(key).or_insert(0) += 1;
        }
    }

    for rule in rules {
        match rule.rule_type {
            StackingRuleType::Team => {
                if rule.applies_to_all() {
                    for count in team_counts.values() {
                        if *count < rule.min_players || *count > rule.max_players {
                            return false;
                        }
                    }
                } else {
                    for team in &rule.teams {
                        let count = team_counts.get(team).copied().unwrap_or(0);
                        if count < rule.min_players || count > rule.max_players {
                            return false;
                        }
                    }
                }
            }
            StackingRuleType::Game => {
                for count in game_counts.values() {
                    if *count < rule.min_players || *count > rule.max_players {
                        return false;
                    }
                }
            }
        }
    }
    true
}

fn sort_candidates(candidates: &mut [(f64, Lineup)]) {
    candidates.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .partial_cmp(score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| lineup_id_key(a).cmp(&lineup_id_key(b)))
    });
}

/// Stable, id-lexicographic tie-break key (spec §9 — random tie-breaking forbidden).
fn lineup_id_key(lineup: &Lineup) -> String {
    let mut ids: Vec<&str> = lineup.players.iter().map(|p| p.id.as_str()).collect();
    ids.sort();
    ids.join(",")
}

fn upper_bound(slot_idx: usize, remaining_budget: u32, ctx: &SearchCtx) -> f64 {
    let remaining_slots = ctx.slots.len().saturating_sub(slot_idx);
    if remaining_slots == 0 {
        return 0.0;
    }
    let per_slot_budget = remaining_budget as f64 / remaining_slots as f64;
    ctx.best_per_position[slot_idx.min(ctx.best_per_position.len().saturating_sub(1))]
        .values()
        .cloned()
        .fold(0.0, f64::max)
        * (per_slot_budget / 1000.0).max(0.0)
}

/// Best remaining per-position projection, per slot index, used by the
/// upper-bound pruning heuristic (spec §4.5).
fn precompute_best_remaining(
    slots: &[Slot],
    buckets: &HashMap<Position, Vec<Player>>,
) -> Vec<HashMap<Position, f64>> {
    let mut best_from_end = HashMap::new();
    let mut out = vec![HashMap::new(); slots.len()];

    for (idx, slot) in slots.iter().enumerate().rev() {
        for position in &slot.allowed_positions {
            let best = buckets
                .get(position)
                .and_then(|b| b.first())
                .map(|p| p.projected_or_zero())
                .unwrap_or(0.0);
            let entry = best_from_end.entry(position.clone()).or_insert(0.0);
            if best > *entry {
                *entry = best;
            }
        }
        out[idx] = best_from_end.clone();
    }
    out
}
