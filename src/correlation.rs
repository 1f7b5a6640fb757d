//! C3 — Correlation Matrix (spec §4.3).
//!
//! Computed once per request from the filtered pool. Rules are applied
//! additively, then clipped to `[-1, 1]` (golf: `[-0.3, 0.6]`).

use crate::ids::PlayerId;
use crate::model::{Player, Sport};
use std::collections::HashMap;

type Pair = (PlayerId, PlayerId);

/// Symmetric `(player_id, player_id) -> r` map. Self-correlation is 1.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMatrix {
    r: HashMap<Pair, f64>,
    teammates: HashMap<PlayerId, Vec<PlayerId>>,
}

fn ordered_pair(a: &PlayerId, b: &PlayerId) -> Pair {
    if a.0 <= b.0 {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Position-pair teammate correlation table, per sport (spec §4.3).
/// Symmetric lookup: order of the two positions does not matter.
fn teammate_bonus(sport: &Sport, pos_a: &str, pos_b: &str) -> f64 {
    let (a, b) = if pos_a <= pos_b {
        (pos_a, pos_b)
    } else {
        (pos_b, pos_a)
    };
    match sport.0.as_str() {
        "nba" => match (a, b) {
            ("PG", "SG") => 0.35,
            ("C", "PG") => 0.30,
            ("C", "PF") => 0.35,
            _ => 0.20,
        },
        "nfl" => match (a, b) {
            ("QB", "WR") => 0.50,
            ("QB", "TE") => 0.40,
            ("RB", "RB") => -0.30,
            ("DST", "QB") => -0.20,
            _ => 0.0,
        },
        "mlb" => match (a, b) {
            ("P", "P") => -0.50,
            _ if a == "P" || b == "P" => 0.0,
            _ => 0.25,
        },
        "nhl" => match (a, b) {
            ("C", "W") => 0.45,
            ("D", "G") => 0.35,
            _ => 0.15,
        },
        _ => 0.0,
    }
}

/// Opponent-pair correlation, per sport (spec §4.3).
fn opponent_bonus(sport: &Sport, pos_a: &str, pos_b: &str) -> f64 {
    let (a, b) = if pos_a <= pos_b {
        (pos_a, pos_b)
    } else {
        (pos_b, pos_a)
    };
    match sport.0.as_str() {
        "nfl" => match (a, b) {
            ("QB", "TE") | ("QB", "WR") => 0.25,
            ("DST", "RB") => -0.30,
            _ => 0.0,
        },
        "mlb" if a == "P" || b == "P" => -0.25,
        "nhl" if a == "G" || b == "G" => -0.20,
        _ => 0.0,
    }
}

fn golf_bonus(a: &Player, b: &Player) -> f64 {
    let mut bonus = 0.0;
    if a.team_or_empty() == b.team_or_empty() && !a.team_or_empty().is_empty() {
        bonus += 0.10;
    }
    bonus
}

fn clip(sport: &Sport, r: f64) -> f64 {
    if sport.0 == "golf" {
        r.clamp(-0.3, 0.6)
    } else {
        r.clamp(-1.0, 1.0)
    }
}

impl CorrelationMatrix {
    /// Derive the correlation matrix for `pool` under `sport`'s rules
    /// (spec §4.3). Also records the teammate adjacency used by
    /// `teammates_of`.
    pub fn build(pool: &[Player], sport: &Sport) -> Self {
        let mut m = CorrelationMatrix::default();
        for p in pool {
            m.r.insert((p.id.clone(), p.id.clone()), 1.0);
        }

        for i in 0..pool.len() {
            for j in (i + 1)..pool.len() {
                let a = &pool[i];
                let b = &pool[j];
                let mut r = 0.0;

                let same_team = !a.team_or_empty().is_empty() && a.team_or_empty() == b.team_or_empty();
                let game_match = a.game_key().is_some() && a.game_key() == b.game_key();

                if sport.0 == "golf" {
                    r += golf_bonus(a, b);
                } else if same_team {
                    r += teammate_bonus(sport, &a.position.0, &b.position.0);
                    m.teammates.entry(a.id.clone()).or_default().push(b.id.clone());
                    m.teammates.entry(b.id.clone()).or_default().push(a.id.clone());
                } else if game_match {
                    r += opponent_bonus(sport, &a.position.0, &b.position.0);
                }

                let r = clip(sport, r);
                if r != 0.0 {
                    m.r.insert(ordered_pair(&a.id, &b.id), r);
                }
            }
        }
        m
    }

    /// Correlation between two players; 1.0 on the diagonal, 0.0 when
    /// no rule produced a nonzero entry.
    pub fn get(&self, a: &PlayerId, b: &PlayerId) -> f64 {
        if a == b {
            return 1.0;
        }
        self.r.get(&ordered_pair(a, b)).copied().unwrap_or(0.0)
    }

    /// Average pairwise correlation across all distinct pairs in `lineup`.
    pub fn lineup_average(&self, lineup: &[Player]) -> f64 {
        if lineup.len() < 2 {
            return 0.0;
        }
        let mut sum = 0.0;
        let mut n = 0usize;
        for i in 0..lineup.len() {
            for j in (i + 1)..lineup.len() {
                sum += self.get(&lineup[i].id, &lineup[j].id);
                n += 1;
            }
        }
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    pub fn teammates_of(&self, id: &PlayerId) -> &[PlayerId] {
        self.teammates.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Ids correlated with `id` above `threshold`.
    pub fn stronger_than(&self, id: &PlayerId, threshold: f64) -> Vec<PlayerId> {
        self.r
            .iter()
            .filter_map(|((a, b), &r)| {
                if r <= threshold {
                    return None;
                }
                if a == id {
                    Some(b.clone())
                } else if b == id {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect()
    }
}
