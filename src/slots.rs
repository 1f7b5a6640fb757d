//! C1 — Slot Catalog (spec §4.1).
//!
//! A pure, process-wide lookup from `(sport, platform)` to an ordered
//! roster grammar. Built once via `once_cell::sync::Lazy` — a read-only
//! table initialized lazily and shared across every `optimize()` call
//! (spec §5).

use crate::model::{Platform, Slot, Sport};
use once_cell::sync::Lazy;
use std::collections::HashMap;

type CatalogKey = (String, Platform);

static CATALOG: Lazy<HashMap<CatalogKey, Vec<Slot>>> = Lazy::new(build_catalog);

fn flex(name: &str, allowed: &[&str], priority: i32) -> Slot {
    Slot::new(name, allowed, priority)
}

fn build_catalog() -> HashMap<CatalogKey, Vec<Slot>> {
    let mut m = HashMap::new();

    m.insert(
        ("nba".to_string(), Platform::Draftkings),
        vec![
            flex("PG", &["PG"], 0),
            flex("SG", &["SG"], 1),
            flex("SF", &["SF"], 2),
            flex("PF", &["PF"], 3),
            flex("C", &["C"], 4),
            flex("G", &["PG", "SG"], 5),
            flex("F", &["SF", "PF"], 6),
            flex("UTIL", &["PG", "SG", "SF", "PF", "C"], 7),
        ],
    );

    m.insert(
        ("nba".to_string(), Platform::Fanduel),
        vec![
            flex("PG", &["PG"], 0),
            flex("PG", &["PG"], 1),
            flex("SG", &["SG"], 2),
            flex("SG", &["SG"], 3),
            flex("SF", &["SF"], 4),
            flex("SF", &["SF"], 5),
            flex("PF", &["PF"], 6),
            flex("PF", &["PF"], 7),
            flex("C", &["C"], 8),
        ],
    );

    for platform in [Platform::Draftkings, Platform::Fanduel] {
        m.insert(
            ("nfl".to_string(), platform),
            vec![
                flex("QB", &["QB"], 0),
                flex("RB", &["RB"], 1),
                flex("RB", &["RB"], 2),
                flex("WR", &["WR"], 3),
                flex("WR", &["WR"], 4),
                flex("WR", &["WR"], 5),
                flex("TE", &["TE"], 6),
                flex("FLEX", &["RB", "WR", "TE"], 7),
                flex("DST", &["DST"], 8),
            ],
        );
    }

    m.insert(
        ("mlb".to_string(), Platform::Draftkings),
        vec![
            flex("P", &["P"], 0),
            flex("P", &["P"], 1),
            flex("C", &["C"], 2),
            flex("1B", &["1B"], 3),
            flex("2B", &["2B"], 4),
            flex("3B", &["3B"], 5),
            flex("SS", &["SS"], 6),
            flex("OF", &["OF"], 7),
            flex("OF", &["OF"], 8),
            flex("OF", &["OF"], 9),
        ],
    );

    m.insert(
        ("mlb".to_string(), Platform::Fanduel),
        vec![
            flex("P", &["P"], 0),
            flex("C", &["C"], 1),
            flex("1B", &["1B"], 2),
            flex("2B", &["2B"], 3),
            flex("3B", &["3B"], 4),
            flex("SS", &["SS"], 5),
            flex("OF", &["OF"], 6),
            flex("OF", &["OF"], 7),
            flex("OF", &["OF"], 8),
        ],
    );

    for platform in [Platform::Draftkings, Platform::Fanduel] {
        m.insert(
            ("nhl".to_string(), platform),
            vec![
                flex("C", &["C"], 0),
                flex("C", &["C"], 1),
                flex("W", &["W", "LW", "RW"], 2),
                flex("W", &["W", "LW", "RW"], 3),
                flex("W", &["W", "LW", "RW"], 4),
                flex("D", &["D"], 5),
                flex("D", &["D"], 6),
                flex("G", &["G"], 7),
                flex("UTIL", &["C", "W", "LW", "RW", "D"], 8),
            ],
        );
    }

    for platform in [Platform::Draftkings, Platform::Fanduel] {
        m.insert(
            ("golf".to_string(), platform),
            (0..6).map(|i| flex("G", &["G"], i)).collect(),
        );
    }

    m
}

/// Look up the ordered roster grammar for `(sport, platform)`.
///
/// Returns an empty slice for an unsupported combination; the
/// orchestrator turns that into an `InvalidContest` error (spec §4.1).
pub fn get_position_slots(sport: &Sport, platform: Platform) -> &'static [Slot] {
    CATALOG
        .get(&(sport.0.clone(), platform))
        .map(|v| v.as_slice())
        .unwrap_or(&[])
}

/// Membership test: does `player` fill `slot`? (spec §4.1)
pub fn can_player_fill_slot(player: &crate::model::Player, slot: &Slot) -> bool {
    slot.can_fill(player)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Player;

    #[test]
    fn nba_draftkings_has_eight_slots_in_priority_order() {
        let slots = get_position_slots(&Sport::new("nba"), Platform::Draftkings);
        assert_eq!(slots.len(), 8);
        for w in slots.windows(2) {
            assert!(w[0].priority < w[1].priority);
        }
        assert_eq!(slots[7].name, "UTIL");
        assert!(slots[7].is_flex());
    }

    #[test]
    fn nfl_draftkings_flex_allows_rb_wr_te() {
        let slots = get_position_slots(&Sport::new("nfl"), Platform::Draftkings);
        let flex = slots.iter().find(|s| s.name == "FLEX").unwrap();
        for pos in ["RB", "WR", "TE"] {
            assert!(flex.allowed_positions.contains(&crate::model::Position::new(pos)));
        }
        assert!(!flex.allowed_positions.contains(&crate::model::Position::new("QB")));
    }

    #[test]
    fn golf_has_six_identical_slots() {
        let slots = get_position_slots(&Sport::new("golf"), Platform::Draftkings);
        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|s| s.name == "G"));
    }

    #[test]
    fn unknown_sport_platform_returns_empty() {
        let slots = get_position_slots(&Sport::new("curling"), Platform::Draftkings);
        assert!(slots.is_empty());
    }

    #[test]
    fn can_player_fill_slot_checks_position_membership() {
        let slots = get_position_slots(&Sport::new("nba"), Platform::Draftkings);
        let pg_slot = &slots[0];
        let player = Player {
            id: "p1".into(),
            name: "Player One".into(),
            team: None,
            opponent: None,
            position: crate::model::Position::new("PG"),
            salary_dk: Some(5000),
            salary_fd: None,
            projected_points: Some(20.0),
            floor_points: None,
            ceiling_points: None,
            ownership_dk: None,
            ownership_fd: None,
            is_injured: None,
            injury_status: None,
        };
        assert!(can_player_fill_slot(&player, pg_slot));
    }
}
