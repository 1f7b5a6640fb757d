//! Black-box scenario and property tests for `orchestrator::optimize`.

use dfs_lineup_optimizer::error::OptimizerError;
use dfs_lineup_optimizer::ids::TeamCode;
use dfs_lineup_optimizer::model::{Contest, OptimizeConfig, Platform, Player, Position, Sport};
use dfs_lineup_optimizer::orchestrator::optimize;

fn player(id: &str, pos: &str, team: &str, salary: u32, proj: f64) -> Player {
    Player {
        id: id.into(),
        name: id.to_string(),
        team: Some(TeamCode::from(team)),
        opponent: Some(TeamCode::from("OPP")),
        position: Position::new(pos),
        salary_dk: Some(salary),
        salary_fd: Some(salary),
        projected_points: Some(proj),
        floor_points: None,
        ceiling_points: None,
        ownership_dk: None,
        ownership_fd: None,
        is_injured: None,
        injury_status: None,
    }
}

fn nba_contest(salary_cap: u32) -> Contest {
    Contest {
        platform: Platform::Draftkings,
        sport: Sport::new("nba"),
        salary_cap,
        contest_type: None,
    }
}

/// S1 — NBA DK, single lineup, value-dominant strategy.
#[test]
fn s1_nba_single_lineup_fills_every_slot_within_cap() {
    let contest = nba_contest(50_000);
    let mut pool = Vec::new();
    for pos in ["PG", "SG", "SF", "PF", "C"] {
        for i in 0..3 {
            pool.push(player(&format!("{pos}{i}"), pos, &format!("T{i}"), 6000, 30.0));
        }
    }
    let config = OptimizeConfig::new(50_000, 1);

    let result = optimize(&pool, &contest, &config, None).unwrap();
    assert_eq!(result.lineups.len(), 1);
    let lineup = &result.lineups[0];
    assert_eq!(lineup.slots.len(), 8);
    assert!(lineup.total_salary >= 47_500 && lineup.total_salary <= 50_000);
    let ids: std::collections::HashSet<_> = lineup.slots.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.len(), 8, "no duplicate players in a lineup");
}

/// S2 — infeasibility via missing positions.
#[test]
fn s2_pool_missing_required_positions_is_infeasible() {
    let contest = nba_contest(50_000);
    let mut pool = Vec::new();
    for i in 0..6 {
        let pos = if i % 2 == 0 { "PG" } else { "SG" };
        pool.push(player(&format!("p{i}"), pos, "BOS", 5000, 25.0));
    }
    let config = OptimizeConfig::new(50_000, 1);

    let err = optimize(&pool, &contest, &config, None).unwrap_err();
    assert!(matches!(err, OptimizerError::Infeasible { .. }));
}

/// S3 — golf, 6 slots, 8 golfers.
#[test]
fn s3_golf_lineup_has_six_distinct_golfers_under_cap() {
    let contest = Contest {
        platform: Platform::Draftkings,
        sport: Sport::new("golf"),
        salary_cap: 50_000,
        contest_type: None,
    };
    let pool: Vec<Player> = (0..8)
        .map(|i| player(&format!("g{i}"), "G", &format!("T{i}"), 8000, 60.0 - i as f64))
        .collect();
    let config = OptimizeConfig::new(50_000, 1);

    let result = optimize(&pool, &contest, &config, None).unwrap();
    assert_eq!(result.lineups.len(), 1);
    let lineup = &result.lineups[0];
    assert_eq!(lineup.slots.len(), 6);
    assert!(lineup.slots.iter().all(|s| s.position == Position::new("G")));
    assert!(lineup.total_salary <= 50_000);
    let ids: std::collections::HashSet<_> = lineup.slots.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.len(), 6);
}

/// S4 — NFL DK with a team stacking rule on the QB's team.
#[test]
fn s4_team_stacking_rule_keeps_two_to_three_team_a_players() {
    use dfs_lineup_optimizer::model::{StackingRule, StackingRuleType};

    let contest = Contest {
        platform: Platform::Draftkings,
        sport: Sport::new("nfl"),
        salary_cap: 50_000,
        contest_type: None,
    };
    let mut pool = vec![player("qb_a", "QB", "TEAM_A", 7000, 25.0)];
    for (i, proj) in [18.0, 17.0].into_iter().enumerate() {
        pool.push(player(&format!("wr_a{i}"), "WR", "TEAM_A", 6000, proj));
    }
    for (i, proj) in [16.0, 15.0, 14.0].into_iter().enumerate() {
        pool.push(player(&format!("wr_b{i}"), "WR", "TEAM_B", 6000, proj));
    }
    for i in 0..3 {
        pool.push(player(&format!("rb{i}"), "RB", "TEAM_B", 5500, 16.0 - i as f64));
    }
    pool.push(player("te", "TE", "TEAM_B", 5000, 12.0));
    pool.push(player("dst", "DST", "TEAM_B", 3000, 8.0));

    let mut config = OptimizeConfig::new(50_000, 5);
    config.stacking_rules.push(StackingRule {
        rule_type: StackingRuleType::Team,
        min_players: 2,
        max_players: 3,
        teams: vec![TeamCode::from("TEAM_A")],
    });

    let result = optimize(&pool, &contest, &config, None).unwrap();
    assert!(!result.lineups.is_empty());
    for lineup in &result.lineups {
        let team_a_count = lineup
            .slots
            .iter()
            .filter(|s| s.team == TeamCode::from("TEAM_A"))
            .count();
        assert!(team_a_count >= 2 && team_a_count <= 3);
    }
}

/// S5 — exposure cap on a star player across a multi-lineup request.
#[test]
fn s5_max_exposure_bounds_how_often_a_star_appears() {
    let contest = nba_contest(50_000);
    let mut pool = vec![player("star", "PG", "BOS", 9000, 55.0)];
    for pos in ["PG", "SG", "SF", "PF", "C"] {
        for i in 0..6 {
            pool.push(player(&format!("{pos}_{i}"), pos, &format!("T{i}"), 5500, 22.0));
        }
    }

    let mut config = OptimizeConfig::new(50_000, 10);
    config.min_different_players = 1;
    config.max_exposure.insert("star".into(), 0.3);

    let result = optimize(&pool, &contest, &config, None).unwrap();
    let star_count = result
        .lineups
        .iter()
        .filter(|l| l.slots.iter().any(|s| s.id.as_str() == "star"))
        .count();
    // 0.3 of a 10-lineup target caps the star at 3 appearances.
    assert!(star_count <= 3);
}

/// S6 — locking and excluding the same player is a pre-flight conflict.
#[test]
fn s6_locked_and_excluded_collision_fails_before_search() {
    let contest = nba_contest(50_000);
    let mut config = OptimizeConfig::new(50_000, 1);
    config.locked_players.insert("x".into());
    config.excluded_players.insert("x".into());

    let err = optimize(&[], &contest, &config, None).unwrap_err();
    assert!(matches!(err, OptimizerError::Conflict(_)));
}

fn idempotence_pool() -> Vec<Player> {
    let mut pool = Vec::new();
    for pos in ["PG", "SG", "SF", "PF", "C"] {
        for i in 0..4 {
            pool.push(player(&format!("{pos}{i}"), pos, &format!("T{i}"), 6000 + i as u32 * 50, 28.0 + i as f64));
        }
    }
    pool
}

/// Running `optimize` twice on the same input yields identical lineup id sets.
#[test]
fn repeated_runs_on_the_same_input_produce_the_same_lineup_ids() {
    let contest = nba_contest(50_000);
    let config = OptimizeConfig::new(50_000, 3);
    let pool = idempotence_pool();

    let r1 = optimize(&pool, &contest, &config, None).unwrap();
    let r2 = optimize(&pool, &contest, &config, None).unwrap();

    let ids1: Vec<_> = r1.lineups.iter().map(|l| l.id.as_str().to_string()).collect();
    let ids2: Vec<_> = r2.lineups.iter().map(|l| l.id.as_str().to_string()).collect();
    assert_eq!(ids1, ids2);
}

/// Reversing the input player list does not change the final lineup set.
#[test]
fn reversing_pool_order_does_not_change_the_final_lineup_set() {
    let contest = nba_contest(50_000);
    let config = OptimizeConfig::new(50_000, 3);
    let pool = idempotence_pool();
    let mut reversed = pool.clone();
    reversed.reverse();

    let forward = optimize(&pool, &contest, &config, None).unwrap();
    let backward = optimize(&reversed, &contest, &config, None).unwrap();

    let mut forward_sets: Vec<Vec<&str>> = forward
        .lineups
        .iter()
        .map(|l| {
            let mut ids: Vec<&str> = l.slots.iter().map(|s| s.id.as_str()).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    let mut backward_sets: Vec<Vec<&str>> = backward
        .lineups
        .iter()
        .map(|l| {
            let mut ids: Vec<&str> = l.slots.iter().map(|s| s.id.as_str()).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    forward_sets.sort();
    backward_sets.sort();
    assert_eq!(forward_sets, backward_sets);
}

/// Changing only the strategy tag must keep the same feasible set, though
/// ranking may differ.
#[test]
fn strategy_change_alone_keeps_the_same_feasible_lineup_set() {
    use dfs_lineup_optimizer::model::Strategy;

    let contest = nba_contest(50_000);
    let pool = idempotence_pool();

    let mut value_config = OptimizeConfig::new(50_000, 3);
    value_config.strategy = Some(Strategy::Value);
    let mut ceiling_config = OptimizeConfig::new(50_000, 3);
    ceiling_config.strategy = Some(Strategy::MaxCeiling);

    let value_result = optimize(&pool, &contest, &value_config, None).unwrap();
    let ceiling_result = optimize(&pool, &contest, &ceiling_config, None).unwrap();

    let mut value_sets: Vec<Vec<&str>> = value_result
        .lineups
        .iter()
        .map(|l| {
            let mut ids: Vec<&str> = l.slots.iter().map(|s| s.id.as_str()).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    let mut ceiling_sets: Vec<Vec<&str>> = ceiling_result
        .lineups
        .iter()
        .map(|l| {
            let mut ids: Vec<&str> = l.slots.iter().map(|s| s.id.as_str()).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    value_sets.sort();
    ceiling_sets.sort();
    assert_eq!(value_sets, ceiling_sets);
}
