//! Integration tests for round pairing: balance, validity, repeat avoidance, byes.

use rotation_tournament::{generate_round, CourtSet, Player, Team, TournamentError};
use std::collections::HashSet;

fn player(id: &str, rating: i32) -> Player {
    Player::new(id, id).with_rating(rating)
}

fn courts(n: usize) -> Vec<String> {
    (1..=n).map(|c| c.to_string()).collect()
}

fn team_ids(team: &Team) -> HashSet<&str> {
    team.player_ids.iter().map(String::as_str).collect()
}

fn set_between(round: u32, a: (&str, &str), b: (&str, &str)) -> CourtSet {
    CourtSet::new(
        round,
        "1",
        Team::new(a.0.to_string(), a.1.to_string()),
        Team::new(b.0.to_string(), b.1.to_string()),
    )
}

#[test]
fn first_round_pairs_strongest_with_weakest() {
    let players = vec![player("a", 2000), player("c", 1200), player("d", 1000), player("b", 1800)];
    let plan = generate_round(&players, &courts(1), &[], 1).unwrap();

    assert_eq!(plan.sets.len(), 1);
    assert!(plan.byes.is_empty());
    let set = &plan.sets[0];
    assert_eq!(set.round_number, 1);
    assert_eq!(set.court_number, "1");
    assert_eq!(team_ids(&set.teams[0]), HashSet::from(["a", "d"]));
    assert_eq!(team_ids(&set.teams[1]), HashSet::from(["b", "c"]));
    assert!(!set.is_completed);
}

#[test]
fn every_player_appears_at_most_once_and_teams_have_two_distinct_members() {
    for n in 4..=21 {
        let players: Vec<Player> = (0..n)
            .map(|i| player(&format!("p{i:02}"), 900 + ((i * 37) % 13) as i32 * 25))
            .collect();
        let history = vec![set_between(1, ("p00", "p01"), ("p02", "p03"))];
        let plan = generate_round(&players, &courts(n / 4), &history, 2).unwrap();

        let mut seen = HashSet::new();
        for set in &plan.sets {
            for team in &set.teams {
                assert_ne!(team.player_ids[0], team.player_ids[1], "n = {n}");
            }
            for pid in set.player_ids() {
                assert!(seen.insert(pid.clone()), "{pid} placed twice for n = {n}");
            }
        }
        for pid in &plan.byes {
            assert!(seen.insert(pid.clone()), "{pid} both playing and sitting out for n = {n}");
        }
        assert_eq!(seen.len(), n, "everyone is either on a court or sitting out (n = {n})");
        assert_eq!(plan.sets.len(), n / 4);
    }
}

#[test]
fn equal_ratings_are_ordered_by_player_id() {
    let players = vec![player("d", 1000), player("b", 1000), player("a", 1000), player("c", 1000)];
    let first = generate_round(&players, &courts(1), &[], 1).unwrap();
    let again = generate_round(&players, &courts(1), &[], 1).unwrap();

    assert_eq!(first.sets[0].teams[0].player_ids, ["a".to_string(), "d".to_string()]);
    assert_eq!(first.sets[0].teams[1].player_ids, ["b".to_string(), "c".to_string()]);
    assert_eq!(first.sets[0].teams[0].player_ids, again.sets[0].teams[0].player_ids);
}

#[test]
fn repeated_partnership_is_swapped_when_an_alternative_exists() {
    let players = vec![player("a", 2000), player("b", 1800), player("c", 1200), player("d", 1000)];
    let history = vec![set_between(1, ("a", "d"), ("b", "c"))];
    let plan = generate_round(&players, &courts(1), &history, 2).unwrap();

    let set = &plan.sets[0];
    assert_eq!(team_ids(&set.teams[0]), HashSet::from(["a", "c"]));
    assert_eq!(team_ids(&set.teams[1]), HashSet::from(["b", "d"]));
    assert_eq!(set.round_number, 2);
}

#[test]
fn repeat_avoidance_gives_up_when_every_partnership_was_played() {
    let players = vec![player("a", 2000), player("b", 1800), player("c", 1200), player("d", 1000)];
    let history = vec![
        set_between(1, ("a", "d"), ("b", "c")),
        set_between(2, ("a", "c"), ("b", "d")),
    ];
    let plan = generate_round(&players, &courts(1), &history, 3).unwrap();

    assert_eq!(plan.sets.len(), 1);
    for team in &plan.sets[0].teams {
        assert_eq!(team_ids(team).len(), 2);
    }
}

#[test]
fn odd_roster_leaves_the_middle_player_out() {
    let players = vec![player("p1", 1500), player("p2", 1400), player("p3", 1300), player("p4", 1200), player("p5", 1100)];
    let plan = generate_round(&players, &courts(1), &[], 1).unwrap();

    assert_eq!(plan.byes, vec!["p3".to_string()]);
    assert_eq!(team_ids(&plan.sets[0].teams[0]), HashSet::from(["p1", "p5"]));
    assert_eq!(team_ids(&plan.sets[0].teams[1]), HashSet::from(["p2", "p4"]));
}

#[test]
fn leftover_pair_sits_out() {
    let players: Vec<Player> = (1..=6).map(|i| player(&format!("p{i}"), 2000 - i * 100)).collect();
    let plan = generate_round(&players, &courts(2), &[], 1).unwrap();

    assert_eq!(plan.sets.len(), 1);
    assert_eq!(plan.byes, vec!["p3".to_string(), "p4".to_string()]);
}

#[test]
fn courts_are_used_in_configured_order() {
    let players: Vec<Player> = (1..=8).map(|i| player(&format!("p{i}"), 2000 - i * 100)).collect();
    let labels = vec!["Center".to_string(), "North".to_string(), "South".to_string()];
    let plan = generate_round(&players, &labels, &[], 1).unwrap();

    let used: Vec<&str> = plan.sets.iter().map(|s| s.court_number.as_str()).collect();
    assert_eq!(used, vec!["Center", "North"]);
}

#[test]
fn too_few_players_is_rejected() {
    let players = vec![player("a", 1000), player("b", 1000), player("c", 1000)];
    assert_eq!(
        generate_round(&players, &courts(1), &[], 1),
        Err(TournamentError::InsufficientPlayers { players: 3, courts: 1 })
    );
}

#[test]
fn too_few_courts_is_rejected() {
    let players: Vec<Player> = (1..=8).map(|i| player(&format!("p{i}"), 1000)).collect();
    assert_eq!(
        generate_round(&players, &courts(1), &[], 1),
        Err(TournamentError::InsufficientPlayers { players: 8, courts: 1 })
    );
}
