//! Integration tests for final standings.

use chrono::Utc;
use rotation_tournament::{finalize, finalize_with_byes, CourtSet, PlayerId, Round, Team};

fn ids(names: &[&str]) -> Vec<PlayerId> {
    names.iter().map(|s| s.to_string()).collect()
}

fn scored(round: u32, a: (&str, &str), b: (&str, &str), games: (u32, u32)) -> CourtSet {
    let mut set = CourtSet::new(
        round,
        "1",
        Team::new(a.0.to_string(), a.1.to_string()),
        Team::new(b.0.to_string(), b.1.to_string()),
    );
    set.record_score(games.0, games.1, Utc::now());
    set
}

#[test]
fn wins_rank_first_then_points() {
    let roster = ids(&["a", "b", "c", "d"]);
    let sets = vec![
        scored(1, ("a", "d"), ("b", "c"), (6, 4)),
        scored(2, ("a", "c"), ("b", "d"), (3, 6)),
        scored(3, ("a", "b"), ("c", "d"), (7, 5)),
    ];
    let results = finalize(&roster, &sets);

    // a: 2 wins 16 pts, b: 2 wins 17 pts, c: 0 wins 12 pts, d: 2 wins 17 pts
    assert_eq!(results.ranking, ids(&["b", "d", "a", "c"]));
    assert_eq!(results.champions, ids(&["b", "d"]));
    assert_eq!(results.top_performers, ids(&["b", "d", "a"]));
    let b = results.standing("b").unwrap();
    assert_eq!((b.wins, b.points, b.sets_played), (2, 17, 3));
}

#[test]
fn everyone_sharing_the_top_result_is_a_champion() {
    let roster = ids(&["a", "b", "c", "d"]);
    let sets = vec![scored(1, ("a", "b"), ("c", "d"), (6, 2))];
    let results = finalize(&roster, &sets);

    assert_eq!(results.champions, ids(&["a", "b"]));
    assert!(results.is_champion("a"));
    assert!(!results.is_champion("c"));
}

#[test]
fn full_ties_keep_registration_order() {
    let roster = ids(&["d", "c", "b", "a"]);
    let sets = vec![scored(1, ("a", "b"), ("c", "d"), (6, 6))];
    let results = finalize(&roster, &sets);

    assert_eq!(results.ranking, ids(&["d", "c", "b", "a"]));
    assert_eq!(results.champions.len(), 4);
}

#[test]
fn drawn_set_gives_points_but_no_win() {
    let roster = ids(&["a", "b", "c", "d"]);
    let results = finalize(&roster, &[scored(1, ("a", "b"), ("c", "d"), (5, 5))]);

    for s in &results.standings {
        assert_eq!(s.wins, 0);
        assert_eq!(s.points, 5);
    }
}

#[test]
fn open_sets_are_ignored() {
    let roster = ids(&["a", "b", "c", "d"]);
    let open = CourtSet::new(1, "1", Team::new("a".into(), "b".into()), Team::new("c".into(), "d".into()));
    let results = finalize(&roster, &[open]);

    assert!(results.standings.iter().all(|s| s.sets_played == 0));
    assert_eq!(results.champions.len(), 4);
}

#[test]
fn small_roster_has_fewer_top_performers() {
    let results = finalize(&ids(&["a", "b"]), &[]);
    assert_eq!(results.top_performers, ids(&["a", "b"]));
    assert!(finalize(&[], &[]).champions.is_empty());
}

#[test]
fn byes_count_as_wins_when_credited() {
    let roster = ids(&["a", "b", "c", "d", "e"]);
    let sets = vec![scored(1, ("a", "e"), ("b", "d"), (6, 3))];
    let byes = ids(&["c"]);

    let credited = finalize_with_byes(&roster, &sets, &byes);
    let c = credited.standing("c").unwrap();
    assert_eq!((c.wins, c.points, c.byes), (1, 0, 1));
    assert_eq!(credited.ranking, ids(&["a", "e", "c", "b", "d"]));

    let plain = finalize(&roster, &sets);
    assert_eq!(plain.standing("c").unwrap().wins, 0);
}

#[test]
fn round_is_complete_only_when_every_set_is_scored() {
    let mut round = Round {
        round_number: 1,
        sets: vec![
            CourtSet::new(1, "1", Team::new("a".into(), "b".into()), Team::new("c".into(), "d".into())),
            CourtSet::new(1, "2", Team::new("e".into(), "f".into()), Team::new("g".into(), "h".into())),
        ],
        byes: Vec::new(),
    };
    round.sets[0].record_score(6, 2, Utc::now());
    assert!(!round.is_complete());
    assert_eq!(round.completed_sets(), 1);

    round.sets[1].record_score(4, 6, Utc::now());
    assert!(round.is_complete());
}
