//! Integration tests for the set-level Elo update.

use rotation_tournament::logic::rating::{expected_score, team_rating};
use rotation_tournament::{update_ratings, Player};

fn player(id: &str, rating: i32) -> Player {
    Player::new(id, id).with_rating(rating)
}

fn veteran(id: &str, rating: i32) -> Player {
    let mut p = player(id, rating);
    p.wins = 4;
    p.losses = 6;
    p
}

#[test]
fn even_teams_split_six_four() {
    let team_1 = [player("a", 1200), player("b", 1200)];
    let team_2 = [player("c", 1200), player("d", 1200)];
    assert_eq!(expected_score(team_rating(&team_1), team_rating(&team_2)), 0.5);

    let updated = update_ratings(&team_1, &team_2, 6, 4);
    let ratings: Vec<(&str, i32)> = updated.iter().map(|p| (p.id.as_str(), p.rating)).collect();
    assert_eq!(ratings, vec![("a", 1203), ("b", 1203), ("c", 1197), ("d", 1197)]);
}

#[test]
fn scoreless_set_changes_nothing() {
    let team_1 = [player("a", 1300), player("b", 1100)];
    let team_2 = [player("c", 1250), player("d", 1000)];
    let updated = update_ratings(&team_1, &team_2, 0, 0);
    assert_eq!(updated, vec![team_1[0].clone(), team_1[1].clone(), team_2[0].clone(), team_2[1].clone()]);
}

#[test]
fn established_players_move_half_as_far_and_the_update_is_not_zero_sum() {
    let team_1 = [player("new", 1200), veteran("vet", 1200)];
    let team_2 = [player("c", 1200), player("d", 1200)];
    let updated = update_ratings(&team_1, &team_2, 6, 4);

    assert_eq!(updated[0].rating, 1203);
    assert_eq!(updated[1].rating, 1201);
    assert_eq!(updated[2].rating, 1197);
    assert_eq!(updated[3].rating, 1197);

    let before: i32 = team_1.iter().chain(team_2.iter()).map(|p| p.rating).sum();
    let after: i32 = updated.iter().map(|p| p.rating).sum();
    assert_ne!(before, after);
}

#[test]
fn favourite_winning_narrowly_loses_rating() {
    // Expected share is ~0.76; winning 6-4 is only 0.6.
    let team_1 = [player("a", 1400), player("b", 1400)];
    let team_2 = [player("c", 1200), player("d", 1200)];
    let updated = update_ratings(&team_1, &team_2, 6, 4);

    assert!(updated[0].rating < 1400);
    assert!(updated[2].rating > 1200);
}

#[test]
fn team_rating_is_the_truncated_average() {
    assert_eq!(team_rating(&[player("a", 1501), player("b", 1200)]), 1350);
}

#[test]
fn other_fields_are_untouched() {
    let mut a = player("a", 1000);
    a.name = "Ana".to_string();
    a.wins = 2;
    let updated = update_ratings(&[a.clone(), player("b", 1000)], &[player("c", 1000), player("d", 1000)], 7, 5);
    assert_eq!(updated[0].name, "Ana");
    assert_eq!(updated[0].wins, 2);
    assert_eq!(updated[0].losses, 0);
}
