//! The two-player opening from a freshly generated galaxy.

use chrono::{DateTime, Duration, Utc};
use interstellar_core::{
    generate_game, ErrorKind, GalaxyConfig, GameId, GameRng, GameState, MoveOrder, MoveOutcome,
    PlayerId, SystemId,
};

fn new_game(seed: u64) -> GameState {
    let mut rng = GameRng::seed_from_u64(seed);
    generate_game(
        GameId::from("scenario"),
        &["A".to_string(), "B".to_string()],
        &GalaxyConfig::default(),
        &mut rng,
        DateTime::<Utc>::UNIX_EPOCH,
    )
    .expect("valid players")
}

/// An unowned system adjacent to `from`.
fn unowned_neighbour(state: &GameState, from: &SystemId) -> Option<SystemId> {
    state
        .map
        .neighbours(from)
        .into_iter()
        .find(|n| state.owner_of(n).is_none())
        .cloned()
}

#[test]
fn opening_move_claims_a_neighbour() {
    // Some seed gives A's home an unowned neighbour; most do.
    let (mut state, home, target) = (0..50)
        .find_map(|seed| {
            let state = new_game(seed);
            let home = SystemId::numbered(0);
            let target = unowned_neighbour(&state, &home)?;
            Some((state, home, target))
        })
        .expect("some seed has an unowned neighbour");

    for name in ["A", "B"] {
        let player = state.player(&PlayerId::from(name)).unwrap();
        assert_eq!(player.systems.len(), 1);
        assert_eq!(player.fleets.values().sum::<u32>(), 5);
    }

    let mut rng = GameRng::seed_from_u64(0);
    let now = DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(1);
    let report = state
        .apply_move(&MoveOrder::new("A", home.clone(), target.clone(), 2), &mut rng, now)
        .expect("legal opening move");

    assert_eq!(report.outcome, MoveOutcome::Claimed { stationed: 2 });
    let a = state.player(&PlayerId::from("A")).unwrap();
    assert!(a.owns(&target));
    assert_eq!(a.fleets_at(&target), 2);
    assert_eq!(a.fleets_at(&home), 3);
    assert_eq!(state.current_turn, PlayerId::from("B"));
    assert_eq!(state.last_move_timestamp, now);
}

#[test]
fn overdrawn_move_is_rejected_without_side_effects() {
    let mut state = new_game(3);
    let home = SystemId::numbered(0);
    let target = state.map.neighbours(&home)[0].clone();
    let before = state.clone();

    let mut rng = GameRng::seed_from_u64(0);
    let err = state
        .apply_move(
            &MoveOrder::new("A", home, target, 6),
            &mut rng,
            DateTime::<Utc>::UNIX_EPOCH + Duration::minutes(1),
        )
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientFleet);
    assert_eq!(state, before);
}

#[test]
fn game_document_roundtrips_via_serde() {
    let state = new_game(9);
    let json = serde_json::to_string(&state).expect("serialize game");
    let back: GameState = serde_json::from_str(&json).expect("deserialize game");
    assert_eq!(back, state);
    assert_eq!(back.validate(), Ok(()));
}
