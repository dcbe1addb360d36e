//! Property-based tests for the game-state reducer: turn-index bounds and
//! position monotonicity hold under arbitrary action sequences.

#![allow(clippy::unwrap_used)]

use notculture_client::{Action, GameState, LocalPlayer, PlayMode};
use notculture_rules::FINISH;
use proptest::prelude::*;

/// Actions the local roster/turn machinery can see, in any order.
fn roster_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::AddPlayer),
        Just(Action::RemovePlayer),
        Just(Action::AdvanceTurn),
        Just(Action::ResetGame),
        (1u8..=4, 0u8..=60).prop_map(|(id, position)| Action::SetPlayerPosition {
            id,
            position,
        }),
        (1u8..=4, 0u8..=6).prop_map(|(id, steps)| Action::MovePlayer { id, steps }),
    ]
}

/// A synthetic online sync: two players with arbitrary positions and an
/// arbitrary (possibly stale) turn index.
fn sync_action() -> impl Strategy<Value = Action> {
    (0u8..=50, 0u8..=50, 0usize..2).prop_map(|(a, b, turn_index)| Action::SyncOnlineState {
        players: vec![
            LocalPlayer::new(1, "Player 1", a),
            LocalPlayer::new(2, "Player 2", b),
        ],
        turn_index,
    })
}

proptest! {
    /// The turn index stays in range and the roster stays within limits
    /// for any sequence of roster/turn actions.
    #[test]
    fn prop_turn_index_always_in_range(actions in prop::collection::vec(roster_action(), 0..64)) {
        let mut state = GameState::new();
        for action in actions {
            state.apply(action);
            prop_assert!(!state.players.is_empty());
            prop_assert!(state.players.len() <= 4);
            prop_assert!(state.current_turn_index < state.players.len());
        }
    }

    /// Positions never exceed the finish tile, whatever moves arrive.
    #[test]
    fn prop_positions_clamped_to_finish(actions in prop::collection::vec(roster_action(), 0..64)) {
        let mut state = GameState::new();
        for action in actions {
            state.apply(action);
            for player in &state.players {
                prop_assert!(player.position <= FINISH);
            }
        }
    }

    /// Across any sequence of online syncs, a player's held position
    /// never decreases — stale snapshots are absorbed.
    #[test]
    fn prop_sync_positions_monotonic(syncs in prop::collection::vec(sync_action(), 1..64)) {
        let mut state = GameState::new();
        state.apply(Action::SetPlayMode(PlayMode::Online));

        let mut high_water = [0u8; 2];
        for sync in syncs {
            state.apply(sync);
            for (slot, high) in high_water.iter_mut().enumerate() {
                let position = state.player(slot as u8 + 1).map(|p| p.position).unwrap_or(0);
                prop_assert!(position >= *high, "slot {slot} went backwards");
                *high = position;
            }
        }
    }

    /// A reset always restores the all-zero baseline, whatever preceded it.
    #[test]
    fn prop_reset_is_complete(actions in prop::collection::vec(roster_action(), 0..32)) {
        let mut state = GameState::new();
        for action in actions {
            state.apply(action);
        }
        state.apply(Action::ResetGame);

        prop_assert_eq!(state.current_turn_index, 0);
        prop_assert!(!state.turn_locked);
        prop_assert!(state.players.iter().all(|p| p.position == 0));
        prop_assert!(state.active_question.is_none());
        prop_assert!(!state.show_win_modal);
    }
}
