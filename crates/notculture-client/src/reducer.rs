//! The pure state machine: `(state, action) -> state`.
//!
//! Every transition is a total function — no action can panic or leave
//! the state half-updated. The win flag is derived here, in one place:
//! any transition that lands a player on the finish tile raises it.

use notculture_rules::{FINISH, destination};

use crate::Action;
use crate::state::{GameState, LocalPlayer, MAX_PLAYERS, MIN_PLAYERS, PlayMode,
    default_local_roster};

impl GameState {
    /// Applies one action. Deterministic and side-effect free.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::AddPlayer => {
                if self.players.len() < MAX_PLAYERS {
                    let id = self.players.len() as u8 + 1;
                    self.players.push(LocalPlayer::new(id, format!("Player {id}"), 0));
                }
            }

            Action::RemovePlayer => {
                if self.players.len() > MIN_PLAYERS {
                    self.players.pop();
                    if self.current_turn_index >= self.players.len() {
                        self.current_turn_index = 0;
                    }
                }
            }

            Action::RenamePlayer { id, name } => {
                if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
                    player.name = name;
                }
            }

            Action::AdvanceTurn => {
                if !self.players.is_empty() {
                    self.current_turn_index =
                        (self.current_turn_index + 1) % self.players.len();
                }
            }

            Action::LockTurn => self.turn_locked = true,

            Action::UnlockTurn => {
                self.turn_locked = false;
                self.active_question = None;
                self.pending_move = 0;
                self.pending_category = None;
            }

            Action::SetActiveQuestion { question, roll } => {
                self.active_question = Some(question);
                self.pending_move = roll;
                self.show_question_modal = true;
            }

            Action::ClearQuestion => {
                self.active_question = None;
                self.pending_move = 0;
                self.show_question_modal = false;
                self.answer_result = None;
            }

            Action::SetAnswerResult(result) => self.answer_result = result,

            Action::SetPendingCategory(category) => self.pending_category = category,

            Action::MovePlayer { id, steps } => {
                if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
                    player.position = destination(player.position, steps);
                }
                self.refresh_win_flag();
            }

            Action::SetPlayerPosition { id, position } => {
                if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
                    player.position = position.min(FINISH);
                }
                self.refresh_win_flag();
            }

            Action::SetPlayMode(mode) => {
                self.clear_transients();
                match (self.play_mode, mode) {
                    (PlayMode::Local, PlayMode::Online) => {
                        // Park the local roster; the first sync repopulates.
                        self.parked_local_roster = std::mem::take(&mut self.players);
                    }
                    (PlayMode::Online, PlayMode::Local) => {
                        self.players = if self.parked_local_roster.is_empty() {
                            default_local_roster()
                        } else {
                            std::mem::take(&mut self.parked_local_roster)
                        };
                    }
                    _ => {}
                }
                self.play_mode = mode;
            }

            Action::ResetGame => {
                for player in &mut self.players {
                    player.position = 0;
                }
                self.clear_transients();
            }

            Action::ShowWinModal(show) => self.show_win_modal = show,

            Action::ShowQuestionModal(show) => self.show_question_modal = show,

            Action::ShowCultureModal(show) => {
                self.show_culture_modal = show;
                if !show {
                    self.culture_prompt_index = None;
                    self.culture_timer_started_at = None;
                    self.culture_score = None;
                }
            }

            Action::ShowNotModal(show) => {
                self.show_not_modal = show;
                if !show {
                    self.not_timer_started_at = None;
                    self.not_score = None;
                    self.current_not_card = None;
                }
            }

            Action::SetCulturePromptIndex(index) => self.culture_prompt_index = index,
            Action::SetCultureTimerStart(at) => self.culture_timer_started_at = at,
            Action::SetCultureScore(score) => self.culture_score = score,
            Action::SetNotTimerStart(at) => self.not_timer_started_at = at,
            Action::SetNotScore(score) => self.not_score = score,
            Action::SetNotCard(card) => self.current_not_card = card,

            Action::SyncOnlineState { players, turn_index } => {
                // Never let a sync move a player backwards — this protects
                // mid-animation steps from stale snapshot values.
                let merged = players
                    .into_iter()
                    .map(|incoming| {
                        match self.players.iter().find(|p| p.id == incoming.id) {
                            Some(local) if incoming.position < local.position => {
                                LocalPlayer { position: local.position, ..incoming }
                            }
                            _ => incoming,
                        }
                    })
                    .collect();
                self.players = merged;

                if turn_index != self.current_turn_index {
                    // Safety net against a missed explicit unlock.
                    self.turn_locked = false;
                }
                self.current_turn_index = turn_index;
                self.refresh_win_flag();
            }
        }
    }

    fn clear_transients(&mut self) {
        self.current_turn_index = 0;
        self.active_question = None;
        self.pending_move = 0;
        self.pending_category = None;
        self.turn_locked = false;
        self.answer_result = None;
        self.show_win_modal = false;
        self.show_question_modal = false;
        self.show_culture_modal = false;
        self.show_not_modal = false;
        self.culture_prompt_index = None;
        self.culture_timer_started_at = None;
        self.culture_score = None;
        self.not_timer_started_at = None;
        self.not_score = None;
        self.current_not_card = None;
    }

    fn refresh_win_flag(&mut self) {
        if self.players.iter().any(|p| p.position >= FINISH) {
            self.show_win_modal = true;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use notculture_model::{AnswerResult, Category, QuestionId};
    use notculture_questions::Question;

    use super::*;

    fn question() -> Question {
        Question {
            id: QuestionId::new("q1"),
            category: Category::Film,
            difficulty: 3,
            prompt: "?".into(),
            answers: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: 2,
        }
    }

    #[test]
    fn test_add_player_caps_at_max() {
        let mut state = GameState::new();
        for _ in 0..10 {
            state.apply(Action::AddPlayer);
        }
        assert_eq!(state.players.len(), MAX_PLAYERS);
    }

    #[test]
    fn test_remove_player_keeps_min_and_reindexes_turn() {
        let mut state = GameState::new();
        state.apply(Action::AdvanceTurn); // now player 2's turn
        state.apply(Action::RemovePlayer);
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.current_turn_index, 0, "out-of-range turn resets to 0");

        state.apply(Action::RemovePlayer);
        assert_eq!(state.players.len(), MIN_PLAYERS);
    }

    #[test]
    fn test_advance_turn_wraps() {
        let mut state = GameState::new();
        state.apply(Action::AdvanceTurn);
        assert_eq!(state.current_turn_index, 1);
        state.apply(Action::AdvanceTurn);
        assert_eq!(state.current_turn_index, 0);
    }

    #[test]
    fn test_unlock_turn_clears_per_turn_fields() {
        let mut state = GameState::new();
        state.apply(Action::LockTurn);
        state.apply(Action::SetActiveQuestion { question: question(), roll: 4 });
        state.apply(Action::SetPendingCategory(Some(Category::Film)));

        state.apply(Action::UnlockTurn);

        assert!(!state.turn_locked);
        assert!(state.active_question.is_none());
        assert_eq!(state.pending_move, 0);
        assert!(state.pending_category.is_none());
    }

    #[test]
    fn test_move_player_clamps_to_finish_and_raises_win() {
        let mut state = GameState::new();
        state.apply(Action::SetPlayerPosition { id: 1, position: 45 });
        state.apply(Action::MovePlayer { id: 1, steps: 6 });

        assert_eq!(state.player(1).unwrap().position, FINISH);
        assert!(state.show_win_modal);
    }

    #[test]
    fn test_sync_never_moves_a_player_backwards() {
        let mut state = GameState::new();
        state.apply(Action::SetPlayerPosition { id: 1, position: 8 });

        state.apply(Action::SyncOnlineState {
            players: vec![
                LocalPlayer::new(1, "Player 1", 5),
                LocalPlayer::new(2, "Player 2", 3),
            ],
            turn_index: 0,
        });

        assert_eq!(state.player(1).unwrap().position, 8, "stale lower value ignored");
        assert_eq!(state.player(2).unwrap().position, 3, "higher values pass through");
    }

    #[test]
    fn test_sync_turn_change_force_unlocks() {
        let mut state = GameState::new();
        state.apply(Action::LockTurn);

        state.apply(Action::SyncOnlineState {
            players: state.players.clone(),
            turn_index: 1,
        });

        assert!(!state.turn_locked, "turn change is the unlock safety net");
        assert_eq!(state.current_turn_index, 1);
    }

    #[test]
    fn test_sync_same_turn_preserves_lock() {
        let mut state = GameState::new();
        state.apply(Action::LockTurn);
        state.apply(Action::SyncOnlineState {
            players: state.players.clone(),
            turn_index: 0,
        });
        assert!(state.turn_locked);
    }

    #[test]
    fn test_mode_switch_parks_and_restores_local_roster() {
        let mut state = GameState::new();
        state.apply(Action::AddPlayer);
        state.apply(Action::SetPlayerPosition { id: 3, position: 12 });

        state.apply(Action::SetPlayMode(PlayMode::Online));
        assert!(state.players.is_empty(), "online roster comes from the first sync");

        state.apply(Action::SetPlayMode(PlayMode::Local));
        assert_eq!(state.players.len(), 3);
        assert_eq!(state.player(3).unwrap().position, 12, "local progress survives");
    }

    #[test]
    fn test_reset_game_zeroes_everything() {
        let mut state = GameState::new();
        state.apply(Action::LockTurn);
        state.apply(Action::SetPlayerPosition { id: 1, position: 20 });
        state.apply(Action::AdvanceTurn);
        state.apply(Action::SetActiveQuestion { question: question(), roll: 2 });
        state.apply(Action::SetAnswerResult(Some(AnswerResult {
            selected_index: 0,
            correct_index: 2,
            was_correct: false,
        })));
        state.apply(Action::ShowCultureModal(true));

        state.apply(Action::ResetGame);

        assert!(state.players.iter().all(|p| p.position == 0));
        assert_eq!(state.current_turn_index, 0);
        assert!(!state.turn_locked);
        assert!(state.active_question.is_none());
        assert!(state.answer_result.is_none());
        assert!(!state.show_culture_modal);
        assert!(!state.show_win_modal);
    }

    #[test]
    fn test_closing_culture_modal_clears_its_fields() {
        let mut state = GameState::new();
        state.apply(Action::ShowCultureModal(true));
        state.apply(Action::SetCulturePromptIndex(Some(4)));
        state.apply(Action::SetCultureTimerStart(Some(1_000)));
        state.apply(Action::SetCultureScore(Some(7)));

        state.apply(Action::ShowCultureModal(false));

        assert!(state.culture_prompt_index.is_none());
        assert!(state.culture_timer_started_at.is_none());
        assert!(state.culture_score.is_none());
    }
}
