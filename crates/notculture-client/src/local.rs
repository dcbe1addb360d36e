//! Same-device play: the full turn flow over the shared reducer, with no
//! store and no network. The UI layers its own animation over the state;
//! the rules here resolve moves immediately.

use notculture_model::{AnswerResult, TileKind};
use notculture_questions::{CulturePrompt, NotCard, Question};
use notculture_rules::{FINISH, classify, destination, trivia_category, Tile};
use rand::Rng;

use crate::Action;
use crate::error::ClientError;
use crate::session::Content;
use crate::state::GameState;

/// What a roll asks of the players next.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPrompt {
    Trivia(Question),
    Culture { prompt_index: usize, prompt: CulturePrompt },
    Not(NotCard),
}

/// A same-device game: reducer plus content pools.
pub struct LocalGame {
    state: GameState,
    content: Content,
}

impl LocalGame {
    pub fn new(content: Content) -> Self {
        Self { state: GameState::new(), content }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Roster editing and modal toggles pass straight through.
    pub fn dispatch(&mut self, action: Action) {
        self.state.apply(action);
    }

    /// Rolls for the current player and produces this turn's prompt.
    pub fn roll(&mut self, rng: &mut impl Rng) -> Result<(u8, TurnPrompt), ClientError> {
        if self.state.turn_locked {
            return Err(ClientError::TurnLocked);
        }
        self.state.apply(Action::LockTurn);
        let value: u8 = rng.random_range(1..=6);
        match self.prompt_for_roll(value, rng) {
            Ok(prompt) => Ok((value, prompt)),
            Err(err) => {
                self.state.apply(Action::UnlockTurn);
                Err(err)
            }
        }
    }

    fn prompt_for_roll(
        &mut self,
        value: u8,
        rng: &mut impl Rng,
    ) -> Result<TurnPrompt, ClientError> {
        let player = self.state.current_player().cloned().ok_or(ClientError::NotStarted)?;
        let dest = destination(player.position, value);
        let turn_index = self.state.current_turn_index;

        match classify(dest) {
            Tile::Culture => {
                // Special tiles move immediately; the minigame then earns
                // a second, smaller hop.
                self.state.apply(Action::MovePlayer { id: player.id, steps: value });
                let prompt_index = self
                    .content
                    .culture
                    .index_for(turn_index, dest)
                    .ok_or(ClientError::NoContent)?;
                let prompt = self
                    .content
                    .culture
                    .get(prompt_index)
                    .cloned()
                    .ok_or(ClientError::NoContent)?;
                self.state.apply(Action::SetCulturePromptIndex(Some(prompt_index)));
                self.state.apply(Action::ShowCultureModal(true));
                Ok(TurnPrompt::Culture { prompt_index, prompt })
            }
            Tile::Not => {
                self.state.apply(Action::MovePlayer { id: player.id, steps: value });
                let card =
                    self.content.not_cards.draw(rng).ok_or(ClientError::NoContent)?;
                self.state.apply(Action::SetNotCard(Some(card.clone())));
                self.state.apply(Action::ShowNotModal(true));
                Ok(TurnPrompt::Not(card))
            }
            Tile::Start | Tile::Finish | Tile::Trivia(_) => {
                // Category comes from the current path index; start and
                // finish draw it at random.
                let category = trivia_category(player.position, rng);
                let question = self
                    .content
                    .questions
                    .draw(category, value, rng)
                    .ok_or(ClientError::NoContent)?;
                self.state.apply(Action::SetPendingCategory(Some(category)));
                self.state.apply(Action::SetActiveQuestion {
                    question: question.clone(),
                    roll: value,
                });
                Ok(TurnPrompt::Trivia(question))
            }
        }
    }

    /// Grades the active question.
    pub fn answer(&mut self, selected_index: u8) -> Result<AnswerResult, ClientError> {
        let question =
            self.state.active_question.clone().ok_or(ClientError::NoActiveQuestion)?;
        let result = AnswerResult {
            selected_index,
            correct_index: question.correct_index,
            was_correct: selected_index == question.correct_index,
        };
        self.state.apply(Action::SetAnswerResult(Some(result)));
        Ok(result)
    }

    /// Closes out the question: correct moves the pending steps, wrong
    /// moves nothing; either way the turn advances and unlocks.
    pub fn conclude_answer(&mut self) -> Result<bool, ClientError> {
        let result = self.state.answer_result.ok_or(ClientError::NoActiveQuestion)?;
        let player = self.state.current_player().cloned().ok_or(ClientError::NotStarted)?;
        let steps = self.state.pending_move;

        self.state.apply(Action::ShowQuestionModal(false));
        self.state.apply(Action::ClearQuestion);
        if result.was_correct {
            self.state.apply(Action::MovePlayer { id: player.id, steps });
        }
        self.state.apply(Action::AdvanceTurn);
        self.state.apply(Action::UnlockTurn);
        Ok(result.was_correct)
    }

    /// Resolves a tile minigame with the judged score (zero allowed).
    pub fn resolve_tile(&mut self, kind: TileKind, score: u8) -> Result<(), ClientError> {
        let player = self.state.current_player().cloned().ok_or(ClientError::NotStarted)?;
        self.state.apply(match kind {
            TileKind::Culture => Action::ShowCultureModal(false),
            TileKind::Not => Action::ShowNotModal(false),
        });
        self.state.apply(Action::MovePlayer { id: player.id, steps: score });
        self.state.apply(Action::AdvanceTurn);
        self.state.apply(Action::UnlockTurn);
        Ok(())
    }

    /// Debug helper: fire the tile/question flow for an arbitrary
    /// position without rolling or moving.
    pub fn trigger_tile_at(
        &mut self,
        position: u8,
        rng: &mut impl Rng,
    ) -> Result<TurnPrompt, ClientError> {
        if position == 0 || position >= FINISH {
            return Err(ClientError::NoContent);
        }
        self.state.apply(Action::LockTurn);
        let turn_index = self.state.current_turn_index;

        match classify(position) {
            Tile::Culture => {
                let prompt_index = self
                    .content
                    .culture
                    .index_for(turn_index, position)
                    .ok_or(ClientError::NoContent)?;
                let prompt = self
                    .content
                    .culture
                    .get(prompt_index)
                    .cloned()
                    .ok_or(ClientError::NoContent)?;
                self.state.apply(Action::SetCulturePromptIndex(Some(prompt_index)));
                self.state.apply(Action::ShowCultureModal(true));
                Ok(TurnPrompt::Culture { prompt_index, prompt })
            }
            Tile::Not => {
                let card =
                    self.content.not_cards.draw(rng).ok_or(ClientError::NoContent)?;
                self.state.apply(Action::SetNotCard(Some(card.clone())));
                self.state.apply(Action::ShowNotModal(true));
                Ok(TurnPrompt::Not(card))
            }
            Tile::Trivia(category) => {
                let value: u8 = rng.random_range(1..=6);
                let question = self
                    .content
                    .questions
                    .draw(category, value, rng)
                    .ok_or(ClientError::NoContent)?;
                self.state.apply(Action::SetPendingCategory(Some(category)));
                self.state.apply(Action::SetActiveQuestion {
                    question: question.clone(),
                    roll: value,
                });
                Ok(TurnPrompt::Trivia(question))
            }
            Tile::Start | Tile::Finish => Err(ClientError::NoContent),
        }
    }

    /// Full local reset: reducer state and used-content tracking.
    pub fn reset(&mut self) {
        self.state.apply(Action::ResetGame);
        self.content.questions.reset_used();
        self.content.not_cards.reset_used();
    }
}

// =========================================================================
// Tests
// =========================================================================
