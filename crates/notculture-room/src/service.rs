//! The mutator set for individual-mode rooms (team mode lives in
//! `teams.rs` as further impls on the same service).

use notculture_model::{
    AnswerResult, PlayerEntry, PlayerId, QuestionId, RollEvent, RoomCode, RoomDoc,
    RoomMode, RoomPhase, TileEvent, TilePayload,
};
use notculture_rules::{FINISH, FINISH_EARLY_BACKDATE_MS, unix_now_ms};
use notculture_store::{RoomStore, TxDecision, TxOutcome};
use rand::Rng;

use crate::{RoomError, RoomOptions, TurnAction, authorize, generate_player_token,
    generate_room_code};

/// The write-side API over a shared room store.
///
/// One service instance can drive any number of rooms; it holds no
/// per-room state. Every method re-reads current store state before
/// writing (or runs inside a transaction), so no caller ever assumes it
/// "owns" the document between its own read and write.
pub struct RoomService<S> {
    store: S,
    options: RoomOptions,
}

impl<S: RoomStore> RoomService<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, RoomOptions::default())
    }

    pub fn with_options(store: S, options: RoomOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &RoomOptions {
        &self.options
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Allocates a fresh room with this player as sole member: turn 0, no
    /// active roll or question.
    pub async fn create_room(
        &self,
        player_name: &str,
    ) -> Result<(RoomCode, PlayerId), RoomError> {
        let name = required_name(player_name)?;
        let player_id = generate_player_token(&mut rand::rng());

        loop {
            let code = generate_room_code(&mut rand::rng());
            let mut doc = RoomDoc::new(RoomMode::Individual, unix_now_ms());
            doc.players.insert(
                player_id.clone(),
                PlayerEntry { name: name.clone(), position: Some(0) },
            );
            doc.player_order.push(player_id.clone());

            // Write-if-absent; an occupied code means a collision, so draw
            // another one.
            let outcome = self
                .store
                .transaction(&code, |existing| {
                    if existing.is_some() {
                        TxDecision::Abort
                    } else {
                        TxDecision::Write(doc.clone())
                    }
                })
                .await?;

            if outcome == TxOutcome::Committed {
                tracing::info!(room_code = %code, player_id = %player_id, "room created");
                return Ok((code, player_id));
            }
        }
    }

    /// Joins (or reconnects to) a room.
    ///
    /// A caller whose `existing_id` is already in the roster is treated as
    /// a reconnect: its name is refreshed and no duplicate is inserted.
    /// New joins append through the transaction so two concurrent joins
    /// both land. A missing or expired room is reported as
    /// [`RoomError::NotFound`]; the expired one is deleted on discovery.
    pub async fn join_room(
        &self,
        code: &RoomCode,
        player_name: &str,
        existing_id: Option<&PlayerId>,
    ) -> Result<PlayerId, RoomError> {
        let name = required_name(player_name)?;
        let player_id = match existing_id {
            Some(id) => id.clone(),
            None => generate_player_token(&mut rand::rng()),
        };
        let now = unix_now_ms();
        let ttl = self.options.ttl_ms();
        let max_players = self.options.max_players;

        let mut rejection = None;
        let mut reconnected = false;
        self.store
            .transaction(code, |doc| {
                rejection = None;
                reconnected = false;
                let Some(doc) = doc else {
                    rejection = Some(RoomError::NotFound(code.clone()));
                    return TxDecision::Abort;
                };
                if doc.is_expired(now, ttl) {
                    rejection = Some(RoomError::NotFound(code.clone()));
                    return TxDecision::Delete;
                }

                let mut next = doc.clone();
                if let Some(entry) = next.players.get_mut(&player_id) {
                    entry.name = name.clone();
                    reconnected = true;
                    return TxDecision::Write(next);
                }
                if next.player_order.len() >= max_players {
                    rejection = Some(RoomError::RoomFull(code.clone()));
                    return TxDecision::Abort;
                }
                next.players.insert(
                    player_id.clone(),
                    PlayerEntry { name: name.clone(), position: Some(0) },
                );
                next.player_order.push(player_id.clone());
                TxDecision::Write(next)
            })
            .await?;

        if let Some(err) = rejection {
            return Err(err);
        }
        tracing::info!(room_code = %code, player_id = %player_id, reconnected, "player joined");
        Ok(player_id)
    }

    /// Removes a player; deletes the room when the roster empties.
    pub async fn leave_room(
        &self,
        code: &RoomCode,
        player_id: &PlayerId,
    ) -> Result<(), RoomError> {
        self.store
            .transaction(code, |doc| {
                let Some(doc) = doc else {
                    // Leaving a room that no longer exists is a no-op.
                    return TxDecision::Abort;
                };
                let mut next = doc.clone();
                next.players.remove(player_id);
                next.player_order.retain(|id| id != player_id);
                if next.player_order.is_empty() {
                    return TxDecision::Delete;
                }
                next.current_turn_index %= next.player_order.len();
                TxDecision::Write(next)
            })
            .await?;
        tracing::info!(room_code = %code, player_id = %player_id, "player left");
        Ok(())
    }

    /// Deletes the room if it is past its TTL. Returns whether it was.
    pub async fn expire_if_stale(&self, code: &RoomCode) -> Result<bool, RoomError> {
        let Some(doc) = self.store.read(code).await? else {
            return Ok(false);
        };
        if doc.is_expired(unix_now_ms(), self.options.ttl_ms()) {
            self.store.delete(code).await?;
            tracing::info!(room_code = %code, "expired room deleted");
            return Ok(true);
        }
        Ok(false)
    }

    // -----------------------------------------------------------------
    // Turn protocol
    // -----------------------------------------------------------------

    /// Rolls the dice for the current turn.
    ///
    /// Rejected unless `player_id` is the turn-holder. On acceptance a new
    /// [`RollEvent`] with a fresh sequence number is written — the sole
    /// trigger that fans out to every client's dice animation.
    pub async fn roll_dice(
        &self,
        code: &RoomCode,
        player_id: &PlayerId,
    ) -> Result<RollEvent, RoomError> {
        let value: u8 = rand::rng().random_range(1..=6);

        let mut rejection = None;
        let mut rolled = None;
        self.store
            .transaction(code, |doc| {
                rejection = None;
                let Some(doc) = doc else {
                    rejection = Some(RoomError::NotFound(code.clone()));
                    return TxDecision::Abort;
                };
                if let Err(err) = authorize(doc, player_id, TurnAction::Roll) {
                    rejection = Some(err);
                    return TxDecision::Abort;
                }
                let mut next = doc.clone();
                let roll = RollEvent { value, seq: next.take_seq() };
                next.current_roll = Some(roll);
                next.phase = RoomPhase::Playing;
                rolled = Some(roll);
                TxDecision::Write(next)
            })
            .await?;

        if let Some(err) = rejection {
            return Err(err);
        }
        let roll = rolled.expect("committed transaction recorded the roll");
        tracing::debug!(room_code = %code, player_id = %player_id, value = roll.value, seq = roll.seq, "dice rolled");
        Ok(roll)
    }

    /// Broadcasts the active question to all clients.
    pub async fn set_current_question(
        &self,
        code: &RoomCode,
        question_id: QuestionId,
    ) -> Result<(), RoomError> {
        self.scalar_update(code, move |doc| {
            doc.current_question_id = Some(question_id);
        })
        .await
    }

    /// Broadcasts the question's resolution so all clients show identical
    /// feedback.
    pub async fn submit_answer(
        &self,
        code: &RoomCode,
        result: AnswerResult,
    ) -> Result<(), RoomError> {
        self.scalar_update(code, move |doc| {
            doc.answer_result = Some(result);
        })
        .await
    }

    /// Writes a player's new position, clamped to the finish tile and
    /// never decreasing — a stale write can never move a token backwards.
    pub async fn update_position(
        &self,
        code: &RoomCode,
        player_id: &PlayerId,
        new_position: u8,
    ) -> Result<(), RoomError> {
        self.scalar_update(code, move |doc| {
            if let Some(entry) = doc.players.get_mut(player_id) {
                let clamped = new_position.min(FINISH);
                entry.position = Some(entry.position.unwrap_or(0).max(clamped));
            }
        })
        .await
    }

    /// Advances to the next turn: increments the turn index modulo the
    /// roster and clears every per-turn transient field in one atomic
    /// update — the state-transition boundary between turns.
    pub async fn advance_turn(&self, code: &RoomCode) -> Result<(), RoomError> {
        self.scalar_update(code, |doc| {
            let len = doc.roster_len();
            if len > 0 {
                doc.current_turn_index = (doc.current_turn_index + 1) % len;
            }
            doc.clear_turn_transients();
        })
        .await
    }

    /// Clears the roll/question/answer trio without advancing the turn.
    pub async fn clear_turn_state(&self, code: &RoomCode) -> Result<(), RoomError> {
        self.scalar_update(code, |doc| {
            doc.current_roll = None;
            doc.current_question_id = None;
            doc.answer_result = None;
        })
        .await
    }

    // -----------------------------------------------------------------
    // Tile events
    // -----------------------------------------------------------------

    /// Activates a Culture or Not tile event.
    ///
    /// Transactional: aborts with [`RoomError::TileEventActive`] when one
    /// is already active, so two clients evaluating the same landing can
    /// never double-trigger.
    pub async fn activate_tile_event(
        &self,
        code: &RoomCode,
        payload: TilePayload,
    ) -> Result<(), RoomError> {
        let mut rejection = None;
        self.store
            .transaction(code, |doc| {
                rejection = None;
                let Some(doc) = doc else {
                    rejection = Some(RoomError::NotFound(code.clone()));
                    return TxDecision::Abort;
                };
                if doc.tile_event.as_ref().is_some_and(|event| event.active) {
                    rejection = Some(RoomError::TileEventActive);
                    return TxDecision::Abort;
                }
                let mut next = doc.clone();
                next.tile_event = Some(TileEvent::activated(payload.clone()));
                TxDecision::Write(next)
            })
            .await?;

        match rejection {
            Some(err) => Err(err),
            None => {
                tracing::debug!(room_code = %code, "tile event activated");
                Ok(())
            }
        }
    }

    /// Starts the tile countdown for all clients.
    pub async fn start_tile_timer(&self, code: &RoomCode) -> Result<(), RoomError> {
        self.scalar_update(code, |doc| {
            if let Some(event) = doc.tile_event.as_mut() {
                event.timer_started_at = Some(unix_now_ms());
            }
        })
        .await
    }

    /// Ends the countdown early by backdating its start timestamp; every
    /// client's independently computed remaining time converges to zero.
    pub async fn finish_tile_timer_early(&self, code: &RoomCode) -> Result<(), RoomError> {
        self.scalar_update(code, |doc| {
            if let Some(event) = doc.tile_event.as_mut() {
                event.timer_started_at =
                    Some(unix_now_ms().saturating_sub(FINISH_EARLY_BACKDATE_MS));
            }
        })
        .await
    }

    /// Records the judge's score; its first appearance is the score-reveal
    /// broadcast.
    pub async fn submit_tile_score(
        &self,
        code: &RoomCode,
        score: u8,
    ) -> Result<(), RoomError> {
        self.scalar_update(code, move |doc| {
            if let Some(event) = doc.tile_event.as_mut() {
                event.score = Some(score);
            }
        })
        .await
    }

    // -----------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------

    /// Resets the whole game: zeroes positions, clears transients, turn
    /// back to 0, and bumps the reset epoch so every client hard-resets.
    pub async fn reset_room(&self, code: &RoomCode) -> Result<(), RoomError> {
        let result = self
            .scalar_update(code, |doc| {
                for entry in doc.players.values_mut() {
                    if entry.position.is_some() {
                        entry.position = Some(0);
                    }
                }
                doc.current_turn_index = 0;
                doc.clear_turn_transients();
                doc.reset_epoch += 1;
            })
            .await;
        if result.is_ok() {
            tracing::info!(room_code = %code, "room reset");
        }
        result
    }

    // -----------------------------------------------------------------
    // Shared plumbing
    // -----------------------------------------------------------------

    /// Applies a single-writer scalar mutation; missing room is NotFound.
    pub(crate) async fn scalar_update<F>(
        &self,
        code: &RoomCode,
        f: F,
    ) -> Result<(), RoomError>
    where
        F: FnOnce(&mut RoomDoc) + Send,
    {
        if self.store.update(code, f).await? {
            Ok(())
        } else {
            Err(RoomError::NotFound(code.clone()))
        }
    }
}

fn required_name(name: &str) -> Result<String, RoomError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RoomError::NameRequired);
    }
    Ok(trimmed.to_string())
}
