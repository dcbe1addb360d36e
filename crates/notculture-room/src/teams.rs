//! Team-mode mutators: team rosters, answerer/describer rotation, and the
//! team turn cycle.

use notculture_model::{
    PlayerEntry, PlayerId, RollEvent, RoomCode, RoomDoc, RoomMode, RoomPhase,
    TeamEntry, TeamId,
};
use notculture_rules::{FINISH, unix_now_ms};
use notculture_store::{RoomStore, TxDecision, TxOutcome};
use rand::Rng;

use crate::{RoomError, RoomService, TurnAction, authorize, generate_player_token,
    generate_room_code, generate_team_token};

/// Which member answers and which describes, given a team's rotation
/// index. Solo teams have no describer.
fn answerer_describer(
    member_ids: &[PlayerId],
    rotation: u32,
) -> (Option<PlayerId>, Option<PlayerId>) {
    if member_ids.is_empty() {
        return (None, None);
    }
    let len = member_ids.len();
    let answerer = member_ids[rotation as usize % len].clone();
    let describer = if len > 1 {
        Some(member_ids[(rotation as usize + 1) % len].clone())
    } else {
        None
    };
    (Some(answerer), describer)
}

impl<S: RoomStore> RoomService<S> {
    /// Allocates a fresh team-mode room with the creator already on the
    /// first team.
    pub async fn create_team_room(
        &self,
        player_name: &str,
        team_name: &str,
    ) -> Result<(RoomCode, PlayerId, TeamId), RoomError> {
        if player_name.trim().is_empty() || team_name.trim().is_empty() {
            return Err(RoomError::NameRequired);
        }
        let player_id = generate_player_token(&mut rand::rng());
        let team_id = generate_team_token(&mut rand::rng());

        loop {
            let code = generate_room_code(&mut rand::rng());
            let mut doc = RoomDoc::new(RoomMode::Team, unix_now_ms());
            doc.players.insert(
                player_id.clone(),
                PlayerEntry { name: player_name.trim().to_string(), position: None },
            );
            doc.teams.insert(
                team_id.clone(),
                TeamEntry {
                    name: team_name.trim().to_string(),
                    member_ids: vec![player_id.clone()],
                    position: 0,
                    answerer_rotation_index: 0,
                },
            );
            doc.team_order.push(team_id.clone());
            doc.current_answerer_id = Some(player_id.clone());

            let outcome = self
                .store()
                .transaction(&code, |existing| {
                    if existing.is_some() {
                        TxDecision::Abort
                    } else {
                        TxDecision::Write(doc.clone())
                    }
                })
                .await?;

            if outcome == TxOutcome::Committed {
                tracing::info!(room_code = %code, player_id = %player_id, team_id = %team_id, "team room created");
                return Ok((code, player_id, team_id));
            }
        }
    }

    /// Adds an empty team, up to the room's team limit.
    pub async fn create_team(
        &self,
        code: &RoomCode,
        team_name: &str,
    ) -> Result<TeamId, RoomError> {
        if team_name.trim().is_empty() {
            return Err(RoomError::NameRequired);
        }
        let team_id = generate_team_token(&mut rand::rng());
        let max_teams = self.options().max_teams;

        let mut rejection = None;
        self.store()
            .transaction(code, |doc| {
                rejection = None;
                let Some(doc) = doc else {
                    rejection = Some(RoomError::NotFound(code.clone()));
                    return TxDecision::Abort;
                };
                if doc.team_order.len() >= max_teams {
                    rejection = Some(RoomError::RoomFull(code.clone()));
                    return TxDecision::Abort;
                }
                let mut next = doc.clone();
                next.teams.insert(
                    team_id.clone(),
                    TeamEntry {
                        name: team_name.trim().to_string(),
                        member_ids: Vec::new(),
                        position: 0,
                        answerer_rotation_index: 0,
                    },
                );
                next.team_order.push(team_id.clone());
                TxDecision::Write(next)
            })
            .await?;

        match rejection {
            Some(err) => Err(err),
            None => {
                tracing::info!(room_code = %code, team_id = %team_id, "team created");
                Ok(team_id)
            }
        }
    }

    /// Joins a team (idempotent for existing members), appending through
    /// the transaction so two concurrent joins both land.
    pub async fn join_team(
        &self,
        code: &RoomCode,
        player_name: &str,
        team_id: &TeamId,
        existing_id: Option<&PlayerId>,
    ) -> Result<PlayerId, RoomError> {
        if player_name.trim().is_empty() {
            return Err(RoomError::NameRequired);
        }
        let player_id = match existing_id {
            Some(id) => id.clone(),
            None => generate_player_token(&mut rand::rng()),
        };
        let team_size = self.options().team_size;

        let mut rejection = None;
        self.store()
            .transaction(code, |doc| {
                rejection = None;
                let Some(doc) = doc else {
                    rejection = Some(RoomError::NotFound(code.clone()));
                    return TxDecision::Abort;
                };
                let Some(team) = doc.teams.get(team_id) else {
                    rejection = Some(RoomError::TeamNotFound(team_id.clone()));
                    return TxDecision::Abort;
                };
                if team.member_ids.contains(&player_id) {
                    // Already on the team — reconnect, nothing to write.
                    return TxDecision::Abort;
                }
                if team.member_ids.len() >= team_size {
                    rejection = Some(RoomError::TeamFull(team_id.clone()));
                    return TxDecision::Abort;
                }
                let mut next = doc.clone();
                next.players.insert(
                    player_id.clone(),
                    PlayerEntry { name: player_name.trim().to_string(), position: None },
                );
                if let Some(team) = next.teams.get_mut(team_id) {
                    team.member_ids.push(player_id.clone());
                }
                TxDecision::Write(next)
            })
            .await?;

        match rejection {
            Some(err) => Err(err),
            None => {
                tracing::info!(room_code = %code, player_id = %player_id, team_id = %team_id, "player joined team");
                Ok(player_id)
            }
        }
    }

    /// Removes a member from a team; empty teams are dropped, and a room
    /// with no teams left is deleted entirely.
    pub async fn leave_team(
        &self,
        code: &RoomCode,
        player_id: &PlayerId,
        team_id: &TeamId,
    ) -> Result<(), RoomError> {
        self.store()
            .transaction(code, |doc| {
                let Some(doc) = doc else {
                    return TxDecision::Abort;
                };
                if !doc.teams.contains_key(team_id) {
                    return TxDecision::Abort;
                }
                let mut next = doc.clone();
                next.players.remove(player_id);
                let team_now_empty = match next.teams.get_mut(team_id) {
                    Some(team) => {
                        team.member_ids.retain(|id| id != player_id);
                        team.member_ids.is_empty()
                    }
                    None => false,
                };
                if team_now_empty {
                    next.teams.remove(team_id);
                    next.team_order.retain(|id| id != team_id);
                    if next.team_order.is_empty() {
                        return TxDecision::Delete;
                    }
                    next.current_turn_index %= next.team_order.len();
                }
                TxDecision::Write(next)
            })
            .await?;
        tracing::info!(room_code = %code, player_id = %player_id, team_id = %team_id, "player left team");
        Ok(())
    }

    /// Rolls for the active team. Any member may roll; the roll also pins
    /// this turn's answerer and describer from the rotation index.
    pub async fn roll_dice_team(
        &self,
        code: &RoomCode,
        player_id: &PlayerId,
    ) -> Result<RollEvent, RoomError> {
        let value: u8 = rand::rng().random_range(1..=6);

        let mut rejection = None;
        let mut rolled = None;
        self.store()
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
                let Some(team) =
                    doc.active_team().and_then(|id| doc.teams.get(id)).cloned()
                else {
                    rejection = Some(RoomError::NotFound(code.clone()));
                    return TxDecision::Abort;
                };

                let (answerer, describer) =
                    answerer_describer(&team.member_ids, team.answerer_rotation_index);

                let mut next = doc.clone();
                let roll = RollEvent { value, seq: next.take_seq() };
                next.current_roll = Some(roll);
                next.current_answerer_id = answerer;
                next.current_describer_id = describer;
                next.phase = RoomPhase::Playing;
                rolled = Some(roll);
                TxDecision::Write(next)
            })
            .await?;

        if let Some(err) = rejection {
            return Err(err);
        }
        let roll = rolled.expect("committed transaction recorded the roll");
        tracing::debug!(room_code = %code, player_id = %player_id, value = roll.value, seq = roll.seq, "team dice rolled");
        Ok(roll)
    }

    /// Advances to the next team's turn.
    ///
    /// Rotates the finishing team's answerer index so its roles swap next
    /// time around. When the cycle wraps back to the same team (single-team
    /// game) the freshly rotated index is used directly, so roles still
    /// rotate.
    pub async fn advance_team_turn(&self, code: &RoomCode) -> Result<(), RoomError> {
        self.scalar_update(code, |doc| {
            let Some(current_team_id) = doc.active_team().cloned() else {
                return;
            };
            let current = doc.teams.get(&current_team_id).cloned();
            let rotated_index = match &current {
                Some(team) if team.member_ids.len() > 1 => {
                    (team.answerer_rotation_index + 1) % team.member_ids.len() as u32
                }
                _ => 0,
            };

            let next_turn_index = (doc.current_turn_index + 1) % doc.team_order.len();
            let next_team_id = doc.team_order[next_turn_index].clone();
            let next_team = doc.teams.get(&next_team_id).cloned();

            let next_rotation = if next_team_id == current_team_id {
                rotated_index
            } else {
                next_team.as_ref().map(|t| t.answerer_rotation_index).unwrap_or(0)
            };
            let (answerer, describer) = match &next_team {
                Some(team) => answerer_describer(&team.member_ids, next_rotation),
                None => (None, None),
            };

            if let Some(team) = doc.teams.get_mut(&current_team_id) {
                team.answerer_rotation_index = rotated_index;
            }
            doc.current_turn_index = next_turn_index;
            doc.current_answerer_id = answerer;
            doc.current_describer_id = describer;
            doc.clear_turn_transients();
        })
        .await
    }

    /// Writes a team's new position, clamped and never decreasing.
    pub async fn update_team_position(
        &self,
        code: &RoomCode,
        team_id: &TeamId,
        new_position: u8,
    ) -> Result<(), RoomError> {
        self.scalar_update(code, move |doc| {
            if let Some(team) = doc.teams.get_mut(team_id) {
                team.position = team.position.max(new_position.min(FINISH));
            }
        })
        .await
    }

    /// Resets a team-mode game: positions and rotations to zero, first
    /// team's roles restored, reset epoch bumped.
    pub async fn reset_team_room(&self, code: &RoomCode) -> Result<(), RoomError> {
        let result = self
            .scalar_update(code, |doc| {
                for team in doc.teams.values_mut() {
                    team.position = 0;
                    team.answerer_rotation_index = 0;
                }
                let first = doc
                    .team_order
                    .first()
                    .and_then(|id| doc.teams.get(id))
                    .map(|team| answerer_describer(&team.member_ids, 0));
                let (answerer, describer) = first.unwrap_or((None, None));
                doc.current_turn_index = 0;
                doc.current_answerer_id = answerer;
                doc.current_describer_id = describer;
                doc.clear_turn_transients();
                doc.reset_epoch += 1;
            })
            .await;
        if result.is_ok() {
            tracing::info!(room_code = %code, "team room reset");
        }
        result
    }
}
