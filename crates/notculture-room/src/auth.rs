//! The turn-holder authorization guard.
//!
//! Authorization is cooperative, not cryptographic: one reusable
//! predicate, applied uniformly by every mutator that depends on whose
//! turn it is. A future move to verified identity only changes this
//! function's implementation.

use notculture_model::{PlayerId, RoomDoc, RoomMode};

use crate::RoomError;

/// An action gated on the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnAction {
    /// Roll the dice (and, implicitly, drive this turn's game logic).
    Roll,
    /// Answer the active question.
    Answer,
    /// Judge a tile minigame: run the timer and enter the score.
    Judge,
}

/// Checks whether `actor` may perform `action` in the room's current turn.
///
/// Individual mode: the active player rolls and answers; anyone *else*
/// judges. Team mode: any member of the active team rolls, the designated
/// answerer answers, and members of non-active teams judge.
pub fn authorize(doc: &RoomDoc, actor: &PlayerId, action: TurnAction) -> Result<(), RoomError> {
    let allowed = match doc.mode {
        RoomMode::Individual => {
            let is_active = doc.active_player() == Some(actor);
            match action {
                TurnAction::Roll | TurnAction::Answer => is_active,
                TurnAction::Judge => !is_active,
            }
        }
        RoomMode::Team => {
            let on_active_team = doc
                .active_team()
                .and_then(|id| doc.teams.get(id))
                .is_some_and(|team| team.member_ids.contains(actor));
            match action {
                TurnAction::Roll => on_active_team,
                TurnAction::Answer => doc.current_answerer_id.as_ref() == Some(actor),
                TurnAction::Judge => !on_active_team,
            }
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(RoomError::NotYourTurn(actor.clone()))
    }
}

#[cfg(test)]
mod tests {
    use notculture_model::{PlayerEntry, TeamEntry, TeamId};

    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn individual_doc() -> RoomDoc {
        let mut doc = RoomDoc::new(RoomMode::Individual, 0);
        for id in ["a", "b"] {
            doc.players.insert(
                pid(id),
                PlayerEntry { name: id.into(), position: Some(0) },
            );
            doc.player_order.push(pid(id));
        }
        doc
    }

    fn team_doc() -> RoomDoc {
        let mut doc = RoomDoc::new(RoomMode::Team, 0);
        for id in ["a", "b", "c", "d"] {
            doc.players.insert(pid(id), PlayerEntry { name: id.into(), position: None });
        }
        doc.teams.insert(
            TeamId::new("t1"),
            TeamEntry {
                name: "Reds".into(),
                member_ids: vec![pid("a"), pid("b")],
                position: 0,
                answerer_rotation_index: 0,
            },
        );
        doc.teams.insert(
            TeamId::new("t2"),
            TeamEntry {
                name: "Blues".into(),
                member_ids: vec![pid("c"), pid("d")],
                position: 0,
                answerer_rotation_index: 0,
            },
        );
        doc.team_order = vec![TeamId::new("t1"), TeamId::new("t2")];
        doc.current_answerer_id = Some(pid("a"));
        doc
    }

    #[test]
    fn test_active_player_may_roll_and_answer() {
        let doc = individual_doc();
        assert!(authorize(&doc, &pid("a"), TurnAction::Roll).is_ok());
        assert!(authorize(&doc, &pid("a"), TurnAction::Answer).is_ok());
    }

    #[test]
    fn test_non_active_player_rejected_for_roll() {
        let doc = individual_doc();
        assert!(matches!(
            authorize(&doc, &pid("b"), TurnAction::Roll),
            Err(RoomError::NotYourTurn(_))
        ));
    }

    #[test]
    fn test_judge_must_not_be_active_player() {
        let doc = individual_doc();
        assert!(authorize(&doc, &pid("b"), TurnAction::Judge).is_ok());
        assert!(authorize(&doc, &pid("a"), TurnAction::Judge).is_err());
    }

    #[test]
    fn test_any_active_team_member_may_roll() {
        let doc = team_doc();
        assert!(authorize(&doc, &pid("a"), TurnAction::Roll).is_ok());
        assert!(authorize(&doc, &pid("b"), TurnAction::Roll).is_ok());
        assert!(authorize(&doc, &pid("c"), TurnAction::Roll).is_err());
    }

    #[test]
    fn test_only_designated_answerer_may_answer() {
        let doc = team_doc();
        assert!(authorize(&doc, &pid("a"), TurnAction::Answer).is_ok());
        assert!(authorize(&doc, &pid("b"), TurnAction::Answer).is_err());
    }

    #[test]
    fn test_judge_must_be_off_active_team() {
        let doc = team_doc();
        assert!(authorize(&doc, &pid("c"), TurnAction::Judge).is_ok());
        assert!(authorize(&doc, &pid("b"), TurnAction::Judge).is_err());
    }
}
