//! Snapshot diffing — the core correctness mechanism of online play.
//!
//! The store delivers a **full current state** on every change, so the
//! engine itself must compute what changed to decide which one-shot side
//! effects to fire (start an animation, open a modal, play a cue), and
//! must fire each exactly once despite redundant deliveries.
//!
//! [`diff`] is a pure function: the previously seen snapshot is an
//! explicit parameter, never an implicit side channel, so the whole
//! reconciliation algorithm is unit-testable without a live store.
//! [`SyncTracker`] is the thin stateful wrapper that feeds it and keeps
//! the bookkeeping (previous snapshot, processed roll sequence, reset
//! epoch, mid-animation players).

use std::collections::HashSet;

use notculture_model::{
    AnswerResult, PlayerId, QuestionId, RoomDoc, RoomMode, TeamId, TileKind,
    TilePayload,
};
use notculture_rules::FINISH;

use crate::state::{LocalPlayer, LocalPlayerId};

/// Everything [`diff`] needs beyond the two snapshots.
pub struct DiffContext<'a> {
    /// This client's own identity; its slot always passes through
    /// untouched (the reducer's monotonic guard covers it).
    pub my_player_id: Option<&'a PlayerId>,
    /// This client's team (team mode), for locating its own slot.
    pub my_team_id: Option<&'a TeamId>,
    /// Players currently mid-animation on this client; their snapshot
    /// positions are suppressed in favor of the local in-progress ones.
    pub animating: &'a HashSet<LocalPlayerId>,
    /// Current local positions, used for the suppression above.
    pub local_players: &'a [LocalPlayer],
    /// Last roll sequence this client already processed.
    pub last_roll_seq: Option<u64>,
    /// Last reset epoch this client has seen.
    pub last_reset_epoch: Option<u64>,
    pub now_ms: u64,
    pub ttl_ms: u64,
}

/// One-shot outcomes of a snapshot, in dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEffect {
    /// The room is past its TTL; delete it and hard-reset locally.
    /// Always the sole effect of its snapshot.
    RoomExpired,
    /// `reset_epoch` changed; hard-reset locally and ignore the rest of
    /// this snapshot. Always the sole effect.
    HardReset,
    /// The room document disappeared (deleted by the last leaver).
    RoomClosed,
    /// The reprojected roster and turn index, positions already
    /// reconciled against in-flight animations.
    Roster {
        players: Vec<LocalPlayer>,
        turn_index: usize,
        my_slot: Option<LocalPlayerId>,
        is_my_turn: bool,
    },
    /// A non-local player's position advanced: animate it.
    StartMove { player: LocalPlayerId, from: u8, steps: u8 },
    /// A fresh dice roll. Every client animates the dice; only the
    /// turn-holder proceeds to drive game logic afterwards.
    DiceRolled { value: u8, seq: u64, is_my_turn: bool },
    /// A question went live (resolve it from the local pool).
    QuestionOpened { id: QuestionId, roll_value: u8 },
    QuestionClosed,
    /// The answer result appeared; non-submitting clients cue a sound.
    AnswerResolved { result: AnswerResult, by_me: bool },
    AnswerCleared,
    TileOpened { payload: TilePayload },
    TileClosed { kind: TileKind },
    TileTimerStarted { kind: TileKind, started_at: u64 },
    TileScoreRevealed { kind: TileKind, score: u8 },
    /// A player reached the finish tile (shown immediately, without
    /// waiting for the movement animation).
    WinReached { player: LocalPlayerId },
}

/// Projects the room roster into local players: players in individual
/// mode, teams-as-players in team mode. Entries missing from the map are
/// skipped (a transiently inconsistent snapshot must not panic).
pub fn project_roster(doc: &RoomDoc) -> Vec<LocalPlayer> {
    match doc.mode {
        RoomMode::Individual => doc
            .player_order
            .iter()
            .filter_map(|id| doc.players.get(id))
            .enumerate()
            .map(|(i, entry)| {
                LocalPlayer::new(i as u8 + 1, entry.name.clone(), entry.position.unwrap_or(0))
            })
            .collect(),
        RoomMode::Team => doc
            .team_order
            .iter()
            .filter_map(|id| doc.teams.get(id))
            .enumerate()
            .map(|(i, team)| LocalPlayer::new(i as u8 + 1, team.name.clone(), team.position))
            .collect(),
    }
}

fn my_slot(
    doc: &RoomDoc,
    my_player: Option<&PlayerId>,
    my_team: Option<&TeamId>,
) -> Option<LocalPlayerId> {
    let index = match doc.mode {
        RoomMode::Individual => doc
            .player_order
            .iter()
            .filter(|id| doc.players.contains_key(*id))
            .position(|id| Some(id) == my_player),
        RoomMode::Team => doc
            .team_order
            .iter()
            .filter(|id| doc.teams.contains_key(*id))
            .position(|id| Some(id) == my_team),
    };
    index.map(|i| i as u8 + 1)
}

fn is_my_turn(doc: &RoomDoc, my_player: Option<&PlayerId>) -> bool {
    match doc.mode {
        RoomMode::Individual => {
            my_player.is_some_and(|me| doc.active_player() == Some(me))
        }
        // In team mode the designated answerer drives this turn's logic.
        RoomMode::Team => {
            my_player.is_some_and(|me| doc.current_answerer_id.as_ref() == Some(me))
        }
    }
}

/// Derives the one-shot effects of `next` given the previously seen
/// snapshot. Expiry and reset short-circuit: their snapshot carries no
/// other meaning.
pub fn diff(ctx: &DiffContext<'_>, prev: Option<&RoomDoc>, next: &RoomDoc) -> Vec<SyncEffect> {
    if next.is_expired(ctx.now_ms, ctx.ttl_ms) {
        return vec![SyncEffect::RoomExpired];
    }
    if ctx.last_reset_epoch.is_some_and(|last| next.reset_epoch != last) {
        return vec![SyncEffect::HardReset];
    }

    let mut effects = Vec::new();
    let previous = prev.map(project_roster).unwrap_or_default();
    let my_slot = my_slot(next, ctx.my_player_id, ctx.my_team_id);
    let my_turn = is_my_turn(next, ctx.my_player_id);

    // Position reconciliation: never rewind an in-flight animation, and
    // start one when a non-local position advanced.
    let mut moves = Vec::new();
    let mut wins = Vec::new();
    let players: Vec<LocalPlayer> = project_roster(next)
        .into_iter()
        .map(|player| {
            if Some(player.id) == my_slot {
                return player;
            }
            if ctx.animating.contains(&player.id) {
                // Mid-animation: hold the locally stepped position so this
                // snapshot cannot interrupt or restart the movement.
                if let Some(local) = ctx.local_players.iter().find(|p| p.id == player.id) {
                    return LocalPlayer { position: local.position, ..player };
                }
                return player;
            }
            if let Some(prev_player) = previous.iter().find(|p| p.id == player.id) {
                if player.position > prev_player.position {
                    moves.push(SyncEffect::StartMove {
                        player: player.id,
                        from: prev_player.position,
                        steps: player.position - prev_player.position,
                    });
                    if player.position >= FINISH {
                        wins.push(SyncEffect::WinReached { player: player.id });
                    }
                    // Dispatch the old position; the animation advances it.
                    return LocalPlayer { position: prev_player.position, ..player };
                }
            }
            player
        })
        .collect();

    effects.push(SyncEffect::Roster {
        players,
        turn_index: next.current_turn_index,
        my_slot,
        is_my_turn: my_turn,
    });
    effects.extend(moves);

    // Roll: keyed on the monotonic sequence, fired once per actual roll.
    if let Some(roll) = next.current_roll {
        if ctx.last_roll_seq != Some(roll.seq) {
            effects.push(SyncEffect::DiceRolled {
                value: roll.value,
                seq: roll.seq,
                is_my_turn: my_turn,
            });
        }
    }

    // Question open/close transitions.
    let prev_question = prev.and_then(|d| d.current_question_id.as_ref());
    match (&next.current_question_id, prev_question) {
        (Some(id), previous_id) if previous_id != Some(id) => {
            effects.push(SyncEffect::QuestionOpened {
                id: id.clone(),
                roll_value: next.current_roll.map(|r| r.value).unwrap_or(1),
            });
        }
        (None, Some(_)) => effects.push(SyncEffect::QuestionClosed),
        _ => {}
    }

    // Answer result appears at most once per question.
    let prev_answer = prev.and_then(|d| d.answer_result);
    match (next.answer_result, prev_answer) {
        (Some(result), None) => {
            effects.push(SyncEffect::AnswerResolved { result, by_me: my_turn });
        }
        (None, Some(_)) => effects.push(SyncEffect::AnswerCleared),
        _ => {}
    }

    // Tile event transitions, field by field.
    let prev_tile = prev.and_then(|d| d.tile_event.as_ref());
    let next_tile = next.tile_event.as_ref();
    let was_active = prev_tile.is_some_and(|t| t.active);
    let now_active = next_tile.is_some_and(|t| t.active);

    if now_active && !was_active {
        if let Some(tile) = next_tile {
            effects.push(SyncEffect::TileOpened { payload: tile.payload.clone() });
        }
    }
    if was_active && !now_active {
        if let Some(tile) = prev_tile {
            effects.push(SyncEffect::TileClosed { kind: tile.payload.kind() });
        }
    }
    if let Some(tile) = next_tile {
        if let Some(started_at) = tile.timer_started_at {
            if prev_tile.and_then(|t| t.timer_started_at) != Some(started_at) {
                effects.push(SyncEffect::TileTimerStarted {
                    kind: tile.payload.kind(),
                    started_at,
                });
            }
        }
        if let Some(score) = tile.score {
            if prev_tile.and_then(|t| t.score).is_none() {
                effects.push(SyncEffect::TileScoreRevealed {
                    kind: tile.payload.kind(),
                    score,
                });
            }
        }
    }

    effects.extend(wins);
    effects
}

// ---------------------------------------------------------------------------
// SyncTracker
// ---------------------------------------------------------------------------

/// The stateful rim around [`diff`]: holds the previous snapshot and the
/// idempotency bookkeeping, one instance per online session.
#[derive(Default)]
pub struct SyncTracker {
    prev: Option<RoomDoc>,
    last_roll_seq: Option<u64>,
    last_reset_epoch: Option<u64>,
    animating: HashSet<LocalPlayerId>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one incoming snapshot and returns its effects, updating
    /// all bookkeeping for the next call.
    pub fn observe(
        &mut self,
        next: &RoomDoc,
        my_player: Option<&PlayerId>,
        my_team: Option<&TeamId>,
        local_players: &[LocalPlayer],
        now_ms: u64,
        ttl_ms: u64,
    ) -> Vec<SyncEffect> {
        let effects = {
            let ctx = DiffContext {
                my_player_id: my_player,
                my_team_id: my_team,
                animating: &self.animating,
                local_players,
                last_roll_seq: self.last_roll_seq,
                last_reset_epoch: self.last_reset_epoch,
                now_ms,
                ttl_ms,
            };
            diff(&ctx, self.prev.as_ref(), next)
        };

        if matches!(effects.first(), Some(SyncEffect::RoomExpired)) {
            // The room is about to be deleted; forget everything.
            *self = Self::new();
            return effects;
        }
        if matches!(effects.first(), Some(SyncEffect::HardReset)) {
            self.animating.clear();
        }
        for effect in &effects {
            if let SyncEffect::StartMove { player, .. } = effect {
                self.animating.insert(*player);
            }
        }

        self.last_reset_epoch = Some(next.reset_epoch);
        // A cleared roll resets the key so the next turn's roll always
        // reads as fresh, mirroring the turn-transient clearing.
        self.last_roll_seq = next.current_roll.map(|r| r.seq);
        self.prev = Some(next.clone());
        effects
    }

    /// Marks a player's animation finished; its next snapshot position
    /// flows through normally again.
    pub fn finish_animation(&mut self, player: LocalPlayerId) {
        self.animating.remove(&player);
    }

    pub fn is_animating(&self, player: LocalPlayerId) -> bool {
        self.animating.contains(&player)
    }
}
