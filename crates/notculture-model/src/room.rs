//! The room document — the authoritative shared state for one session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{PlayerId, QuestionId, TeamId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether turns rotate over individual players or teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomMode {
    Individual,
    Team,
}

/// Coarse room lifecycle, mostly informational for lobby UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Waiting,
    Playing,
}

/// Trivia categories. The board rotates through these by path index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Film,
    Science,
    General,
    History,
}

impl Category {
    /// All categories in board-rotation order.
    pub const ALL: [Category; 4] = [
        Category::Film,
        Category::Science,
        Category::General,
        Category::History,
    ];

    /// Human-readable label for UI display.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Film => "Film & TV",
            Category::Science => "Science & Technology",
            Category::General => "General Knowledge",
            Category::History => "History & Arts",
        }
    }
}

/// Which special-tile minigame a [`TileEvent`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    Culture,
    Not,
}

// ---------------------------------------------------------------------------
// Nested document values
// ---------------------------------------------------------------------------

/// One player's entry in the room's player map.
///
/// `position` is absent in team mode — the team carries the token there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u8>,
}

/// One team's entry in the room's team map (team mode only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEntry {
    pub name: String,
    /// Ordered members, at most two per team.
    pub member_ids: Vec<PlayerId>,
    pub position: u8,
    /// Rotates each time this team finishes a turn, selecting which member
    /// answers vs. describes.
    pub answerer_rotation_index: u32,
}

/// The active dice roll.
///
/// `seq` changes on every new roll so a client can tell a fresh roll from
/// a redelivered snapshot of one it already animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollEvent {
    pub value: u8,
    pub seq: u64,
}

/// The resolution of the active question, broadcast so every client shows
/// identical feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResult {
    pub selected_index: u8,
    pub correct_index: u8,
    pub was_correct: bool,
}

/// The describe-and-guess card carried inside a Not tile event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotCardData {
    pub id: String,
    pub answers: Vec<String>,
}

/// Tile-specific content for an active [`TileEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum TilePayload {
    /// Performance-and-judge minigame; the prompt is drawn deterministically
    /// by a seed, so only its index travels on the wire.
    Culture { prompt_index: usize },
    /// Describe-and-guess minigame; the drawing client ships the whole card
    /// so every client shows the same answers.
    Not { card: NotCardData },
}

impl TilePayload {
    pub fn kind(&self) -> TileKind {
        match self {
            TilePayload::Culture { .. } => TileKind::Culture,
            TilePayload::Not { .. } => TileKind::Not,
        }
    }
}

/// An in-flight Culture or Not minigame.
///
/// "Finish early" is expressed by backdating `timer_started_at`, so all
/// clients' independently computed countdowns converge to zero without a
/// separate cancellation signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileEvent {
    #[serde(flatten)]
    pub payload: TilePayload,
    pub active: bool,
    /// Unix millis when the judge started the countdown.
    pub timer_started_at: Option<u64>,
    /// Judge-entered score; its first appearance is the score-reveal event.
    pub score: Option<u8>,
}

impl TileEvent {
    /// A freshly activated event: timer not started, no score yet.
    pub fn activated(payload: TilePayload) -> Self {
        Self {
            payload,
            active: true,
            timer_started_at: None,
            score: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomDoc
// ---------------------------------------------------------------------------

/// The authoritative shared document for one game session.
///
/// Key invariants, maintained by every mutator:
/// - `player_order` / `team_order` are permutation-subsets of the `players`
///   / `teams` keys — no dangling references.
/// - `current_turn_index < roster_len()` after any mutation.
/// - Positions never decrease within one game (until a reset), clamped to
///   the finish tile.
/// - A room with an empty roster is deleted, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDoc {
    /// Unix millis at creation; rooms expire a fixed TTL after this,
    /// checked lazily on read/subscribe.
    pub created_at: u64,
    pub phase: RoomPhase,
    pub mode: RoomMode,
    pub players: BTreeMap<PlayerId, PlayerEntry>,
    /// Turn sequence over `players` keys. Map order carries no meaning.
    pub player_order: Vec<PlayerId>,
    #[serde(default)]
    pub teams: BTreeMap<TeamId, TeamEntry>,
    #[serde(default)]
    pub team_order: Vec<TeamId>,
    /// Index into `player_order` (individual) or `team_order` (team).
    pub current_turn_index: usize,
    pub current_roll: Option<RollEvent>,
    pub current_question_id: Option<QuestionId>,
    pub answer_result: Option<AnswerResult>,
    pub tile_event: Option<TileEvent>,
    /// Bumped on every full-game reset; clients watch for a change to
    /// distinguish "reset" from a normal update.
    pub reset_epoch: u64,
    /// Team mode: the member currently authorized to answer.
    pub current_answerer_id: Option<PlayerId>,
    /// Team mode: the member currently describing.
    pub current_describer_id: Option<PlayerId>,
    /// Source of the next event sequence number ([`RollEvent::seq`]).
    pub next_event_seq: u64,
}

impl RoomDoc {
    /// An empty document in the given mode; the caller fills the roster.
    pub fn new(mode: RoomMode, created_at: u64) -> Self {
        Self {
            created_at,
            phase: RoomPhase::Waiting,
            mode,
            players: BTreeMap::new(),
            player_order: Vec::new(),
            teams: BTreeMap::new(),
            team_order: Vec::new(),
            current_turn_index: 0,
            current_roll: None,
            current_question_id: None,
            answer_result: None,
            tile_event: None,
            reset_epoch: 0,
            current_answerer_id: None,
            current_describer_id: None,
            next_event_seq: 1,
        }
    }

    /// Number of turn-taking entities: players in individual mode, teams
    /// in team mode.
    pub fn roster_len(&self) -> usize {
        match self.mode {
            RoomMode::Individual => self.player_order.len(),
            RoomMode::Team => self.team_order.len(),
        }
    }

    /// The player whose turn it is (individual mode).
    pub fn active_player(&self) -> Option<&PlayerId> {
        self.player_order.get(self.current_turn_index)
    }

    /// The team whose turn it is (team mode).
    pub fn active_team(&self) -> Option<&TeamId> {
        self.team_order.get(self.current_turn_index)
    }

    /// Lazy expiry check against the room TTL.
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at) > ttl_ms
    }

    /// Takes the next monotonic event sequence number.
    pub fn take_seq(&mut self) -> u64 {
        let seq = self.next_event_seq;
        self.next_event_seq += 1;
        seq
    }

    /// Clears every per-turn transient field in one place — the critical
    /// state-transition boundary between turns.
    pub fn clear_turn_transients(&mut self) {
        self.current_roll = None;
        self.current_question_id = None;
        self.answer_result = None;
        self.tile_event = None;
    }

    /// Whether the order lists reference only existing map entries, with
    /// no duplicates. Mutators keep this true; tests assert it.
    pub fn order_consistent(&self) -> bool {
        let players_ok = self.player_order.iter().all(|id| self.players.contains_key(id))
            && !has_duplicates(&self.player_order);
        let teams_ok = self.team_order.iter().all(|id| self.teams.contains_key(id))
            && !has_duplicates(&self.team_order);
        players_ok && teams_ok
    }
}

fn has_duplicates<T: Ord>(items: &[T]) -> bool {
    let mut seen = std::collections::BTreeSet::new();
    items.iter().any(|item| !seen.insert(item))
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON-shape tests pinning the wire contract, plus document helpers.

    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn doc_with_players(ids: &[&str]) -> RoomDoc {
        let mut doc = RoomDoc::new(RoomMode::Individual, 1_000);
        for id in ids {
            doc.players.insert(
                pid(id),
                PlayerEntry {
                    name: format!("name-{id}"),
                    position: Some(0),
                },
            );
            doc.player_order.push(pid(id));
        }
        doc
    }

    // =====================================================================
    // JSON shapes
    // =====================================================================

    #[test]
    fn test_room_doc_serializes_camel_case() {
        let doc = doc_with_players(&["a"]);
        let json: serde_json::Value = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["createdAt"], 1_000);
        assert_eq!(json["mode"], "individual");
        assert_eq!(json["phase"], "waiting");
        assert_eq!(json["playerOrder"], serde_json::json!(["a"]));
        assert_eq!(json["currentTurnIndex"], 0);
        assert!(json["currentRoll"].is_null());
        assert!(json["tileEvent"].is_null());
        assert_eq!(json["resetEpoch"], 0);
        assert_eq!(json["nextEventSeq"], 1);
    }

    #[test]
    fn test_player_entry_omits_absent_position() {
        let entry = PlayerEntry {
            name: "Alice".into(),
            position: None,
        };
        let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
        assert!(json.get("position").is_none());
    }

    #[test]
    fn test_roll_event_json_format() {
        let roll = RollEvent { value: 4, seq: 7 };
        let json: serde_json::Value = serde_json::to_value(&roll).unwrap();
        assert_eq!(json, serde_json::json!({ "value": 4, "seq": 7 }));
    }

    #[test]
    fn test_tile_event_culture_json_format() {
        let event = TileEvent::activated(TilePayload::Culture { prompt_index: 3 });
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "culture");
        assert_eq!(json["promptIndex"], 3);
        assert_eq!(json["active"], true);
        assert!(json["timerStartedAt"].is_null());
        assert!(json["score"].is_null());
    }

    #[test]
    fn test_tile_event_not_round_trip() {
        let event = TileEvent {
            payload: TilePayload::Not {
                card: NotCardData {
                    id: "n-01".into(),
                    answers: vec!["cat".into(), "dog".into()],
                },
            },
            active: true,
            timer_started_at: Some(5_000),
            score: Some(4),
        };
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: TileEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn test_team_entry_json_format() {
        let team = TeamEntry {
            name: "Reds".into(),
            member_ids: vec![pid("a"), pid("b")],
            position: 5,
            answerer_rotation_index: 1,
        };
        let json: serde_json::Value = serde_json::to_value(&team).unwrap();

        assert_eq!(json["memberIds"], serde_json::json!(["a", "b"]));
        assert_eq!(json["answererRotationIndex"], 1);
    }

    #[test]
    fn test_room_doc_round_trip() {
        let mut doc = doc_with_players(&["a", "b"]);
        doc.current_roll = Some(RollEvent { value: 6, seq: 2 });
        doc.answer_result = Some(AnswerResult {
            selected_index: 1,
            correct_index: 1,
            was_correct: true,
        });
        let bytes = serde_json::to_vec(&doc).unwrap();
        let decoded: RoomDoc = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc, decoded);
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Science).unwrap();
        assert_eq!(json, "\"science\"");
    }

    // =====================================================================
    // Document helpers
    // =====================================================================

    #[test]
    fn test_active_player_follows_turn_index() {
        let mut doc = doc_with_players(&["a", "b", "c"]);
        assert_eq!(doc.active_player(), Some(&pid("a")));
        doc.current_turn_index = 2;
        assert_eq!(doc.active_player(), Some(&pid("c")));
    }

    #[test]
    fn test_take_seq_is_monotonic() {
        let mut doc = doc_with_players(&["a"]);
        assert_eq!(doc.take_seq(), 1);
        assert_eq!(doc.take_seq(), 2);
        assert_eq!(doc.next_event_seq, 3);
    }

    #[test]
    fn test_is_expired_honors_ttl() {
        let doc = RoomDoc::new(RoomMode::Individual, 1_000);
        assert!(!doc.is_expired(1_000, 3_600_000));
        assert!(!doc.is_expired(3_601_000, 3_600_000));
        assert!(doc.is_expired(3_601_001, 3_600_000));
    }

    #[test]
    fn test_clear_turn_transients_clears_all_four() {
        let mut doc = doc_with_players(&["a"]);
        doc.current_roll = Some(RollEvent { value: 3, seq: 1 });
        doc.current_question_id = Some(QuestionId::new("q1"));
        doc.answer_result = Some(AnswerResult {
            selected_index: 0,
            correct_index: 0,
            was_correct: true,
        });
        doc.tile_event = Some(TileEvent::activated(TilePayload::Culture {
            prompt_index: 0,
        }));

        doc.clear_turn_transients();

        assert!(doc.current_roll.is_none());
        assert!(doc.current_question_id.is_none());
        assert!(doc.answer_result.is_none());
        assert!(doc.tile_event.is_none());
    }

    #[test]
    fn test_order_consistent_detects_dangling_reference() {
        let mut doc = doc_with_players(&["a", "b"]);
        assert!(doc.order_consistent());
        doc.players.remove(&pid("b"));
        assert!(!doc.order_consistent());
    }

    #[test]
    fn test_order_consistent_detects_duplicate() {
        let mut doc = doc_with_players(&["a"]);
        doc.player_order.push(pid("a"));
        assert!(!doc.order_consistent());
    }
}
