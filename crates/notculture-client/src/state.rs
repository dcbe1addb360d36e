//! The canonical client-side view of a game.
//!
//! [`GameState`] is a reprojection, not a mirror, of the room document:
//! opaque player tokens become small sequential integers for rendering
//! stability, and everything the UI needs (modal flags, locks, pending
//! moves) lives here. Both local and online play route through this one
//! state; online mode's transitions are driven by the synchronization
//! engine instead of direct user input.

use notculture_model::{AnswerResult, Category};
use notculture_questions::{NotCard, Question};

/// Small sequential player index (1-based), reprojected from room order.
pub type LocalPlayerId = u8;

pub const MIN_PLAYERS: usize = 1;
pub const MAX_PLAYERS: usize = 4;

/// Token colors by local player id.
pub const PLAYER_COLORS: [&str; MAX_PLAYERS] = ["#ef4444", "#3b82f6", "#eab308", "#f715e8"];

pub fn color_for(id: LocalPlayerId) -> &'static str {
    PLAYER_COLORS[(id as usize).saturating_sub(1) % PLAYER_COLORS.len()]
}

/// A player (or, in team mode, a team projected as a player) as the UI
/// sees it. Recomputed on every room snapshot; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPlayer {
    pub id: LocalPlayerId,
    pub name: String,
    pub position: u8,
}

impl LocalPlayer {
    pub fn new(id: LocalPlayerId, name: impl Into<String>, position: u8) -> Self {
        Self { id, name: name.into(), position }
    }

    pub fn color(&self) -> &'static str {
        color_for(self.id)
    }
}

/// Same-device vs. network-driven play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    Local,
    Online,
}

/// The full client-side game state. Mutated only through
/// [`GameState::apply`](crate::Action).
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub play_mode: PlayMode,
    pub players: Vec<LocalPlayer>,
    pub current_turn_index: usize,

    pub active_question: Option<Question>,
    /// Steps owed to the current player once their question resolves.
    pub pending_move: u8,
    pub pending_category: Option<Category>,
    /// Set when a roll is requested, cleared when the turn fully resolves.
    pub turn_locked: bool,
    pub answer_result: Option<AnswerResult>,

    pub show_win_modal: bool,
    pub show_question_modal: bool,
    pub show_culture_modal: bool,
    pub show_not_modal: bool,

    pub culture_prompt_index: Option<usize>,
    pub culture_timer_started_at: Option<u64>,
    pub culture_score: Option<u8>,
    pub not_timer_started_at: Option<u64>,
    pub not_score: Option<u8>,
    pub current_not_card: Option<NotCard>,

    /// Local-mode roster, parked while online so switching back restores
    /// progress instead of resetting it.
    pub(crate) parked_local_roster: Vec<LocalPlayer>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            play_mode: PlayMode::Local,
            players: default_local_roster(),
            current_turn_index: 0,
            active_question: None,
            pending_move: 0,
            pending_category: None,
            turn_locked: false,
            answer_result: None,
            show_win_modal: false,
            show_question_modal: false,
            show_culture_modal: false,
            show_not_modal: false,
            culture_prompt_index: None,
            culture_timer_started_at: None,
            culture_score: None,
            not_timer_started_at: None,
            not_score: None,
            current_not_card: None,
            parked_local_roster: Vec::new(),
        }
    }
}

pub(crate) fn default_local_roster() -> Vec<LocalPlayer> {
    vec![
        LocalPlayer::new(1, "Player 1", 0),
        LocalPlayer::new(2, "Player 2", 0),
    ]
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The player whose turn it is.
    pub fn current_player(&self) -> Option<&LocalPlayer> {
        self.players.get(self.current_turn_index)
    }

    pub fn player(&self, id: LocalPlayerId) -> Option<&LocalPlayer> {
        self.players.iter().find(|p| p.id == id)
    }
}
