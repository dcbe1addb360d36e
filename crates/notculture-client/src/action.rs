//! Actions — the closed set of transitions over [`GameState`](crate::GameState).

use notculture_model::{AnswerResult, Category};
use notculture_questions::{NotCard, Question};

use crate::state::{LocalPlayer, LocalPlayerId, PlayMode};

/// Every way the client state can change. The reducer is total over this
/// enum: unknown situations are no-ops, never panics.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // -- Local roster management --
    AddPlayer,
    RemovePlayer,
    RenamePlayer { id: LocalPlayerId, name: String },

    // -- Turn bracket --
    AdvanceTurn,
    LockTurn,
    UnlockTurn,

    // -- Questions --
    SetActiveQuestion { question: Question, roll: u8 },
    ClearQuestion,
    SetAnswerResult(Option<AnswerResult>),
    SetPendingCategory(Option<Category>),

    // -- Movement --
    /// Move a player by steps, clamped to the finish tile (rules layer).
    MovePlayer { id: LocalPlayerId, steps: u8 },
    /// Set one player's position directly — the animation stepper's
    /// action. Network sync uses `SyncOnlineState` instead.
    SetPlayerPosition { id: LocalPlayerId, position: u8 },

    // -- Mode and reset --
    SetPlayMode(PlayMode),
    ResetGame,

    // -- Modals --
    ShowWinModal(bool),
    ShowQuestionModal(bool),
    ShowCultureModal(bool),
    ShowNotModal(bool),

    // -- Tile minigames --
    SetCulturePromptIndex(Option<usize>),
    SetCultureTimerStart(Option<u64>),
    SetCultureScore(Option<u8>),
    SetNotTimerStart(Option<u64>),
    SetNotScore(Option<u8>),
    SetNotCard(Option<NotCard>),

    // -- Network sync --
    /// The sole entry point for network-driven roster/turn updates.
    /// Positions pass through a per-player monotonic guard; a changed
    /// turn index force-clears the turn lock.
    SyncOnlineState { players: Vec<LocalPlayer>, turn_index: usize },
}
