//! Error types for room mutations.

use notculture_model::{PlayerId, RoomCode, TeamId};
use notculture_store::StoreError;

/// Why a room mutation was rejected.
///
/// Rejections are ordinary outcomes in the cooperative-client model: the
/// caller's UI treats them as "nothing happened" rather than retrying.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist — including rooms discovered to be past
    /// their TTL, which are deleted and then reported as not found.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The caller is not the current turn-holder for this action.
    #[error("player {0} is not the turn-holder")]
    NotYourTurn(PlayerId),

    /// No player (or team) slots left.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The team already has its maximum number of members.
    #[error("team {0} is full")]
    TeamFull(TeamId),

    /// The referenced team does not exist in this room.
    #[error("team {0} not found")]
    TeamNotFound(TeamId),

    /// A tile event is already active; the concurrent activation lost the
    /// race and must not overwrite it.
    #[error("a tile event is already active")]
    TileEventActive,

    /// A display name is required to create or join a room.
    #[error("player name required")]
    NameRequired,

    /// The store itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
