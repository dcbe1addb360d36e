//! Error types for the client layer.

use notculture_room::RoomError;
use notculture_store::StoreError;

use crate::state::LocalPlayerId;

/// Errors surfaced to the UI layer by the turn drivers and session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A turn is already in progress; the duplicate request is dropped.
    #[error("turn is locked")]
    TurnLocked,

    /// An answer was submitted with no question active.
    #[error("no active question")]
    NoActiveQuestion,

    /// The content pool has nothing for this draw (empty bucket).
    #[error("no content available for this draw")]
    NoContent,

    /// The session has not been started (or was stopped).
    #[error("session not started")]
    NotStarted,

    /// The mutator rejected the operation.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The store itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the step-movement animator.
#[derive(Debug, thiserror::Error)]
pub enum AnimatorError {
    /// This player already has an animation in flight. The policy is to
    /// reject, not queue — callers that care await the running handle.
    #[error("player {0} is already animating")]
    Busy(LocalPlayerId),
}

/// Errors loading or saving the persisted local identity.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity file I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed identity file: {0}")]
    Parse(#[from] serde_json::Error),
}
