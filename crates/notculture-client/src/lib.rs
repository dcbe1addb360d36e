//! Client-side core for NotCulture: the synchronization engine, the pure
//! game-state reducer, the step animator, and the turn drivers for both
//! local and online play.
//!
//! # Architecture
//!
//! ```text
//! user input ─→ turn drivers ─→ RoomService mutators ─→ Room Store
//!                                                          │
//!               reducer  ←─ session task ←─ snapshot stream┘
//!                  │             │
//!                 UI  ←── SyncEffect stream (one-shot events)
//! ```
//!
//! Every client — the actor's own included — re-derives its view from the
//! store's full snapshots. [`diff`] computes what actually changed;
//! [`SyncTracker`] keys one-shot effects on monotonic sequence numbers so
//! redundant deliveries are absorbed; the [`GameState`] reducer holds the
//! canonical view with its never-go-backwards position guard; and the
//! [`Animator`] steps tokens one tile per tick without ever being rewound
//! by a stale snapshot.
//!
//! # Key types
//!
//! - [`OnlineSession`] — start/stop lifecycle around one joined room
//! - [`LocalGame`] — the same rules with no store, for same-device play
//! - [`GameState`] / [`Action`] — the pure reducer
//! - [`SyncEffect`] — the one-shot event stream the UI consumes
//! - [`Identity`] — persisted self-asserted identity for reconnects

mod action;
mod animator;
mod diff;
mod error;
mod identity;
mod local;
mod reducer;
mod session;
mod state;

pub use action::Action;
pub use animator::{AnimationHandle, Animator, StepEvent};
pub use diff::{DiffContext, SyncEffect, SyncTracker, diff, project_roster};
pub use error::{AnimatorError, ClientError, IdentityError};
pub use identity::Identity;
pub use local::{LocalGame, TurnPrompt};
pub use session::{Content, OnlineSession, SessionConfig};
pub use state::{
    GameState, LocalPlayer, LocalPlayerId, MAX_PLAYERS, MIN_PLAYERS, PLAYER_COLORS,
    PlayMode, color_for,
};
