//! Write-side room protocol for NotCulture.
//!
//! Every state change to a shared room flows through one of the mutators
//! on [`RoomService`]. Each mutator is a small, independently callable
//! operation with a precondition/effect contract: it reads (or assumes) a
//! precondition, validates it against *current* store state, and writes a
//! consistent next state — or rejects with a [`RoomError`] and changes
//! nothing.
//!
//! Two structural rules keep concurrent writers safe:
//!
//! - Any field more than one actor can mutate (`player_order`, team member
//!   lists, tile-event activation) goes through the store's transaction
//!   primitive — never a blind read-modify-write.
//! - Scalar per-turn fields (roll, question, answer result) are
//!   last-write-wins, which is safe because only the turn-holder is
//!   authorized to write them ([`authorize`]).
//!
//! # Key types
//!
//! - [`RoomService`] — the mutator set, generic over any [`RoomStore`](notculture_store::RoomStore)
//! - [`RoomOptions`] — TTL and roster limits
//! - [`authorize`] / [`TurnAction`] — the single turn-holder guard
//! - [`RoomError`] — rejection taxonomy

mod auth;
mod codes;
mod config;
mod error;
mod service;
mod teams;

pub use auth::{TurnAction, authorize};
pub use codes::{generate_player_token, generate_room_code, generate_team_token};
pub use config::RoomOptions;
pub use error::RoomError;
pub use service::RoomService;
