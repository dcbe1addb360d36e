//! Shared room document schema for NotCulture.
//!
//! This crate defines the "language" every client speaks through the
//! document store: the room document and everything nested in it. A room
//! is the single source of truth for one game session — N independently
//! clocked clients read and write it, and each one re-derives its local
//! view from full snapshots of these types.
//!
//! # Wire contract
//!
//! The document is shared with browser clients through the store, so the
//! serialized field names are part of the wire contract. Every struct uses
//! `camelCase` renames and the JSON shapes are pinned by unit tests.
//!
//! # Idempotency keys
//!
//! Event identity is carried by explicit per-room monotonic sequence
//! numbers ([`RollEvent::seq`], [`RoomDoc::reset_epoch`]), never by
//! wall-clock tokens — "have I seen this already" is an integer compare
//! with no clock-skew risk.

mod ids;
mod room;

pub use ids::{PlayerId, QuestionId, RoomCode, TeamId};
pub use room::{
    AnswerResult, Category, NotCardData, PlayerEntry, RollEvent, RoomDoc,
    RoomMode, RoomPhase, TeamEntry, TileEvent, TileKind, TilePayload,
};
