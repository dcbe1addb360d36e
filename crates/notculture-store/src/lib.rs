//! Document-store boundary for NotCulture rooms.
//!
//! The room document is the only shared mutable resource in the whole
//! protocol, and this crate defines exactly how clients reach it: the
//! [`RoomStore`] trait with the five primitives the core requires —
//! read-one, atomic write, atomic in-place update, whole-document
//! transaction, subscribe-for-change, and delete. Any document-oriented
//! backend with these semantics (a managed cloud database or the bundled
//! [`MemoryStore`]) satisfies the interface.
//!
//! Methods are declared as `impl Future + Send` rather than `async fn`
//! so futures from a generic store can cross into spawned tasks;
//! implementors still write plain `async fn`.
//!
//! # Delivery model
//!
//! Subscriptions deliver **full current snapshots**, not deltas, with
//! at-least-once semantics: intermediate states may be coalesced and the
//! same state may be observed more than once. The synchronization engine
//! is built around this — it diffs against its previously seen snapshot
//! and keys one-shot effects on monotonic sequence numbers.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use std::future::Future;

use notculture_model::{RoomCode, RoomDoc};
use tokio::sync::watch;

/// What a transaction closure decided to do with the document it saw.
#[derive(Debug, Clone)]
pub enum TxDecision {
    /// Commit this document as the new state.
    Write(RoomDoc),
    /// Delete the document entirely.
    Delete,
    /// Leave the document untouched.
    Abort,
}

/// How a transaction concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    Deleted,
    Aborted,
}

/// A mutable room-document store.
///
/// Writers must use [`transaction`](RoomStore::transaction) for any field
/// more than one actor can mutate concurrently (`player_order`, team
/// member lists) — the closure re-runs against current state on
/// contention, so a blind read-modify-write can never drop a concurrent
/// append. Scalar single-writer fields may use
/// [`update`](RoomStore::update), which is last-write-wins.
pub trait RoomStore: Send + Sync + 'static {
    /// Reads the current document, or `None` if the room does not exist.
    fn read(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<RoomDoc>, StoreError>> + Send;

    /// Replaces the whole document, creating the room if absent.
    fn write(
        &self,
        code: &RoomCode,
        doc: RoomDoc,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Applies `f` to the current document atomically.
    ///
    /// Returns `false` (without calling `f`) when the room does not exist.
    fn update<F>(
        &self,
        code: &RoomCode,
        f: F,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send
    where
        F: FnOnce(&mut RoomDoc) + Send;

    /// Runs an atomic read-validate-write transaction on the document.
    ///
    /// `f` sees the current state (`None` if the room is absent) and
    /// returns a [`TxDecision`]. On contention the closure may be invoked
    /// again with fresher state, so it must be side-effect free apart from
    /// captured outputs.
    fn transaction<F>(
        &self,
        code: &RoomCode,
        f: F,
    ) -> impl Future<Output = Result<TxOutcome, StoreError>> + Send
    where
        F: FnMut(Option<&RoomDoc>) -> TxDecision + Send;

    /// Subscribes to the room's snapshot stream.
    ///
    /// The receiver always holds the latest full snapshot (`None` once the
    /// room is deleted). Subscribing to a room that does not exist yet is
    /// allowed; the first snapshot arrives when it is created.
    fn subscribe(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<watch::Receiver<Option<RoomDoc>>, StoreError>> + Send;

    /// Deletes the room document. Deleting an absent room is a no-op.
    fn delete(&self, code: &RoomCode) -> impl Future<Output = Result<(), StoreError>> + Send;
}
