//! In-process room store with equivalent semantics to a remote document
//! database: full-snapshot change notification, atomic transactions, and
//! latest-wins coalescing on the subscription stream.
//!
//! One `tokio::sync::watch` channel per room carries the snapshot stream.
//! A `watch` receiver observes the *latest* value, which matches the
//! remote-store contract exactly: clients are promised the current state
//! at least once per change, never every intermediate state.

use std::collections::HashMap;
use std::sync::Arc;

use notculture_model::{RoomCode, RoomDoc};
use tokio::sync::{Mutex, watch};

use crate::{RoomStore, StoreError, TxDecision, TxOutcome};

struct RoomSlot {
    doc: Option<RoomDoc>,
    publisher: watch::Sender<Option<RoomDoc>>,
}

impl RoomSlot {
    fn empty() -> Self {
        let (publisher, _) = watch::channel(None);
        Self {
            doc: None,
            publisher,
        }
    }

    fn publish(&self) {
        // Subscribers may all be gone; that only means nobody is watching.
        let _ = self.publisher.send(self.doc.clone());
    }
}

/// An in-memory [`RoomStore`].
///
/// Cheap to clone — all clones share the same underlying rooms, which is
/// how multiple simulated clients coordinate in tests and local play.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rooms: Arc<Mutex<HashMap<RoomCode, RoomSlot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms currently holding a document.
    pub async fn room_count(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.values().filter(|slot| slot.doc.is_some()).count()
    }
}

impl RoomStore for MemoryStore {
    async fn read(&self, code: &RoomCode) -> Result<Option<RoomDoc>, StoreError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(code).and_then(|slot| slot.doc.clone()))
    }

    async fn write(&self, code: &RoomCode, doc: RoomDoc) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        let slot = rooms.entry(code.clone()).or_insert_with(RoomSlot::empty);
        slot.doc = Some(doc);
        slot.publish();
        Ok(())
    }

    async fn update<F>(&self, code: &RoomCode, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut RoomDoc) + Send,
    {
        let mut rooms = self.rooms.lock().await;
        let Some(slot) = rooms.get_mut(code) else {
            return Ok(false);
        };
        let Some(doc) = slot.doc.as_mut() else {
            return Ok(false);
        };
        f(doc);
        slot.publish();
        Ok(true)
    }

    async fn transaction<F>(&self, code: &RoomCode, mut f: F) -> Result<TxOutcome, StoreError>
    where
        F: FnMut(Option<&RoomDoc>) -> TxDecision + Send,
    {
        // The room map lock spans the whole read-decide-write, so the
        // closure runs exactly once here; remote backends re-invoke it on
        // contention instead.
        let mut rooms = self.rooms.lock().await;
        let slot = rooms.entry(code.clone()).or_insert_with(RoomSlot::empty);

        match f(slot.doc.as_ref()) {
            TxDecision::Write(doc) => {
                slot.doc = Some(doc);
                slot.publish();
                Ok(TxOutcome::Committed)
            }
            TxDecision::Delete => {
                slot.doc = None;
                slot.publish();
                Ok(TxOutcome::Deleted)
            }
            TxDecision::Abort => Ok(TxOutcome::Aborted),
        }
    }

    async fn subscribe(
        &self,
        code: &RoomCode,
    ) -> Result<watch::Receiver<Option<RoomDoc>>, StoreError> {
        let mut rooms = self.rooms.lock().await;
        let slot = rooms.entry(code.clone()).or_insert_with(RoomSlot::empty);
        let mut receiver = slot.publisher.subscribe();
        // New subscribers start with the current snapshot marked unseen,
        // so their first `changed()` resolves immediately.
        receiver.mark_changed();
        tracing::debug!(room_code = %code, "subscriber attached");
        Ok(receiver)
    }

    async fn delete(&self, code: &RoomCode) -> Result<(), StoreError> {
        let mut rooms = self.rooms.lock().await;
        if let Some(slot) = rooms.get_mut(code) {
            slot.doc = None;
            slot.publish();
            tracing::debug!(room_code = %code, "room deleted");
        }
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
