//! Error types for the store boundary.

/// Errors that can surface from a room store backend.
///
/// The in-memory store only ever reports `ConnectionLost` (when its shared
/// state is gone); remote backends map their transport failures onto
/// `Backend`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is no longer reachable; the session should stop.
    #[error("store connection lost")]
    ConnectionLost,

    /// A backend-specific failure (network drop, permission, quota).
    /// Not retried by the core — surfaced to the caller as a rejected
    /// operation.
    #[error("store backend error: {0}")]
    Backend(String),
}
