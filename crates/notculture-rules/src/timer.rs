//! Synced countdown arithmetic for tile minigames.
//!
//! No client owns the timer. Each one independently computes
//! `remaining = duration - (now - started_at)` from the shared start
//! timestamp, so stopping a countdown needs no cancellation message —
//! "finish early" simply backdates the start far enough that every
//! client's computation bottoms out at zero.

use std::time::{SystemTime, UNIX_EPOCH};

use notculture_model::TileKind;

/// Culture performance countdown.
pub const CULTURE_TIMER_SECS: u64 = 30;

/// Not describe-and-guess countdown.
pub const NOT_TIMER_SECS: u64 = 30;

/// How far "finish early" backdates the start timestamp. Far larger than
/// any timer duration, so remaining time converges to zero everywhere.
pub const FINISH_EARLY_BACKDATE_MS: u64 = 999_000;

/// Movement animation step interval.
pub const MOVE_TICK_MS: u64 = 500;

/// Countdown duration for a tile kind.
pub fn timer_secs(kind: TileKind) -> u64 {
    match kind {
        TileKind::Culture => CULTURE_TIMER_SECS,
        TileKind::Not => NOT_TIMER_SECS,
    }
}

/// Seconds left on a countdown started at `started_at_ms`, never negative.
pub fn remaining_secs(duration_secs: u64, started_at_ms: u64, now_ms: u64) -> u64 {
    let elapsed_secs = now_ms.saturating_sub(started_at_ms) / 1_000;
    duration_secs.saturating_sub(elapsed_secs)
}

/// Current wall-clock time in unix milliseconds.
pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// =========================================================================
// Tests
// =========================================================================
