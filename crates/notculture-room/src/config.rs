//! Room limits and expiry settings.

use std::time::Duration;

/// Configuration for room lifecycle and roster limits.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Rooms older than this are expired — checked lazily on join and on
    /// snapshot receipt, never by a background sweep.
    pub ttl: Duration,

    /// Maximum players in an individual-mode room.
    pub max_players: usize,

    /// Maximum teams in a team-mode room.
    pub max_teams: usize,

    /// Maximum members per team.
    pub team_size: usize,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_players: 4,
            max_teams: 4,
            team_size: 2,
        }
    }
}

impl RoomOptions {
    pub fn ttl_ms(&self) -> u64 {
        self.ttl.as_millis() as u64
    }
}
