//! Persisted local identity.
//!
//! Identity in this protocol is entirely self-asserted: a client-generated
//! opaque token, a display name, and the last room code, kept in a small
//! JSON file so a restart can attempt an automatic reconnect (the
//! `existing_id` path of `join_room`).

use std::path::Path;

use notculture_model::{PlayerId, RoomCode};
use notculture_room::generate_player_token;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

/// The client's persisted identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub player_id: PlayerId,
    pub name: String,
    pub last_room_code: Option<RoomCode>,
}

impl Identity {
    /// A brand-new identity with a freshly generated player token.
    pub fn generate(name: impl Into<String>) -> Self {
        Self {
            player_id: generate_player_token(&mut rand::rng()),
            name: name.into(),
            last_room_code: None,
        }
    }

    /// Loads the identity file; `Ok(None)` when none has been saved yet.
    pub fn load(path: &Path) -> Result<Option<Self>, IdentityError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub fn save(&self, path: &Path) -> Result<(), IdentityError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Records the room this client last sat in, for reconnect on restart.
    pub fn remember_room(&mut self, code: &RoomCode) {
        self.last_room_code = Some(code.clone());
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_creates_distinct_tokens() {
        let a = Identity::generate("Alice");
        let b = Identity::generate("Alice");
        assert_ne!(a.player_id, b.player_id);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        assert_eq!(Identity::load(&path).unwrap(), None);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");

        let mut identity = Identity::generate("Alice");
        identity.remember_room(&RoomCode::new("ab12cd"));
        identity.save(&path).unwrap();

        let loaded = Identity::load(&path).unwrap().unwrap();
        assert_eq!(loaded, identity);
        assert_eq!(loaded.last_room_code, Some(RoomCode::new("AB12CD")));
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identity.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Identity::load(&path),
            Err(IdentityError::Parse(_))
        ));
    }
}
