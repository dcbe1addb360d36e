//! Token generation: room codes, player identities, team identities.

use notculture_model::{PlayerId, RoomCode, TeamId};
use rand::Rng;

const ROOM_CODE_LEN: usize = 6;
const ROOM_CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a 6-character base-36 room code (uppercase).
pub fn generate_room_code(rng: &mut impl Rng) -> RoomCode {
    let code: String = (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_ALPHABET[rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode::new(code)
}

/// Generates a fresh opaque player token: 16 hex chars (64 bits).
///
/// Identity is self-asserted in this protocol; the token only needs to be
/// unique within a room, not unguessable.
pub fn generate_player_token(rng: &mut impl Rng) -> PlayerId {
    PlayerId::new(hex_token(rng))
}

/// Generates a fresh team token, prefixed for log readability.
pub fn generate_team_token(rng: &mut impl Rng) -> TeamId {
    TeamId::new(format!("team-{}", hex_token(rng)))
}

fn hex_token(rng: &mut impl Rng) -> String {
    let bytes: [u8; 8] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
