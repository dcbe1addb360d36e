//! Board geometry and game rules: the spiral path, tile classification,
//! destination math, and the synced tile-timer arithmetic.
//!
//! Everything here is a pure function of its inputs. Tile classification
//! is *derived*, never stored — a board position maps to one of
//! start / finish / trivia(category) / culture / not through the static
//! position sets and a deterministic category rotation.

mod board;
mod timer;

pub use board::{
    CATEGORY_COUNT, CULTURE_POSITIONS, FINISH, GRID_SIZE, NOT_POSITIONS, SPIRAL_PATH,
    TOTAL_CELLS, Tile, category_at, classify, destination, is_culture, is_not,
    trivia_category,
};
pub use timer::{
    CULTURE_TIMER_SECS, FINISH_EARLY_BACKDATE_MS, MOVE_TICK_MS, NOT_TIMER_SECS,
    remaining_secs, timer_secs, unix_now_ms,
};
