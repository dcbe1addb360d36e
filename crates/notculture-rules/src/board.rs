//! The spiral board: a 48-tile path winding inward over an 8×8 grid.

use notculture_model::Category;
use rand::Rng;
use rand::seq::IndexedRandom;

/// Grid side length. The path visits a subset of the 8×8 cells.
pub const GRID_SIZE: u8 = 8;
pub const TOTAL_CELLS: u8 = GRID_SIZE * GRID_SIZE;

/// Grid cell index for each path position, outer ring first, spiraling
/// inward. The last entry is the finish tile.
pub const SPIRAL_PATH: [u8; 48] = [
    // Outer ring (28 tiles)
    0, 1, 2, 3, 4, 5, 6, 7, // top row →
    15, 23, 31, 39, 47, 55, 63, // right col ↓
    62, 61, 60, 59, 58, 57, 56, // bottom row ←
    48, 40, 32, 24, 16, 8, // left col ↑
    // Second ring (20 tiles)
    9, 10, 11, 12, 13, 14, // top row →
    22, 30, 38, 46, 54, // right col ↓
    53, 52, 51, 50, 49, // bottom row ←
    41, 33, 25, 17, // left col ↑ → finish
];

/// Highest path position; reaching it wins the game.
pub const FINISH: u8 = (SPIRAL_PATH.len() - 1) as u8;

/// Path positions carrying the Culture minigame.
pub const CULTURE_POSITIONS: [u8; 4] = [10, 20, 30, 40];

/// Path positions carrying the Not (describe-and-guess) minigame.
pub const NOT_POSITIONS: [u8; 5] = [5, 15, 25, 35, 45];

pub const CATEGORY_COUNT: usize = Category::ALL.len();

/// What landing on a path position means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Start,
    Finish,
    Culture,
    Not,
    Trivia(Category),
}

pub fn is_culture(position: u8) -> bool {
    CULTURE_POSITIONS.contains(&position)
}

pub fn is_not(position: u8) -> bool {
    NOT_POSITIONS.contains(&position)
}

/// Classifies a path position. Special tiles take precedence over the
/// category rotation; start and finish draw a random category at
/// question time (see [`trivia_category`]).
pub fn classify(position: u8) -> Tile {
    if is_culture(position) {
        Tile::Culture
    } else if is_not(position) {
        Tile::Not
    } else if position == 0 {
        Tile::Start
    } else if position >= FINISH {
        Tile::Finish
    } else {
        Tile::Trivia(category_at(position))
    }
}

/// The deterministic category rotation: every client computes the same
/// category for the same path index.
pub fn category_at(path_index: u8) -> Category {
    Category::ALL[path_index as usize % CATEGORY_COUNT]
}

/// Category for a trivia question asked from `position`: deterministic
/// rotation except on start/finish, where it is drawn at random.
pub fn trivia_category(position: u8, rng: &mut impl Rng) -> Category {
    if position == 0 || position >= FINISH {
        *Category::ALL.as_slice().choose(rng).expect("non-empty")
    } else {
        category_at(position)
    }
}

/// Where a roll lands from `position`, clamped to the finish tile.
pub fn destination(position: u8, roll: u8) -> u8 {
    position.saturating_add(roll).min(FINISH)
}

// =========================================================================
// Tests
// =========================================================================
