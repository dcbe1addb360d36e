//! Static, pre-loaded content pools: trivia questions, Culture prompts,
//! and Not cards.
//!
//! The core only needs three behaviors from content: lookup by id,
//! exclusion-aware random draw, and silent reset when a pool (or a
//! (category, difficulty) bucket) is exhausted — a draw never fails just
//! because everything has been seen once.
//!
//! Draw functions take `&mut impl Rng` so callers control seeding; game
//! code passes `rand::rng()`, tests pass a seeded `StdRng`.

mod pool;

pub use pool::{CulturePool, NotDeck, QuestionPool, culture_prompt_index};

use notculture_model::{Category, QuestionId};
use serde::{Deserialize, Serialize};

/// One trivia question. Difficulty 1..=6 is matched against the dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    pub category: Category,
    pub difficulty: u8,
    pub prompt: String,
    pub answers: Vec<String>,
    pub correct_index: u8,
}

/// One Culture performance prompt with its ten creditable answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CulturePrompt {
    pub id: String,
    pub prompt: String,
    pub answers: Vec<String>,
}

/// One Not describe-and-guess card with its six answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotCard {
    pub id: String,
    pub answers: Vec<String>,
}

/// Errors loading content pools.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("malformed content JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
