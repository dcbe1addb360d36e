//! Exclusion-aware draws with pool-exhaustion reset.

use std::collections::HashSet;

use notculture_model::{Category, QuestionId};
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::{ContentError, CulturePrompt, NotCard, Question};

// ---------------------------------------------------------------------------
// Trivia
// ---------------------------------------------------------------------------

/// The trivia question pool with per-bucket used-question tracking.
///
/// A "bucket" is one (category, difficulty) pair. Draws prefer questions
/// not yet used; when a bucket runs dry, only that bucket's used set is
/// cleared, so repetition stays as spread out as the content allows.
#[derive(Debug, Clone, Default)]
pub struct QuestionPool {
    questions: Vec<Question>,
    used: HashSet<QuestionId>,
}

impl QuestionPool {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            used: HashSet::new(),
        }
    }

    /// Loads a pool from its JSON array form.
    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Resolves a broadcast question id against the local pool.
    ///
    /// Returns `None` for ids this client has no content for; the sync
    /// engine treats that as a no-op rather than an error, since pools are
    /// static and pre-loaded.
    pub fn by_id(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    /// Draws a random unused question for the bucket, marking it used.
    ///
    /// Returns `None` only when the bucket has no questions at all. An
    /// exhausted bucket resets silently and the draw succeeds again.
    pub fn draw(
        &mut self,
        category: Category,
        difficulty: u8,
        rng: &mut impl Rng,
    ) -> Option<Question> {
        let bucket: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| q.category == category && q.difficulty == difficulty)
            .collect();
        if bucket.is_empty() {
            return None;
        }

        let unused: Vec<&Question> =
            bucket.iter().copied().filter(|q| !self.used.contains(&q.id)).collect();

        let chosen = if unused.is_empty() {
            // Bucket exhausted — forget only this bucket's draws.
            let bucket_ids: HashSet<&QuestionId> = bucket.iter().map(|q| &q.id).collect();
            self.used.retain(|id| !bucket_ids.contains(id));
            bucket.choose(rng).copied()?.clone()
        } else {
            unused.choose(rng).copied()?.clone()
        };

        self.used.insert(chosen.id.clone());
        Some(chosen)
    }

    /// Marks a question used without drawing it — applied when another
    /// client's draw arrives over the wire, keeping local exclusion in
    /// step with the room.
    pub fn mark_used(&mut self, id: &QuestionId) {
        if self.questions.iter().any(|q| &q.id == id) {
            self.used.insert(id.clone());
        }
    }

    /// Forgets all used-question tracking (full game reset).
    pub fn reset_used(&mut self) {
        self.used.clear();
    }
}

// ---------------------------------------------------------------------------
// Culture
// ---------------------------------------------------------------------------

/// Deterministic Culture prompt index: every client derives the same
/// prompt from the turn index and landing position, so only the index
/// needs to travel on the wire.
pub fn culture_prompt_index(turn_index: usize, position: u8, pool_len: usize) -> usize {
    debug_assert!(pool_len > 0);
    (turn_index + position as usize) % pool_len
}

/// The Culture prompt pool. Selection is seed-derived, not random.
#[derive(Debug, Clone, Default)]
pub struct CulturePool {
    prompts: Vec<CulturePrompt>,
}

impl CulturePool {
    pub fn new(prompts: Vec<CulturePrompt>) -> Self {
        Self { prompts }
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CulturePrompt> {
        self.prompts.get(index)
    }

    /// The prompt index for a turn landing on `position`.
    pub fn index_for(&self, turn_index: usize, position: u8) -> Option<usize> {
        if self.prompts.is_empty() {
            return None;
        }
        Some(culture_prompt_index(turn_index, position, self.prompts.len()))
    }
}

// ---------------------------------------------------------------------------
// Not
// ---------------------------------------------------------------------------

/// The Not card deck: random draw without replacement, full-deck reset
/// when exhausted.
#[derive(Debug, Clone, Default)]
pub struct NotDeck {
    cards: Vec<NotCard>,
    used: HashSet<String>,
}

impl NotDeck {
    pub fn new(cards: Vec<NotCard>) -> Self {
        Self {
            cards,
            used: HashSet::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ContentError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Draws a random card not seen since the last reset.
    pub fn draw(&mut self, rng: &mut impl Rng) -> Option<NotCard> {
        if self.cards.is_empty() {
            return None;
        }

        let mut pool: Vec<&NotCard> =
            self.cards.iter().filter(|c| !self.used.contains(&c.id)).collect();
        if pool.is_empty() {
            self.used.clear();
            pool = self.cards.iter().collect();
        }

        let chosen = pool.choose(rng).copied()?.clone();
        self.used.insert(chosen.id.clone());
        Some(chosen)
    }

    pub fn reset_used(&mut self) {
        self.used.clear();
    }
}

// =========================================================================
// Tests
// =========================================================================
