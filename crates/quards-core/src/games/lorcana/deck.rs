//! Deck lists and seeded shuffling.
//!
//! A `.dek` file has one `<count> <title>` entry per line; blank lines are
//! skipped. A list may hold at most [`MAX_DECK_CARDS`] cards. Shuffles use
//! ChaCha8 seeded from BLAKE3 of the run seed and a per-player context, so a
//! run seed always reproduces the same decks.

use super::cards::{CardId, CardIndex};
use crate::{QuardsError, Result};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// Largest deck list accepted, counting every copy.
pub const MAX_DECK_CARDS: usize = 240;

/// An ordered list of card ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deck {
    /// Cards in list order (before shuffling).
    pub cards: Vec<CardId>,
}

impl Deck {
    /// Parse deck-list text against the card index.
    pub fn parse(text: &str, index: &CardIndex) -> Result<Self> {
        let mut cards = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (count, title) = line.split_once(char::is_whitespace).ok_or_else(|| {
                QuardsError::ConfigError(format!(
                    "deck line {}: expected '<count> <title>', got '{}'",
                    line_no + 1,
                    line
                ))
            })?;
            let count: usize = count.parse().map_err(|_| {
                QuardsError::ConfigError(format!(
                    "deck line {}: invalid count '{}'",
                    line_no + 1,
                    count
                ))
            })?;
            let card = index.by_title(title).ok_or_else(|| {
                QuardsError::ConfigError(format!(
                    "deck line {}: unknown card '{}'",
                    line_no + 1,
                    title.trim()
                ))
            })?;
            if count > MAX_DECK_CARDS.saturating_sub(cards.len()) {
                return Err(QuardsError::ConfigError(format!(
                    "deck line {}: {} copies would exceed {} cards",
                    line_no + 1,
                    count,
                    MAX_DECK_CARDS
                )));
            }
            cards.extend(std::iter::repeat_n(card.id.clone(), count));
        }
        Ok(Self { cards })
    }

    /// Read and parse a `.dek` file.
    pub fn load(path: impl AsRef<Path>, index: &CardIndex) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            QuardsError::IoError(format!("Cannot read deck '{}': {}", path.display(), e))
        })?;
        Self::parse(&text, index)
    }

    /// The deck shuffled for `seed`, with `context` separating players.
    #[must_use]
    pub fn shuffled(&self, seed: &str, context: &str) -> Vec<CardId> {
        let mut cards = self.cards.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, context));
        cards.shuffle(&mut rng);
        cards
    }

    /// Number of cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True for an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

fn derive_seed(seed: &str, context: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(seed.as_bytes());
    hasher.update(&[0]);
    hasher.update(context.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
