//! # Lorcana
//!
//! A two-player rule set covering the core turn loop: ink, play, quest and
//! pass. Card abilities are not modelled; cards differ only by cost,
//! inkability, lore and type.
//!
//! ```text
//! CardIndex ──▶ Deck::parse ──▶ LorcanaSetup ──▶ LorcanaEvaluator
//! ```

pub mod cards;
pub mod deck;
pub mod rules;
pub mod state;

pub use cards::{Card, CardId, CardIndex, CardType};
pub use deck::{Deck, MAX_DECK_CARDS};
pub use state::{FieldCard, LorcanaState, Player, PlayerZones, Players};

use crate::Result;
use crate::evaluator::{Evaluator, Outcome};
use crate::transition::Action;
use std::sync::Arc;

/// Rule set identifier recorded on stored states.
pub const LORCANA: &str = "lorcana";

/// The two deck lists of a game.
#[derive(Debug, Clone, Default)]
pub struct LorcanaSetup {
    /// Player one's list.
    pub deck1: Deck,
    /// Player two's list.
    pub deck2: Deck,
}

/// Lorcana rules over a shared card index.
#[derive(Debug, Clone)]
pub struct LorcanaEvaluator {
    cards: Arc<CardIndex>,
}

impl LorcanaEvaluator {
    /// Create an evaluator over `cards`.
    #[must_use]
    pub fn new(cards: Arc<CardIndex>) -> Self {
        Self { cards }
    }

    /// The card index in use.
    #[must_use]
    pub fn cards(&self) -> &CardIndex {
        &self.cards
    }
}

impl Evaluator for LorcanaEvaluator {
    type State = LorcanaState;
    type Setup = LorcanaSetup;

    fn game(&self) -> &str {
        LORCANA
    }

    fn initial_state(&self, seed: &str, setup: &LorcanaSetup) -> Result<LorcanaState> {
        Ok(LorcanaState::new(
            setup.deck1.shuffled(seed, Player::Player1.as_str()),
            setup.deck2.shuffled(seed, Player::Player2.as_str()),
        ))
    }

    fn execute(&self, state: &LorcanaState, action: &Action) -> Result<Outcome<LorcanaState>> {
        let next = rules::apply(state, action, &self.cards)?;
        let next_actions = rules::legal_actions(&next, &self.cards)?;
        Ok(Outcome::new(next, next_actions))
    }
}
