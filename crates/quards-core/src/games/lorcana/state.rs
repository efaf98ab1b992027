//! Typed Lorcana game state.
//!
//! Zones are `im::Vector`s so executing an action clones the state in
//! constant time and shares every untouched zone with its parent.

use super::cards::CardId;
use im::Vector;
use serde::{Deserialize, Serialize};

/// Cards each player draws before the first turn.
pub const OPENING_HAND: usize = 7;

/// Lore needed to win.
pub const LORE_TO_WIN: u32 = 20;

// =============================================================================
// PLAYERS
// =============================================================================

/// Seat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    /// Takes the first turn.
    Player1,
    /// Takes the second turn.
    Player2,
}

impl Player {
    /// The opponent.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
        }
    }

    /// Lower-case name, also the shuffle context for the player's deck.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
        }
    }
}

/// A character or item on the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCard {
    /// Which card.
    pub id: CardId,
    /// False while the card is "drying" on the turn it was played.
    pub ready: bool,
    /// True once it has quested this turn.
    pub exerted: bool,
}

/// Everything one player owns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerZones {
    /// Draw pile, top card first.
    pub deck: Vector<CardId>,
    /// Cards in hand.
    pub hand: Vector<CardId>,
    /// Inkwell.
    pub inkwell: Vector<CardId>,
    /// Cards in play.
    pub field: Vector<FieldCard>,
    /// Discard pile.
    pub discard: Vector<CardId>,
    /// Lore collected.
    pub lore: u32,
}

impl PlayerZones {
    /// Zones for a fresh shuffled deck.
    #[must_use]
    pub fn with_deck(deck: Vec<CardId>) -> Self {
        Self {
            deck: deck.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Move up to `count` cards from the top of the deck into hand.
    ///
    /// Returns how many were actually drawn.
    pub fn draw(&mut self, count: usize) -> usize {
        let count = count.min(self.deck.len());
        let rest = self.deck.split_off(count);
        let drawn = std::mem::replace(&mut self.deck, rest);
        self.hand.append(drawn);
        count
    }

    /// Remove one copy of `card` from hand, if held.
    pub fn take_from_hand(&mut self, card: &CardId) -> Option<CardId> {
        let index = self.hand.iter().position(|c| c == card)?;
        Some(self.hand.remove(index))
    }
}

/// Both seats.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Players {
    /// First seat.
    pub player1: PlayerZones,
    /// Second seat.
    pub player2: PlayerZones,
}

impl Players {
    /// Zones of `player`.
    #[must_use]
    pub const fn get(&self, player: Player) -> &PlayerZones {
        match player {
            Player::Player1 => &self.player1,
            Player::Player2 => &self.player2,
        }
    }

    /// Mutable zones of `player`.
    pub fn get_mut(&mut self, player: Player) -> &mut PlayerZones {
        match player {
            Player::Player1 => &mut self.player1,
            Player::Player2 => &mut self.player2,
        }
    }
}

// =============================================================================
// GAME STATE
// =============================================================================

/// One Lorcana position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LorcanaState {
    /// Turn counter; 0 until `start` is executed.
    pub turn: u64,
    /// Set once a player has won.
    pub complete: bool,
    /// The winner, when `complete`.
    pub winner: Option<Player>,
    /// Whose turn it is.
    pub current_player: Player,
    /// Cards the current player may still ink this turn.
    pub ink_drops: u32,
    /// Unspent ink this turn.
    pub ink_available: u32,
    /// Player zones.
    pub players: Players,
}

impl LorcanaState {
    /// Pre-game position: shuffled decks, opening hands drawn.
    #[must_use]
    pub fn new(deck1: Vec<CardId>, deck2: Vec<CardId>) -> Self {
        let mut players = Players {
            player1: PlayerZones::with_deck(deck1),
            player2: PlayerZones::with_deck(deck2),
        };
        players.player1.draw(OPENING_HAND);
        players.player2.draw(OPENING_HAND);
        Self {
            turn: 0,
            complete: false,
            winner: None,
            current_player: Player::Player1,
            ink_drops: 0,
            ink_available: 0,
            players,
        }
    }

    /// Zones of the player whose turn it is.
    #[must_use]
    pub const fn current(&self) -> &PlayerZones {
        self.players.get(self.current_player)
    }

    /// Mutable zones of the player whose turn it is.
    pub fn current_mut(&mut self) -> &mut PlayerZones {
        self.players.get_mut(self.current_player)
    }

    /// Ready the current player's field and refill ink for a new turn.
    pub fn begin_turn(&mut self) {
        let zones = self.current_mut();
        for card in zones.field.iter_mut() {
            card.ready = true;
            card.exerted = false;
        }
        let ink = u32::try_from(zones.inkwell.len()).unwrap_or(u32::MAX);
        self.ink_available = ink;
        self.ink_drops = 1;
    }

    /// End the game in favour of `winner`.
    pub fn finish(&mut self, winner: Player) {
        self.complete = true;
        self.winner = Some(winner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(n: usize) -> Vec<CardId> {
        (0..n).map(|i| CardId::new(format!("C{i}"))).collect()
    }

    #[test]
    fn opening_hands_drawn_from_top() {
        let state = LorcanaState::new(deck(10), deck(5));
        assert_eq!(state.turn, 0);
        assert_eq!(state.players.player1.hand.len(), 7);
        assert_eq!(state.players.player1.deck.len(), 3);
        assert_eq!(state.players.player1.hand[0], CardId::new("C0"));
        assert_eq!(state.players.player1.deck[0], CardId::new("C7"));
        // Short deck: everything drawn, nothing left.
        assert_eq!(state.players.player2.hand.len(), 5);
        assert!(state.players.player2.deck.is_empty());
    }

    #[test]
    fn take_from_hand_removes_one_copy() {
        let mut zones = PlayerZones::with_deck(vec![CardId::new("A"), CardId::new("A")]);
        zones.draw(2);
        assert!(zones.take_from_hand(&CardId::new("A")).is_some());
        assert_eq!(zones.hand.len(), 1);
        assert!(zones.take_from_hand(&CardId::new("B")).is_none());
    }

    #[test]
    fn begin_turn_readies_and_refills() {
        let mut state = LorcanaState::new(deck(8), deck(8));
        state.players.player1.inkwell.push_back(CardId::new("I"));
        state.players.player1.field.push_back(FieldCard {
            id: CardId::new("F"),
            ready: false,
            exerted: true,
        });
        state.begin_turn();
        assert_eq!(state.ink_available, 1);
        assert_eq!(state.ink_drops, 1);
        let card = &state.players.player1.field[0];
        assert!(card.ready && !card.exerted);
    }

    #[test]
    fn serializes_with_turn_and_complete() {
        let state = LorcanaState::new(deck(8), deck(8));
        let json = serde_json::to_value(&state).expect("json");
        assert_eq!(json["turn"], 0);
        assert_eq!(json["complete"], false);
        assert_eq!(json["current_player"], "player1");
        let back: LorcanaState = serde_json::from_value(json).expect("state");
        assert_eq!(back, state);
    }
}
