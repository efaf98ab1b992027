//! # Evaluator Contract
//!
//! The seam between the exploration engine and a game's rules. One
//! implementation exists per supported rule set; the driver holds it as a
//! value chosen once at configuration time.
//!
//! Implementations must be pure: `execute` never mutates its input and, given
//! the same state and action, always yields the same outcome. Anything random
//! (deck shuffles) is derived from the seed handed to `initial_state`.

use crate::transition::Action;
use crate::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// What executing one action produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<S> {
    /// The resulting state.
    pub state: S,
    /// Every legal action from `state`. Empty iff `state` is terminal.
    pub next_actions: Vec<Action>,
}

impl<S> Outcome<S> {
    /// Bundle a state with its legal actions.
    pub fn new(state: S, next_actions: Vec<Action>) -> Self {
        Self {
            state,
            next_actions,
        }
    }

    /// A terminal outcome.
    pub fn terminal(state: S) -> Self {
        Self {
            state,
            next_actions: Vec::new(),
        }
    }
}

/// A game rule set.
///
/// `State` is the rule set's own typed state. It crosses into the engine only
/// as JSON, and must serialize to an object with an unsigned `turn` field.
///
/// The first action of every run is [`crate::transition::START_ACTION`];
/// implementations decide what it does (typically: begin turn one).
pub trait Evaluator: Send + Sync {
    /// Typed game state.
    type State: Serialize + DeserializeOwned + Send + Sync;

    /// Setup parameters for a new game (decks, player counts, ...).
    type Setup;

    /// Identifier recorded on every stored state.
    fn game(&self) -> &str;

    /// Build the starting position for `seed`.
    ///
    /// Deterministic: the same seed and setup always give the same state.
    fn initial_state(&self, seed: &str, setup: &Self::Setup) -> Result<Self::State>;

    /// Apply `action` to `state`.
    ///
    /// Returns `QuardsError::IllegalAction` when the action does not fit the
    /// state; the driver never submits actions it was not handed, so this
    /// signals a contract violation rather than a normal outcome.
    fn execute(&self, state: &Self::State, action: &Action) -> Result<Outcome<Self::State>>;
}
