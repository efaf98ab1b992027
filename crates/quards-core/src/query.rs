//! # Turn Queries
//!
//! Downstream questions answered from the recorded graph instead of by
//! re-simulating: how many distinct positions a turn can be in, and how many
//! of them are finished games.

use crate::store::StateStore;
use crate::{GameId, Result};
use serde::Serialize;

/// Aggregate view of one turn of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnSummary {
    /// The turn summarized.
    pub turn: u64,
    /// Distinct states recorded at this turn.
    pub possibilities: usize,
    /// Of those, states flagged `complete`.
    pub victories: usize,
}

/// Summarize the states recorded at `turn`.
pub fn summarize_turn<S>(store: &S, game_id: &GameId, turn: u64) -> Result<TurnSummary>
where
    S: StateStore + ?Sized,
{
    let states = store.states_for_turn(game_id, turn)?;
    Ok(TurnSummary {
        turn,
        possibilities: states.len(),
        victories: states.iter().filter(|s| s.is_complete()).count(),
    })
}
