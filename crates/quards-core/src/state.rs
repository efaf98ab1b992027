//! # Game States
//!
//! An immutable snapshot of one position in a run. The engine treats `data`
//! as an opaque blob apart from two fields:
//! - `turn` (required, unsigned): the depth bucket follow-on actions land in
//! - `complete` (optional, boolean): read by turn queries to count victories

use crate::signature::{canonical_json, signature_of_canonical};
use crate::{GameId, QuardsError, Result, Signature};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field holding the turn counter inside state data.
pub const TURN_FIELD: &str = "turn";

/// Field flagging a finished game inside state data.
pub const COMPLETE_FIELD: &str = "complete";

/// A content-addressed game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// The run this state belongs to.
    pub game_id: GameId,
    /// The rule set that produced it.
    pub game: String,
    /// Signature derived from `(game_id, data)`.
    pub signature: Signature,
    /// Full state data.
    pub data: Value,
}

impl GameState {
    /// Build a state and compute its signature.
    pub fn new(game_id: GameId, game: impl Into<String>, data: Value) -> Result<Self> {
        let canonical = canonical_json(&data)?;
        let signature = signature_of_canonical(&game_id, &canonical);
        Ok(Self {
            game_id,
            game: game.into(),
            signature,
            data,
        })
    }

    /// Reassemble a state read back from storage.
    ///
    /// The signature is trusted as stored; it was computed on insert.
    #[must_use]
    pub fn from_parts(game_id: GameId, game: String, signature: Signature, data: Value) -> Self {
        Self {
            game_id,
            game,
            signature,
            data,
        }
    }

    /// Turn counter of this state.
    pub fn turn(&self) -> Result<u64> {
        turn_of(&self.data)
    }

    /// Whether the game ended in this state.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.data
            .get(COMPLETE_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Canonical encoding of `data`, as persisted.
    pub fn canonical_data(&self) -> Result<String> {
        canonical_json(&self.data)
    }
}

/// Read the turn counter from raw state data.
pub fn turn_of(data: &Value) -> Result<u64> {
    match data.get(TURN_FIELD) {
        Some(v) => v.as_u64().ok_or_else(|| {
            QuardsError::InvalidState(format!("'{}' is not an unsigned integer: {}", TURN_FIELD, v))
        }),
        None => Err(QuardsError::InvalidState(format!(
            "state has no '{}' field",
            TURN_FIELD
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn turn_and_complete_are_read_from_data() {
        let state = GameState::new(
            GameId::new("g"),
            "test",
            json!({"turn": 3, "complete": true}),
        )
        .expect("state");
        assert_eq!(state.turn().expect("turn"), 3);
        assert!(state.is_complete());
    }

    #[test]
    fn missing_complete_means_in_progress() {
        let state = GameState::new(GameId::new("g"), "test", json!({"turn": 0})).expect("state");
        assert!(!state.is_complete());
    }

    #[test]
    fn missing_or_negative_turn_is_invalid() {
        assert!(matches!(
            turn_of(&json!({"hand": []})),
            Err(QuardsError::InvalidState(_))
        ));
        assert!(matches!(
            turn_of(&json!({"turn": -1})),
            Err(QuardsError::InvalidState(_))
        ));
    }

    #[test]
    fn equal_content_means_equal_signature() {
        let a = GameState::new(GameId::new("g"), "test", json!({"turn": 1, "x": [1]}))
            .expect("state");
        let b = GameState::new(GameId::new("g"), "other", json!({"x": [1], "turn": 1}))
            .expect("state");
        assert_eq!(a.signature, b.signature);
    }
}
