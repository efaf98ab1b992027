//! # Transitions
//!
//! A transition (edge) records one action taken from a parent state. It is
//! enqueued `Open`, claimed by exactly one worker, and closed once with the
//! signature of the state it produced.
//!
//! ```text
//!   Open ──claim──▶ Claimed ──resolve──▶ Closed
//!    ▲                 │
//!    └────release──────┘
//! ```

use crate::signature::canonical_json;
use crate::{GameId, Result, Signature, TransitionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the synthetic action that opens every run.
pub const START_ACTION: &str = "start";

// =============================================================================
// ACTION
// =============================================================================

/// An action name plus its argument bundle (`null` when it takes none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action identifier, e.g. "ink" or "pass".
    pub name: String,
    /// Arguments; `Value::Null` when absent.
    #[serde(default)]
    pub params: Value,
}

impl Action {
    /// An action without parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Value::Null,
        }
    }

    /// An action with parameters.
    #[must_use]
    pub fn with_params(name: impl Into<String>, params: Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

// =============================================================================
// STATUS
// =============================================================================

/// Lifecycle of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransitionStatus {
    /// Waiting to be claimed.
    Open,
    /// Taken by a worker, not yet resolved.
    Claimed,
    /// Resolved; `child_signature` is set. Terminal.
    Closed,
}

impl TransitionStatus {
    /// Upper-case label used in CLI output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Claimed => "CLAIMED",
            Self::Closed => "CLOSED",
        }
    }
}

// =============================================================================
// TRANSITION
// =============================================================================

/// A transition about to be enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransition {
    /// Owning run.
    pub game_id: GameId,
    /// State the action is taken from.
    pub parent_signature: Signature,
    /// The action.
    pub action: Action,
    /// Depth bucket to schedule it in.
    pub turn: u64,
}

impl NewTransition {
    /// Create a pending transition.
    #[must_use]
    pub fn new(game_id: GameId, parent_signature: Signature, action: Action, turn: u64) -> Self {
        Self {
            game_id,
            parent_signature,
            action,
            turn,
        }
    }

    /// Natural key `(game_id, parent_signature, name, params)`.
    ///
    /// `turn` is not part of the key; the first insert wins.
    pub fn natural_key(&self) -> Result<String> {
        natural_key(
            &self.game_id,
            &self.parent_signature,
            &self.action.name,
            &self.action.params,
        )
    }
}

/// Canonical encoding of a transition's natural key.
pub fn natural_key(
    game_id: &GameId,
    parent: &Signature,
    name: &str,
    params: &Value,
) -> Result<String> {
    canonical_json(&Value::Array(vec![
        Value::String(game_id.0.clone()),
        Value::String(parent.0.clone()),
        Value::String(name.to_string()),
        params.clone(),
    ]))
}

/// A stored transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Store-assigned id.
    pub id: TransitionId,
    /// Owning run.
    pub game_id: GameId,
    /// State the action is taken from.
    pub parent_signature: Signature,
    /// The action.
    pub action: Action,
    /// Depth bucket.
    pub turn: u64,
    /// Lifecycle status.
    pub status: TransitionStatus,
    /// Resulting state, once resolved.
    pub child_signature: Option<Signature>,
}

impl Transition {
    /// Materialize a freshly inserted transition.
    #[must_use]
    pub fn open(id: TransitionId, new: NewTransition) -> Self {
        Self {
            id,
            game_id: new.game_id,
            parent_signature: new.parent_signature,
            action: new.action,
            turn: new.turn,
            status: TransitionStatus::Open,
            child_signature: None,
        }
    }
}

/// Result of an idempotent enqueue. Both variants mean "the edge exists".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// A new row was written.
    Inserted(TransitionId),
    /// The natural key already existed; carries the existing id.
    Duplicate(TransitionId),
}

impl Enqueued {
    /// Id of the row, new or existing.
    #[must_use]
    pub const fn id(self) -> TransitionId {
        match self {
            Self::Inserted(id) | Self::Duplicate(id) => id,
        }
    }

    /// Whether this call created the row.
    #[must_use]
    pub const fn is_new(self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Outstanding work at one depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCounts {
    /// Transitions waiting to be claimed.
    pub open: usize,
    /// Transitions held by a worker.
    pub claimed: usize,
}

impl PendingCounts {
    /// True when the depth is fully resolved.
    #[must_use]
    pub const fn is_drained(self) -> bool {
        self.open == 0 && self.claimed == 0
    }
}

// =============================================================================
// PERSISTED RECORD
// =============================================================================

/// Postcard-friendly form of a transition.
///
/// `params` is held as canonical JSON text because postcard cannot encode
/// self-describing `serde_json::Value`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TransitionRecord {
    pub game_id: String,
    pub parent_signature: String,
    pub name: String,
    pub params_json: String,
    pub turn: u64,
    pub status: TransitionStatus,
    pub child_signature: Option<String>,
}

impl TransitionRecord {
    pub(crate) fn from_transition(t: &Transition) -> Result<Self> {
        Ok(Self {
            game_id: t.game_id.0.clone(),
            parent_signature: t.parent_signature.0.clone(),
            name: t.action.name.clone(),
            params_json: canonical_json(&t.action.params)?,
            turn: t.turn,
            status: t.status,
            child_signature: t.child_signature.as_ref().map(|s| s.0.clone()),
        })
    }

    pub(crate) fn into_transition(self, id: TransitionId) -> Result<Transition> {
        let params: Value = serde_json::from_str(&self.params_json)?;
        Ok(Transition {
            id,
            game_id: GameId(self.game_id),
            parent_signature: Signature(self.parent_signature),
            action: Action::with_params(self.name, params),
            turn: self.turn,
            status: self.status,
            child_signature: self.child_signature.map(Signature),
        })
    }
}
