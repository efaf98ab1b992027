//! # Core Type Definitions
//!
//! Identifiers and the error type shared by every quards module:
//! - Run and state identifiers (`GameId`, `Signature`, `TransitionId`)
//! - Error types (`QuardsError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! and iterate in a stable order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifies one exploration run.
///
/// Every state and transition is scoped by a `GameId`; two runs never share
/// a namespace. For the bundled rule sets the id doubles as the shuffle seed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    /// Create a new game id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-derived identity of a game state within a run.
///
/// 64 lowercase hex characters of a BLAKE3 digest. See [`crate::signature`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Signature(pub String);

impl Signature {
    /// Get the signature as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned identifier of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub u64);

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while exploring a game.
///
/// - No silent failures
/// - Use `Result<T, QuardsError>` for fallible operations
/// - Duplicate inserts and an empty queue are NOT errors; they are reported
///   through `Enqueued::Duplicate`, `put_state == false` and `Ok(None)`.
#[derive(Debug, Error)]
pub enum QuardsError {
    /// The requested state is not in the store.
    #[error("State not found: {signature} (game {game_id})")]
    StateNotFound {
        /// Run the lookup was scoped to.
        game_id: GameId,
        /// Missing signature.
        signature: Signature,
    },

    /// The requested transition does not exist.
    #[error("Transition not found: {0}")]
    TransitionNotFound(TransitionId),

    /// `resolve` was called on a transition that is already closed.
    #[error("Transition already resolved: {0}")]
    AlreadyResolved(TransitionId),

    /// `release` was called on a transition that is not claimed.
    #[error("Transition not claimed: {0}")]
    NotClaimed(TransitionId),

    /// The evaluator rejected an action for the given state.
    #[error("Illegal action '{action}': {reason}")]
    IllegalAction {
        /// Action name.
        action: String,
        /// What precondition failed.
        reason: String,
    },

    /// A state is missing engine-visible fields or breaks the turn order.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A storage or file I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration or setup input could not be used.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl QuardsError {
    /// Shorthand for an `IllegalAction` error.
    pub fn illegal(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IllegalAction {
            action: action.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for QuardsError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<postcard::Error> for QuardsError {
    fn from(e: postcard::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, QuardsError>;

// =============================================================================
// TESTS
// =============================================================================
