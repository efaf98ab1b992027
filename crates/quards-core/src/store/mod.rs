//! # Storage
//!
//! The two persistence contracts the explorer runs against:
//! - [`StateStore`]: write-once, content-addressed game states
//! - [`TransitionQueue`]: turn-scoped pending/resolved transitions
//!
//! Both are implemented by an in-memory backend ([`MemoryStore`]) and a
//! redb-backed one ([`RedbStore`]). All methods take `&self` so one store
//! can be shared between worker threads behind an `Arc`; every mutation is a
//! single atomic critical section (a mutex for memory, a write transaction
//! for redb).

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::state::GameState;
use crate::transition::{Enqueued, NewTransition, PendingCounts, Transition};
use crate::{GameId, Result, Signature, TransitionId};
use std::path::Path;

// =============================================================================
// CONTRACTS
// =============================================================================

/// Write-once store of game states keyed by `(game_id, signature)`.
pub trait StateStore: Send + Sync {
    /// Insert a state. Returns `false` (not an error) when it already exists;
    /// the stored copy is never overwritten.
    fn put_state(&self, state: &GameState) -> Result<bool>;

    /// Point lookup. Fails with `QuardsError::StateNotFound` when absent.
    fn get_state(&self, game_id: &GameId, signature: &Signature) -> Result<GameState>;

    /// Every state of a run whose `turn` equals `turn`, ordered by signature.
    fn states_for_turn(&self, game_id: &GameId, turn: u64) -> Result<Vec<GameState>>;

    /// Number of distinct states recorded for a run.
    fn state_count(&self, game_id: &GameId) -> Result<usize>;
}

/// Queue of transitions scoped by run and turn.
pub trait TransitionQueue: Send + Sync {
    /// Idempotent insert keyed by `(game_id, parent_signature, name, params)`.
    fn enqueue(&self, transition: &NewTransition) -> Result<Enqueued>;

    /// Atomically take the lowest-id `Open` transition at exactly `turn`,
    /// marking it `Claimed`. `None` means no open work at that turn.
    fn claim_one(&self, game_id: &GameId, turn: u64) -> Result<Option<Transition>>;

    /// Close a transition and record the state it produced.
    ///
    /// Errors with `AlreadyResolved` if it is closed already.
    fn resolve(&self, id: TransitionId, child: &Signature) -> Result<()>;

    /// Return a claimed transition to `Open`.
    fn release(&self, id: TransitionId) -> Result<()>;

    /// Reopen every claimed transition of a run. Returns how many.
    ///
    /// Only safe when no worker is running against the run.
    fn recover_claims(&self, game_id: &GameId) -> Result<usize>;

    /// Open and claimed counts at one turn.
    fn pending(&self, game_id: &GameId, turn: u64) -> Result<PendingCounts>;

    /// Fetch one transition.
    fn get_transition(&self, id: TransitionId) -> Result<Transition>;

    /// Every transition of a run in id order.
    fn transitions(&self, game_id: &GameId) -> Result<Vec<Transition>>;
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Storage backend chosen at run-configuration time.
#[derive(Debug)]
pub enum StorageBackend {
    /// Volatile maps (tests, dry runs).
    InMemory(MemoryStore),
    /// Disk-backed redb database (ACID, resumable).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open or create a redb-backed store.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl StateStore for StorageBackend {
    fn put_state(&self, state: &GameState) -> Result<bool> {
        match self {
            Self::InMemory(s) => s.put_state(state),
            Self::Persistent(s) => s.put_state(state),
        }
    }

    fn get_state(&self, game_id: &GameId, signature: &Signature) -> Result<GameState> {
        match self {
            Self::InMemory(s) => s.get_state(game_id, signature),
            Self::Persistent(s) => s.get_state(game_id, signature),
        }
    }

    fn states_for_turn(&self, game_id: &GameId, turn: u64) -> Result<Vec<GameState>> {
        match self {
            Self::InMemory(s) => s.states_for_turn(game_id, turn),
            Self::Persistent(s) => s.states_for_turn(game_id, turn),
        }
    }

    fn state_count(&self, game_id: &GameId) -> Result<usize> {
        match self {
            Self::InMemory(s) => s.state_count(game_id),
            Self::Persistent(s) => s.state_count(game_id),
        }
    }
}

impl TransitionQueue for StorageBackend {
    fn enqueue(&self, transition: &NewTransition) -> Result<Enqueued> {
        match self {
            Self::InMemory(s) => s.enqueue(transition),
            Self::Persistent(s) => s.enqueue(transition),
        }
    }

    fn claim_one(&self, game_id: &GameId, turn: u64) -> Result<Option<Transition>> {
        match self {
            Self::InMemory(s) => s.claim_one(game_id, turn),
            Self::Persistent(s) => s.claim_one(game_id, turn),
        }
    }

    fn resolve(&self, id: TransitionId, child: &Signature) -> Result<()> {
        match self {
            Self::InMemory(s) => s.resolve(id, child),
            Self::Persistent(s) => s.resolve(id, child),
        }
    }

    fn release(&self, id: TransitionId) -> Result<()> {
        match self {
            Self::InMemory(s) => s.release(id),
            Self::Persistent(s) => s.release(id),
        }
    }

    fn recover_claims(&self, game_id: &GameId) -> Result<usize> {
        match self {
            Self::InMemory(s) => s.recover_claims(game_id),
            Self::Persistent(s) => s.recover_claims(game_id),
        }
    }

    fn pending(&self, game_id: &GameId, turn: u64) -> Result<PendingCounts> {
        match self {
            Self::InMemory(s) => s.pending(game_id, turn),
            Self::Persistent(s) => s.pending(game_id, turn),
        }
    }

    fn get_transition(&self, id: TransitionId) -> Result<Transition> {
        match self {
            Self::InMemory(s) => s.get_transition(id),
            Self::Persistent(s) => s.get_transition(id),
        }
    }

    fn transitions(&self, game_id: &GameId) -> Result<Vec<Transition>> {
        match self {
            Self::InMemory(s) => s.transitions(game_id),
            Self::Persistent(s) => s.transitions(game_id),
        }
    }
}
