//! # quards-core
//!
//! The deterministic exploration engine for Quards.
//!
//! Quards enumerates every reachable state of a card game by breadth-first
//! expansion of a persisted transition graph. Game states are
//! content-addressed (`Signature`), transitions are deduplicated by their
//! natural key, and work is handed out one transition at a time so any
//! number of workers can share a store and a crashed run can resume.
//!
//! ## Layout
//!
//! - `types`, `signature`, `state`, `transition`: the data model
//! - `store`: the persistence seam (in-memory and redb backends)
//! - `evaluator`, `games`: game rules behind a trait
//! - `explorer`: the turn-ordered driver loop
//! - `query`: per-turn summaries
//!
//! ## Constraints
//!
//! - No async in this crate; concurrency is plain threads over a shared store
//! - Every persisted collection iterates in a deterministic order
//! - Rule evaluation is pure: a parent state is never mutated

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod evaluator;
pub mod explorer;
pub mod games;
pub mod query;
pub mod signature;
pub mod state;
pub mod store;
pub mod transition;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{GameId, QuardsError, Result, Signature, TransitionId};

// =============================================================================
// RE-EXPORTS: Data Model
// =============================================================================

pub use signature::{canonical_json, signature};
pub use state::GameState;
pub use transition::{
    Action, Enqueued, NewTransition, PendingCounts, START_ACTION, Transition, TransitionStatus,
};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use store::{MemoryStore, RedbStore, StateStore, StorageBackend, TransitionQueue};

// =============================================================================
// RE-EXPORTS: Exploration
// =============================================================================

pub use config::ExploreConfig;
pub use evaluator::{Evaluator, Outcome};
pub use explorer::{ExploreReport, Explorer, StepReport, explore_parallel};
pub use query::{TurnSummary, summarize_turn};
