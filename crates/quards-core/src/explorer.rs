//! # Exploration Driver
//!
//! Breadth-first, depth-bounded traversal of a game's state space.
//!
//! ```text
//!   seed ──▶ put(initial) ──▶ enqueue("start", turn 0)
//!
//!   loop depth in start_depth..max_depth:
//!       claim_one(depth) ─┬─ Some(t) ─▶ load parent ─▶ execute ─▶ put(child)
//!                         │             ─▶ enqueue(next actions @ child.turn)
//!                         │             ─▶ resolve(t, child)
//!                         └─ None ────▶ pending(depth) drained? ─▶ depth + 1
//! ```
//!
//! Because `claim_one` only ever returns work at the requested turn, and a
//! child's turn is never below its transition's turn, depth N is fully
//! resolved before any depth N+1 transition is executed. With several workers
//! the advance decision uses the shared `pending` counts, so no worker moves
//! on while another still holds a claim that could add work at the depth.
//! A run refuses to start above a depth that still has unresolved work, and a
//! lone worker fails instead of waiting on claims left by a crashed run.

use crate::config::ExploreConfig;
use crate::evaluator::Evaluator;
use crate::state::GameState;
use crate::store::{StateStore, TransitionQueue};
use crate::transition::{Action, Enqueued, NewTransition, START_ACTION, Transition};
use crate::{GameId, QuardsError, Result, Signature, TransitionId};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

// =============================================================================
// REPORTS
// =============================================================================

/// What one executed transition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// The transition that was resolved.
    pub transition: TransitionId,
    /// Its action name.
    pub action: String,
    /// Signature of the resulting state.
    pub child: Signature,
    /// Turn of the resulting state.
    pub child_turn: u64,
    /// False when the child state was already stored.
    pub state_written: bool,
    /// New transitions enqueued from the child.
    pub edges_enqueued: u64,
    /// Follow-on actions that were already queued.
    pub duplicate_edges: u64,
    /// The child has no legal actions.
    pub terminal: bool,
}

/// Totals for a run (or one worker's share of it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExploreReport {
    /// Transitions executed and closed.
    pub transitions_resolved: u64,
    /// Distinct states written.
    pub states_written: u64,
    /// Transitions created.
    pub edges_enqueued: u64,
    /// Enqueues that hit an existing natural key.
    pub duplicate_edges: u64,
    /// Newly written states with no legal actions.
    pub terminal_states: u64,
    /// Depth the driver stopped at.
    pub depth_reached: u64,
    /// Stopped by the stop flag rather than the depth bound.
    pub cancelled: bool,
}

impl ExploreReport {
    fn record(&mut self, step: &StepReport) {
        self.transitions_resolved += 1;
        self.edges_enqueued += step.edges_enqueued;
        self.duplicate_edges += step.duplicate_edges;
        if step.state_written {
            self.states_written += 1;
            if step.terminal {
                self.terminal_states += 1;
            }
        }
    }

    /// Fold another worker's totals into this one.
    pub fn merge(&mut self, other: &Self) {
        self.transitions_resolved += other.transitions_resolved;
        self.states_written += other.states_written;
        self.edges_enqueued += other.edges_enqueued;
        self.duplicate_edges += other.duplicate_edges;
        self.terminal_states += other.terminal_states;
        self.depth_reached = self.depth_reached.max(other.depth_reached);
        self.cancelled |= other.cancelled;
    }
}

// =============================================================================
// PARENT CACHE
// =============================================================================

/// Bounded FIFO cache of parsed states, keyed by signature.
#[derive(Debug)]
struct StateCache<T> {
    capacity: usize,
    entries: BTreeMap<Signature, Arc<T>>,
    order: VecDeque<Signature>,
}

impl<T> StateCache<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: BTreeMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, signature: &Signature) -> Option<Arc<T>> {
        self.entries.get(signature).cloned()
    }

    fn insert(&mut self, signature: Signature, state: Arc<T>) {
        if self.capacity == 0 || self.entries.contains_key(&signature) {
            return;
        }
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                }
                None => break,
            }
        }
        self.order.push_back(signature.clone());
        self.entries.insert(signature, state);
    }
}

// =============================================================================
// EXPLORER
// =============================================================================

/// Drives exploration of one run against a shared store.
///
/// Each worker owns one `Explorer`; the evaluator and store are shared.
pub struct Explorer<E: Evaluator, S> {
    evaluator: Arc<E>,
    store: Arc<S>,
    game_id: GameId,
    config: ExploreConfig,
    cache: StateCache<E::State>,
    stop: Arc<AtomicBool>,
}

impl<E: Evaluator, S> std::fmt::Debug for Explorer<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Explorer")
            .field("game", &self.evaluator.game())
            .field("game_id", &self.game_id)
            .field("config", &self.config)
            .field("cached_states", &self.cache.entries.len())
            .finish_non_exhaustive()
    }
}

impl<E, S> Explorer<E, S>
where
    E: Evaluator,
    S: StateStore + TransitionQueue,
{
    /// Create a driver for `game_id`.
    pub fn new(evaluator: Arc<E>, store: Arc<S>, game_id: GameId, config: ExploreConfig) -> Self {
        let cache = StateCache::new(config.cache_capacity);
        Self {
            evaluator,
            store,
            game_id,
            config,
            cache,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an external stop flag (ctrl-c, sibling workers).
    #[must_use]
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// The flag that cancels this driver between transitions.
    #[must_use]
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// The run being explored.
    #[must_use]
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Store the initial state and enqueue the `start` transition at turn 0.
    ///
    /// Seeding an already seeded run writes nothing new.
    pub fn seed(&mut self, setup: &E::Setup) -> Result<Signature> {
        let initial = self.evaluator.initial_state(self.game_id.as_str(), setup)?;
        let root = GameState::new(
            self.game_id.clone(),
            self.evaluator.game(),
            serde_json::to_value(&initial)?,
        )?;
        let written = self.store.put_state(&root)?;
        let start = NewTransition::new(
            self.game_id.clone(),
            root.signature.clone(),
            Action::new(START_ACTION),
            0,
        );
        let enqueued = self.store.enqueue(&start)?;

        tracing::info!(
            "Seeded {} game {}: root {} (new state: {}, new start edge: {})",
            self.evaluator.game(),
            self.game_id,
            root.signature.short(),
            written,
            enqueued.is_new()
        );
        self.cache.insert(root.signature.clone(), Arc::new(initial));
        Ok(root.signature)
    }

    /// Reopen transitions left claimed by a crashed run.
    ///
    /// Only call while no other worker is exploring this run.
    pub fn recover(&self) -> Result<usize> {
        let reopened = self.store.recover_claims(&self.game_id)?;
        if reopened > 0 {
            tracing::warn!(
                "Reopened {} transitions left claimed in game {}",
                reopened,
                self.game_id
            );
        }
        Ok(reopened)
    }

    /// Claim and execute one transition at `depth`.
    ///
    /// `Ok(None)` means no open work at this depth. On failure the claimed
    /// transition is released back to `Open` and the error is returned.
    pub fn step(&mut self, depth: u64) -> Result<Option<StepReport>> {
        let Some(transition) = self.store.claim_one(&self.game_id, depth)? else {
            return Ok(None);
        };

        match self.execute(&transition) {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                tracing::warn!(
                    "Transition {} ('{}') failed, leaving it open: {}",
                    transition.id,
                    transition.action.name,
                    e
                );
                if let Err(release_err) = self.store.release(transition.id) {
                    tracing::error!(
                        "Could not release transition {}: {}",
                        transition.id,
                        release_err
                    );
                }
                Err(e)
            }
        }
    }

    fn load_parent(&mut self, signature: &Signature) -> Result<Arc<E::State>> {
        if let Some(state) = self.cache.get(signature) {
            return Ok(state);
        }
        let stored = self.store.get_state(&self.game_id, signature)?;
        let state: Arc<E::State> = Arc::new(serde_json::from_value(stored.data)?);
        self.cache.insert(signature.clone(), Arc::clone(&state));
        Ok(state)
    }

    fn execute(&mut self, transition: &Transition) -> Result<StepReport> {
        let parent = self.load_parent(&transition.parent_signature)?;
        let outcome = self.evaluator.execute(&parent, &transition.action)?;

        let child = GameState::new(
            self.game_id.clone(),
            self.evaluator.game(),
            serde_json::to_value(&outcome.state)?,
        )?;
        let child_turn = child.turn()?;
        if child_turn < transition.turn {
            return Err(QuardsError::InvalidState(format!(
                "'{}' moved turn backwards from {} to {}",
                transition.action.name, transition.turn, child_turn
            )));
        }

        let state_written = self.store.put_state(&child)?;
        let terminal = outcome.next_actions.is_empty();
        let mut edges_enqueued = 0;
        let mut duplicate_edges = 0;
        for action in outcome.next_actions {
            let next = NewTransition::new(
                self.game_id.clone(),
                child.signature.clone(),
                action,
                child_turn,
            );
            match self.store.enqueue(&next)? {
                Enqueued::Inserted(_) => edges_enqueued += 1,
                Enqueued::Duplicate(_) => duplicate_edges += 1,
            }
        }
        self.store.resolve(transition.id, &child.signature)?;

        tracing::debug!(
            "{} '{}' @{} -> {} @{} (+{} edges{})",
            transition.id,
            transition.action.name,
            transition.turn,
            child.signature.short(),
            child_turn,
            edges_enqueued,
            if terminal { ", terminal" } else { "" }
        );
        self.cache
            .insert(child.signature.clone(), Arc::new(outcome.state));

        Ok(StepReport {
            transition: transition.id,
            action: transition.action.name.clone(),
            child: child.signature,
            child_turn,
            state_written,
            edges_enqueued,
            duplicate_edges,
            terminal,
        })
    }

    /// Explore depths `start_depth..max_depth` from the config.
    pub fn run(&mut self) -> Result<ExploreReport> {
        self.config.validate()?;
        self.run_between(self.config.start_depth, self.config.max_depth)
    }

    /// Resolve every transition at `turn` and stop.
    ///
    /// States recorded at `turn + 1` afterwards are the ways the turn can end.
    pub fn run_turn(&mut self, turn: u64) -> Result<ExploreReport> {
        self.run_between(turn, turn.saturating_add(1))
    }

    /// Fail unless every depth below `depth` has been fully resolved.
    fn ensure_drained_below(&self, depth: u64) -> Result<()> {
        for shallower in 0..depth {
            let pending = self.store.pending(&self.game_id, shallower)?;
            if !pending.is_drained() {
                return Err(QuardsError::InvalidState(format!(
                    "depth {} of game {} still has {} open and {} claimed transitions; \
                     resolve it before depth {}",
                    shallower, self.game_id, pending.open, pending.claimed, depth
                )));
            }
        }
        Ok(())
    }

    fn run_between(&mut self, from: u64, until: u64) -> Result<ExploreReport> {
        self.ensure_drained_below(from)?;

        let mut report = ExploreReport::default();
        let mut depth = from;

        while depth < until {
            if self.stop.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }

            if let Some(step) = self.step(depth)? {
                report.record(&step);
                continue;
            }

            let pending = self.store.pending(&self.game_id, depth)?;
            if pending.is_drained() {
                tracing::info!(
                    "Depth {} of game {} resolved, delving deeper",
                    depth,
                    self.game_id
                );
                depth += 1;
            } else if pending.open == 0 {
                if self.config.workers <= 1 {
                    // No other worker can release these.
                    return Err(QuardsError::InvalidState(format!(
                        "{} transitions at depth {} of game {} are claimed by no live worker; \
                         recover the run first",
                        pending.claimed, depth, self.game_id
                    )));
                }
                // Another worker holds a claim that may still add work here.
                thread::sleep(self.config.poll_interval());
            }
        }

        report.depth_reached = depth;
        tracing::info!(
            "Stopped game {} at depth {}: {} transitions resolved, {} new states{}",
            self.game_id,
            depth,
            report.transitions_resolved,
            report.states_written,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }
}

/// Run `config.workers` drivers concurrently over one store.
///
/// The run must already be seeded. The first worker error stops the others
/// and is returned; otherwise the merged totals are.
pub fn explore_parallel<E, S>(
    evaluator: Arc<E>,
    store: Arc<S>,
    game_id: &GameId,
    config: &ExploreConfig,
    stop: Arc<AtomicBool>,
) -> Result<ExploreReport>
where
    E: Evaluator,
    S: StateStore + TransitionQueue,
{
    config.validate()?;

    let results: Vec<Result<ExploreReport>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.workers)
            .map(|worker| {
                let mut explorer = Explorer::new(
                    Arc::clone(&evaluator),
                    Arc::clone(&store),
                    game_id.clone(),
                    config.clone(),
                )
                .with_stop_flag(Arc::clone(&stop));
                let stop = Arc::clone(&stop);
                scope.spawn(move || {
                    let result = explorer.run();
                    if let Err(e) = &result {
                        tracing::error!("Worker {} stopped: {}", worker, e);
                        stop.store(true, Ordering::SeqCst);
                    }
                    result
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(QuardsError::IoError("worker panicked".to_string())))
            })
            .collect()
    });

    let mut total = ExploreReport::default();
    for result in results {
        total.merge(&result?);
    }
    Ok(total)
}

// =============================================================================
// TESTS
// =============================================================================
