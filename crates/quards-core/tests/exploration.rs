//! # Exploration Tests
//!
//! End-to-end runs of the driver against small rule sets with hand-countable
//! state spaces, over both storage backends.

use quards_core::games::lorcana::{CardIndex, Deck, LorcanaEvaluator, LorcanaSetup};
use quards_core::{
    Action, Evaluator, ExploreConfig, Explorer, GameId, MemoryStore, NewTransition, Outcome,
    QuardsError, RedbStore, Result, START_ACTION, StateStore, StorageBackend, TransitionQueue,
    TransitionStatus, explore_parallel, summarize_turn,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

// =============================================================================
// TEST RULE SETS
// =============================================================================

/// `start` and `pass` both advance the turn; the only follow-up is `pass`.
struct PassGame;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PassState {
    turn: u64,
    hand: Vec<String>,
}

impl Evaluator for PassGame {
    type State = PassState;
    type Setup = ();

    fn game(&self) -> &str {
        "pass"
    }

    fn initial_state(&self, _seed: &str, _setup: &()) -> Result<PassState> {
        Ok(PassState {
            turn: 0,
            hand: vec!["x".to_string(), "y".to_string()],
        })
    }

    fn execute(&self, state: &PassState, action: &Action) -> Result<Outcome<PassState>> {
        match action.name.as_str() {
            START_ACTION | "pass" => {
                let next = PassState {
                    turn: state.turn + 1,
                    hand: state.hand.clone(),
                };
                Ok(Outcome::new(next, vec![Action::new("pass")]))
            }
            other => Err(QuardsError::illegal(other, "unknown action")),
        }
    }
}

/// Each turn offers `step {n: 1}`, `step {n: 2}` and, once per turn, `hold`,
/// which stays on the same turn. Paths converge on equal totals.
struct BranchGame;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BranchState {
    turn: u64,
    total: u64,
    held: bool,
    complete: bool,
}

impl BranchGame {
    fn actions(state: &BranchState) -> Vec<Action> {
        let mut actions = vec![
            Action::with_params("step", json!({"n": 1})),
            Action::with_params("step", json!({"n": 2})),
        ];
        if !state.held {
            actions.push(Action::new("hold"));
        }
        actions
    }
}

impl Evaluator for BranchGame {
    type State = BranchState;
    type Setup = ();

    fn game(&self) -> &str {
        "branch"
    }

    fn initial_state(&self, _seed: &str, _setup: &()) -> Result<BranchState> {
        Ok(BranchState {
            turn: 0,
            total: 0,
            held: false,
            complete: false,
        })
    }

    fn execute(&self, state: &BranchState, action: &Action) -> Result<Outcome<BranchState>> {
        let next = match action.name.as_str() {
            START_ACTION => BranchState {
                turn: 1,
                ..state.clone()
            },
            "step" => {
                let n = action.params["n"]
                    .as_u64()
                    .ok_or_else(|| QuardsError::illegal("step", "missing n"))?;
                BranchState {
                    turn: state.turn + 1,
                    total: state.total + n,
                    held: false,
                    complete: state.total + n >= 4,
                }
            }
            "hold" if !state.held => BranchState {
                held: true,
                ..state.clone()
            },
            other => return Err(QuardsError::illegal(other, "not available")),
        };
        if next.complete {
            return Ok(Outcome::terminal(next));
        }
        let actions = Self::actions(&next);
        Ok(Outcome::new(next, actions))
    }
}

/// Turn one offers a single action that always fails.
struct FaultyGame;

impl Evaluator for FaultyGame {
    type State = PassState;
    type Setup = ();

    fn game(&self) -> &str {
        "faulty"
    }

    fn initial_state(&self, seed: &str, setup: &()) -> Result<PassState> {
        PassGame.initial_state(seed, setup)
    }

    fn execute(&self, state: &PassState, action: &Action) -> Result<Outcome<PassState>> {
        if action.name == START_ACTION {
            let next = PassState {
                turn: 1,
                hand: state.hand.clone(),
            };
            return Ok(Outcome::new(next, vec![Action::new("boom")]));
        }
        Err(QuardsError::illegal(&action.name, "exploded"))
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn explorer<E, S>(evaluator: E, store: &Arc<S>, max_depth: u64) -> Explorer<E, S>
where
    E: Evaluator,
    S: StateStore + TransitionQueue,
{
    Explorer::new(
        Arc::new(evaluator),
        Arc::clone(store),
        GameId::new("S"),
        ExploreConfig::with_max_depth(max_depth),
    )
}

fn status_counts<S: TransitionQueue>(store: &S, game: &GameId) -> (usize, usize, usize) {
    let transitions = store.transitions(game).expect("transitions");
    let count = |status: TransitionStatus| transitions.iter().filter(|t| t.status == status).count();
    (
        count(TransitionStatus::Open),
        count(TransitionStatus::Claimed),
        count(TransitionStatus::Closed),
    )
}

/// Every resolved edge as (parent, action, params, child).
fn closed_edges<S: TransitionQueue>(
    store: &S,
    game: &GameId,
) -> BTreeSet<(String, String, String, String)> {
    store
        .transitions(game)
        .expect("transitions")
        .into_iter()
        .filter_map(|t| {
            t.child_signature.map(|child| {
                (
                    t.parent_signature.0,
                    t.action.name,
                    t.action.params.to_string(),
                    child.0,
                )
            })
        })
        .collect()
}

// =============================================================================
// SCENARIOS
// =============================================================================

mod pass_game {
    use super::*;

    /// Two explored depths: root, turn 1 and turn 2 states; the pass out of
    /// turn 2 stays open.
    #[test]
    fn explores_two_depths() {
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(PassGame, &store, 2);
        let game = GameId::new("S");

        explorer.seed(&()).expect("seed");
        let report = explorer.run().expect("run");

        assert_eq!(report.transitions_resolved, 2);
        assert_eq!(report.depth_reached, 2);
        assert!(!report.cancelled);
        assert_eq!(store.state_count(&game).expect("count"), 3);
        assert_eq!(status_counts(store.as_ref(), &game), (1, 0, 2));

        let open = store
            .transitions(&game)
            .expect("transitions")
            .into_iter()
            .find(|t| t.status == TransitionStatus::Open)
            .expect("open edge");
        assert_eq!(open.action.name, "pass");
        assert_eq!(open.turn, 2);

        let summary = summarize_turn(store.as_ref(), &game, 2).expect("summary");
        assert_eq!(summary.possibilities, 1);
        assert_eq!(summary.victories, 0);
    }

    #[test]
    fn seeding_twice_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(PassGame, &store, 1);
        let game = GameId::new("S");

        let first = explorer.seed(&()).expect("seed");
        let second = explorer.seed(&()).expect("seed");

        assert_eq!(first, second);
        assert_eq!(store.state_count(&game).expect("count"), 1);
        assert_eq!(store.transitions(&game).expect("transitions").len(), 1);
    }

    #[test]
    fn redb_run_resumes_after_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("quards.redb");
        let game = GameId::new("S");

        {
            let store = Arc::new(RedbStore::open(&path).expect("open"));
            let mut explorer = explorer(PassGame, &store, 2);
            explorer.seed(&()).expect("seed");
            explorer.run().expect("run");
            assert_eq!(store.state_count(&game).expect("count"), 3);
        }

        let store = Arc::new(RedbStore::open(&path).expect("reopen"));
        let mut explorer = explorer(PassGame, &store, 4);
        assert_eq!(explorer.recover().expect("recover"), 0);
        let report = explorer.run().expect("resume");

        // Only the two new depths are resolved the second time.
        assert_eq!(report.transitions_resolved, 2);
        assert_eq!(store.state_count(&game).expect("count"), 5);
        assert_eq!(status_counts(store.as_ref(), &game), (1, 0, 4));
    }

    #[test]
    fn storage_backend_delegates() {
        let store = Arc::new(StorageBackend::default());
        assert!(!store.is_persistent());
        let mut explorer = explorer(PassGame, &store, 3);
        explorer.seed(&()).expect("seed");
        explorer.run().expect("run");
        assert_eq!(store.state_count(&GameId::new("S")).expect("count"), 4);
    }

    #[test]
    fn stop_flag_cancels_before_work() {
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(PassGame, &store, 5);
        explorer.seed(&()).expect("seed");
        explorer
            .stop_flag()
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let report = explorer.run().expect("run");
        assert!(report.cancelled);
        assert_eq!(report.transitions_resolved, 0);
        assert_eq!(status_counts(store.as_ref(), &GameId::new("S")), (1, 0, 0));
    }
}

mod branch_game {
    use super::*;

    /// Depth 0: start. Depth 1: step 1, step 2, hold, then the held state's
    /// step 1 and step 2 which land on already known states.
    #[test]
    fn converging_paths_share_states() {
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(BranchGame, &store, 2);
        let game = GameId::new("S");

        explorer.seed(&()).expect("seed");
        let report = explorer.run().expect("run");

        assert_eq!(report.transitions_resolved, 6);
        assert_eq!(report.states_written, 4);
        assert_eq!(report.duplicate_edges, 6);
        assert_eq!(store.state_count(&game).expect("count"), 5);
        assert_eq!(status_counts(store.as_ref(), &game), (6, 0, 6));
        assert_eq!(
            summarize_turn(store.as_ref(), &game, 1)
                .expect("summary")
                .possibilities,
            2
        );
        assert_eq!(
            summarize_turn(store.as_ref(), &game, 2)
                .expect("summary")
                .possibilities,
            2
        );
    }

    #[test]
    fn shallower_depths_resolve_first() {
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(BranchGame, &store, 3);
        let game = GameId::new("S");
        explorer.seed(&()).expect("seed");

        // Nothing is claimable past the frontier.
        assert!(explorer.step(1).expect("step").is_none());
        let first = explorer.step(0).expect("step").expect("start edge");
        assert_eq!(first.action, START_ACTION);
        assert_eq!(first.child_turn, 1);

        explorer.run_turn(1).expect("turn 1");
        let pending = store.pending(&game, 1).expect("pending");
        assert!(pending.is_drained());
        assert!(store.pending(&game, 2).expect("pending").open > 0);
    }

    #[test]
    fn terminal_states_count_as_victories() {
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(BranchGame, &store, 5);
        let game = GameId::new("S");
        explorer.seed(&()).expect("seed");
        let report = explorer.run().expect("run");

        assert!(report.terminal_states > 0);
        let summary = summarize_turn(store.as_ref(), &game, 3).expect("summary");
        assert!(summary.victories > 0);
        assert!(summary.victories <= summary.possibilities);
        // Every total reaches 4 by turn 5, so nothing stays open.
        assert_eq!(status_counts(store.as_ref(), &game).0, 0);
    }

    #[test]
    fn identical_runs_produce_identical_graphs() {
        let game = GameId::new("S");
        let run = || {
            let store = Arc::new(MemoryStore::new());
            let mut explorer = explorer(BranchGame, &store, 3);
            explorer.seed(&()).expect("seed");
            explorer.run().expect("run");
            closed_edges(store.as_ref(), &game)
        };
        let first = run();
        assert!(!first.is_empty());
        assert_eq!(first, run());
    }

    #[test]
    fn parallel_workers_match_single_worker() {
        let game = GameId::new("S");

        let single = Arc::new(MemoryStore::new());
        let mut explorer = explorer(BranchGame, &single, 4);
        explorer.seed(&()).expect("seed");
        explorer.run().expect("run");

        let shared = Arc::new(MemoryStore::new());
        explorer_seed_only(&shared);
        let config = ExploreConfig {
            workers: 4,
            poll_interval_ms: 1,
            ..ExploreConfig::with_max_depth(4)
        };
        let report = explore_parallel(
            Arc::new(BranchGame),
            Arc::clone(&shared),
            &game,
            &config,
            Arc::new(AtomicBool::new(false)),
        )
        .expect("parallel run");

        assert_eq!(
            closed_edges(shared.as_ref(), &game),
            closed_edges(single.as_ref(), &game)
        );
        assert_eq!(
            report.transitions_resolved,
            closed_edges(single.as_ref(), &game).len() as u64
        );
        assert_eq!(status_counts(shared.as_ref(), &game).1, 0);
    }

    fn explorer_seed_only(store: &Arc<MemoryStore>) {
        explorer(BranchGame, store, 0).seed(&()).expect("seed");
    }
}

mod failures {
    use super::*;

    #[test]
    fn failed_action_stays_open() {
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(FaultyGame, &store, 3);
        let game = GameId::new("S");
        explorer.seed(&()).expect("seed");

        let result = explorer.run();
        assert!(matches!(result, Err(QuardsError::IllegalAction { .. })));

        let pending = store.pending(&game, 1).expect("pending");
        assert_eq!(pending.open, 1);
        assert_eq!(pending.claimed, 0);
        assert_eq!(status_counts(store.as_ref(), &game), (1, 0, 1));
    }

    #[test]
    fn parallel_failure_is_reported() {
        let store = Arc::new(MemoryStore::new());
        explorer(FaultyGame, &store, 3).seed(&()).expect("seed");
        let config = ExploreConfig {
            workers: 3,
            poll_interval_ms: 1,
            ..ExploreConfig::with_max_depth(3)
        };
        let result = explore_parallel(
            Arc::new(FaultyGame),
            Arc::clone(&store),
            &GameId::new("S"),
            &config,
            Arc::new(AtomicBool::new(false)),
        );
        assert!(result.is_err());
        assert_eq!(status_counts(store.as_ref(), &GameId::new("S")).1, 0);
    }
}

mod stale_work {
    use super::*;

    #[test]
    fn lone_worker_fails_on_stale_claim() {
        let store = Arc::new(MemoryStore::new());
        let game = GameId::new("S");
        let mut worker = explorer(PassGame, &store, 3);
        worker.seed(&()).expect("seed");

        // Left behind by a worker that died mid-transition.
        store
            .claim_one(&game, 0)
            .expect("claim")
            .expect("start edge");

        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let _ = tx.send(worker.run());
        });
        let result = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("run returned instead of waiting");
        handle.join().expect("join");

        assert!(matches!(result, Err(QuardsError::InvalidState(_))));
        assert_eq!(status_counts(store.as_ref(), &game), (0, 1, 0));

        let mut restarted = explorer(PassGame, &store, 3);
        assert_eq!(restarted.recover().expect("recover"), 1);
        let report = restarted.run().expect("run");
        assert_eq!(report.transitions_resolved, 3);
        assert_eq!(status_counts(store.as_ref(), &game), (1, 0, 3));
    }

    #[test]
    fn later_start_requires_drained_shallower_depths() {
        let store = Arc::new(MemoryStore::new());
        let game = GameId::new("S");
        explorer(PassGame, &store, 3).seed(&()).expect("seed");

        let config = ExploreConfig {
            start_depth: 1,
            ..ExploreConfig::with_max_depth(3)
        };
        let mut late = Explorer::new(Arc::new(PassGame), Arc::clone(&store), game.clone(), config);

        assert!(matches!(late.run(), Err(QuardsError::InvalidState(_))));
        assert!(matches!(late.run_turn(2), Err(QuardsError::InvalidState(_))));
        assert_eq!(status_counts(store.as_ref(), &game), (1, 0, 0));

        late.run_turn(0).expect("turn 0");
        let report = late.run().expect("run");
        assert_eq!(report.transitions_resolved, 2);
        assert_eq!(status_counts(store.as_ref(), &game), (1, 0, 3));
    }
}

mod claims {
    use super::*;

    fn claim_all_concurrently<S>(store: Arc<S>)
    where
        S: StateStore + TransitionQueue + 'static,
    {
        let game = GameId::new("S");
        let parent = quards_core::GameState::new(game.clone(), "test", json!({"turn": 0}))
            .expect("state");
        for i in 0..40 {
            let edge = NewTransition::new(
                game.clone(),
                parent.signature.clone(),
                Action::with_params("pick", json!({ "i": i })),
                0,
            );
            store.enqueue(&edge).expect("enqueue");
        }

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let store = Arc::clone(&store);
                let game = game.clone();
                thread::spawn(move || {
                    let mut claimed = Vec::new();
                    while let Some(t) = store.claim_one(&game, 0).expect("claim") {
                        claimed.push(t.id);
                    }
                    claimed
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().expect("join"));
        }
        let unique: BTreeSet<_> = all.iter().copied().collect();
        assert_eq!(all.len(), 40);
        assert_eq!(unique.len(), 40);

        let pending = store.pending(&game, 0).expect("pending");
        assert_eq!(pending.open, 0);
        assert_eq!(pending.claimed, 40);
    }

    #[test]
    fn memory_claims_at_most_once() {
        claim_all_concurrently(Arc::new(MemoryStore::new()));
    }

    #[test]
    fn redb_claims_at_most_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        claim_all_concurrently(Arc::new(
            RedbStore::open(dir.path().join("claims.redb")).expect("open"),
        ));
    }
}

mod lorcana {
    use super::*;

    const CARDS: &str = r#"[
        {"Unique_ID": "A", "Name": "Alpha", "Cost": 1, "Inkable": true, "Lore": 2},
        {"Unique_ID": "B", "Name": "Beta", "Cost": 2, "Inkable": false, "Lore": 1}
    ]"#;

    #[test]
    fn first_turn_is_explored() {
        let cards = Arc::new(CardIndex::from_json(CARDS).expect("cards"));
        let deck = Deck::parse("16 Alpha\n4 Beta", &cards).expect("deck");
        let setup = LorcanaSetup {
            deck1: deck.clone(),
            deck2: deck,
        };
        let store = Arc::new(MemoryStore::new());
        let mut explorer = explorer(LorcanaEvaluator::new(cards), &store, 2);
        let game = GameId::new("S");

        explorer.seed(&setup).expect("seed");
        explorer.run().expect("run");

        // Turn 1 ends by passing, either before or after inking an Alpha
        // (and possibly playing it).
        let summary = summarize_turn(store.as_ref(), &game, 2).expect("summary");
        assert!(summary.possibilities >= 2);
        assert_eq!(summary.victories, 0);
        assert_eq!(status_counts(store.as_ref(), &game).1, 0);
        for state in store.states_for_turn(&game, 2).expect("states") {
            assert_eq!(state.data["current_player"], "player2");
        }
    }
}
