//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//!
//! Exploration is blocking work (redb transactions, rule evaluation) and runs
//! on tokio's blocking pool; the async side only waits for it and turns
//! ctrl-c into the explorer's stop flag.

use crate::config::QuardsConfig;
use quards_core::games::lorcana::{LorcanaEvaluator, LorcanaSetup};
use quards_core::{
    ExploreReport, Explorer, GameId, QuardsError, Signature, StateStore, StorageBackend,
    TransitionQueue, TransitionStatus, explore_parallel, summarize_turn,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// EXPLORE COMMAND
// =============================================================================

/// Seed the run (unless resuming), reopen stale claims and explore
/// `start_depth..max_depth`.
pub async fn cmd_explore(
    config: &QuardsConfig,
    game: GameId,
    json_mode: bool,
    resume: bool,
) -> Result<(), QuardsError> {
    config.explore.validate()?;
    let store = Arc::new(config.storage.open()?);
    let cards = Arc::new(config.lorcana.load_cards()?);
    let setup = if resume {
        None
    } else {
        Some(config.lorcana.load_setup(&cards)?)
    };
    let evaluator = Arc::new(LorcanaEvaluator::new(cards));
    let explore = config.explore.clone();
    let stop = stop_on_interrupt();

    tracing::info!(
        "Exploring game {} to depth {} with {} worker(s)",
        game,
        explore.max_depth,
        explore.workers
    );

    let report = run_blocking(move || {
        let mut explorer = Explorer::new(
            Arc::clone(&evaluator),
            Arc::clone(&store),
            game.clone(),
            explore.clone(),
        )
        .with_stop_flag(Arc::clone(&stop));

        if let Some(setup) = &setup {
            explorer.seed(setup)?;
        }
        // This process owns the run, so any claim still held is stale.
        explorer.recover()?;

        if explore.workers > 1 {
            explore_parallel(evaluator, store, &game, &explore, stop)
        } else {
            explorer.run()
        }
    })
    .await?;

    print_report(&report, json_mode);
    Ok(())
}

// =============================================================================
// TURN COMMAND
// =============================================================================

/// Resolve every transition at one turn.
pub async fn cmd_turn(
    config: &QuardsConfig,
    game: GameId,
    json_mode: bool,
    turn: u64,
) -> Result<(), QuardsError> {
    let store = Arc::new(config.storage.open()?);
    let cards = Arc::new(config.lorcana.load_cards()?);
    let setup: LorcanaSetup = config.lorcana.load_setup(&cards)?;
    let evaluator = Arc::new(LorcanaEvaluator::new(cards));
    let explore = config.explore.clone();
    let stop = stop_on_interrupt();
    let summary_store = Arc::clone(&store);
    let summary_game = game.clone();

    let report = run_blocking(move || {
        let mut explorer =
            Explorer::new(evaluator, store, game, explore).with_stop_flag(stop);
        explorer.seed(&setup)?;
        explorer.recover()?;
        explorer.run_turn(turn)
    })
    .await?;

    print_report(&report, json_mode);
    let summary = summarize_turn(summary_store.as_ref(), &summary_game, turn + 1)?;
    if json_mode {
        print_json(&serde_json::json!({ "turn_end": summary }));
    } else {
        println!(
            "Turn {} ends in {} distinct state(s), {} victorious",
            turn, summary.possibilities, summary.victories
        );
    }
    Ok(())
}

// =============================================================================
// SUMMARY COMMAND
// =============================================================================

/// Count possibilities and victories at a turn.
pub fn cmd_summary(
    config: &QuardsConfig,
    game: &GameId,
    json_mode: bool,
    turn: u64,
) -> Result<(), QuardsError> {
    let store = config.storage.open()?;
    let summary = summarize_turn(&store, game, turn)?;

    if json_mode {
        print_json(&serde_json::json!({
            "game": game.as_str(),
            "turn": summary.turn,
            "possibilities": summary.possibilities,
            "victories": summary.victories
        }));
        return Ok(());
    }

    println!("Turn {} of game {}", summary.turn, game);
    println!("  Possibilities: {}", summary.possibilities);
    println!("  Victories:     {}", summary.victories);
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show state and transition counts for a run.
pub fn cmd_status(config: &QuardsConfig, game: &GameId, json_mode: bool) -> Result<(), QuardsError> {
    let store = config.storage.open()?;
    let status = RunStatus::collect(&store, game)?;

    if json_mode {
        print_json(&serde_json::json!({
            "game": game.as_str(),
            "backend": config.storage.backend,
            "database": config.storage.database.to_string_lossy(),
            "states": status.states,
            "open": status.open,
            "claimed": status.claimed,
            "closed": status.closed,
            "frontier_turn": status.frontier_turn
        }));
        return Ok(());
    }

    println!("Quards Run Status");
    println!("=================");
    println!("Game:     {}", game);
    println!("Backend:  {}", config.storage.backend);
    println!("Database: {:?}", config.storage.database);
    println!();
    println!("States:      {}", status.states);
    println!("Open:        {}", status.open);
    println!("Claimed:     {}", status.claimed);
    println!("Closed:      {}", status.closed);
    match status.frontier_turn {
        Some(turn) => println!("Frontier:    turn {}", turn),
        None => println!("Frontier:    none (fully explored)"),
    }
    Ok(())
}

/// Aggregate counts behind `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatus {
    /// Distinct states stored.
    pub states: usize,
    /// Transitions waiting to be claimed.
    pub open: usize,
    /// Transitions held by a worker (or left behind by a crash).
    pub claimed: usize,
    /// Resolved transitions.
    pub closed: usize,
    /// Lowest turn with unresolved work.
    pub frontier_turn: Option<u64>,
}

impl RunStatus {
    /// Count everything recorded for `game`.
    pub fn collect(store: &StorageBackend, game: &GameId) -> Result<Self, QuardsError> {
        let mut by_status: BTreeMap<TransitionStatus, usize> = BTreeMap::new();
        let mut frontier_turn: Option<u64> = None;
        for transition in store.transitions(game)? {
            *by_status.entry(transition.status).or_default() += 1;
            if transition.status != TransitionStatus::Closed {
                frontier_turn = Some(
                    frontier_turn.map_or(transition.turn, |turn| turn.min(transition.turn)),
                );
            }
        }
        let count = |status: TransitionStatus| by_status.get(&status).copied().unwrap_or(0);
        Ok(Self {
            states: store.state_count(game)?,
            open: count(TransitionStatus::Open),
            claimed: count(TransitionStatus::Claimed),
            closed: count(TransitionStatus::Closed),
            frontier_turn,
        })
    }
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print one stored state.
pub fn cmd_show(
    config: &QuardsConfig,
    game: &GameId,
    json_mode: bool,
    signature: &str,
) -> Result<(), QuardsError> {
    let store = config.storage.open()?;
    let state = store.get_state(game, &Signature(signature.to_string()))?;

    if json_mode {
        print_json(&serde_json::to_value(&state)?);
        return Ok(());
    }

    println!("State {}", state.signature);
    println!("Game:     {} ({})", state.game_id, state.game);
    println!("Turn:     {}", state.turn()?);
    println!("Complete: {}", state.is_complete());
    println!();
    print_json(&state.data);
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Run blocking exploration work off the async runtime.
async fn run_blocking<T, F>(task: F) -> Result<T, QuardsError>
where
    F: FnOnce() -> Result<T, QuardsError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| QuardsError::IoError(format!("exploration task failed: {}", e)))?
}

/// A stop flag raised by ctrl-c.
fn stop_on_interrupt() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after in-flight transitions");
            flag.store(true, Ordering::SeqCst);
        }
    });
    stop
}

fn print_report(report: &ExploreReport, json_mode: bool) {
    if json_mode {
        print_json(&serde_json::json!({ "report": report }));
        return;
    }

    println!("Exploration {}", if report.cancelled { "interrupted" } else { "finished" });
    println!("  Transitions resolved: {}", report.transitions_resolved);
    println!("  States written:       {}", report.states_written);
    println!("  Terminal states:      {}", report.terminal_states);
    println!("  Edges enqueued:       {}", report.edges_enqueued);
    println!("  Duplicate edges:      {}", report.duplicate_edges);
    println!("  Depth reached:        {}", report.depth_reached);
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}
