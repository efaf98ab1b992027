//! # In-Memory Store
//!
//! `BTreeMap`-backed implementation of both storage contracts. One mutex
//! guards all maps, so each operation is atomic with respect to every other.

use super::{StateStore, TransitionQueue};
use crate::state::GameState;
use crate::transition::{Enqueued, NewTransition, PendingCounts, Transition, TransitionStatus};
use crate::{GameId, QuardsError, Result, Signature, TransitionId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

type TurnKey = (GameId, u64, TransitionId);

#[derive(Debug, Default)]
struct Inner {
    states: BTreeMap<(GameId, Signature), GameState>,
    /// (game, turn, signature) index for turn queries.
    state_turns: BTreeSet<(GameId, u64, Signature)>,
    edges: BTreeMap<TransitionId, Transition>,
    edge_keys: BTreeMap<String, TransitionId>,
    open: BTreeSet<TurnKey>,
    claimed: BTreeSet<TurnKey>,
    next_edge_id: u64,
}

impl Inner {
    fn edge_mut(&mut self, id: TransitionId) -> Result<&mut Transition> {
        self.edges
            .get_mut(&id)
            .ok_or(QuardsError::TransitionNotFound(id))
    }

    fn count_at(set: &BTreeSet<TurnKey>, game_id: &GameId, turn: u64) -> usize {
        set.range(
            (game_id.clone(), turn, TransitionId(0))..=(game_id.clone(), turn, TransitionId(u64::MAX)),
        )
        .count()
    }
}

/// Volatile store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| QuardsError::IoError("memory store lock poisoned".to_string()))
    }
}

impl StateStore for MemoryStore {
    fn put_state(&self, state: &GameState) -> Result<bool> {
        let turn = state.turn()?;
        let mut inner = self.lock()?;
        let key = (state.game_id.clone(), state.signature.clone());
        if inner.states.contains_key(&key) {
            return Ok(false);
        }
        inner.states.insert(key, state.clone());
        inner
            .state_turns
            .insert((state.game_id.clone(), turn, state.signature.clone()));
        Ok(true)
    }

    fn get_state(&self, game_id: &GameId, signature: &Signature) -> Result<GameState> {
        let inner = self.lock()?;
        inner
            .states
            .get(&(game_id.clone(), signature.clone()))
            .cloned()
            .ok_or_else(|| QuardsError::StateNotFound {
                game_id: game_id.clone(),
                signature: signature.clone(),
            })
    }

    fn states_for_turn(&self, game_id: &GameId, turn: u64) -> Result<Vec<GameState>> {
        let inner = self.lock()?;
        let mut states = Vec::new();
        for (game, _, signature) in inner
            .state_turns
            .range((game_id.clone(), turn, Signature(String::new()))..)
            .take_while(|(g, t, _)| g == game_id && *t == turn)
        {
            if let Some(state) = inner.states.get(&(game.clone(), signature.clone())) {
                states.push(state.clone());
            }
        }
        Ok(states)
    }

    fn state_count(&self, game_id: &GameId) -> Result<usize> {
        let inner = self.lock()?;
        Ok(inner
            .states
            .range((game_id.clone(), Signature(String::new()))..)
            .take_while(|((g, _), _)| g == game_id)
            .count())
    }
}

impl TransitionQueue for MemoryStore {
    fn enqueue(&self, transition: &NewTransition) -> Result<Enqueued> {
        let key = transition.natural_key()?;
        let mut inner = self.lock()?;
        if let Some(&existing) = inner.edge_keys.get(&key) {
            return Ok(Enqueued::Duplicate(existing));
        }

        let id = TransitionId(inner.next_edge_id);
        inner.next_edge_id = inner.next_edge_id.saturating_add(1);
        inner.edge_keys.insert(key, id);
        inner
            .open
            .insert((transition.game_id.clone(), transition.turn, id));
        inner.edges.insert(id, Transition::open(id, transition.clone()));
        Ok(Enqueued::Inserted(id))
    }

    fn claim_one(&self, game_id: &GameId, turn: u64) -> Result<Option<Transition>> {
        let mut inner = self.lock()?;
        let first = inner
            .open
            .range(
                (game_id.clone(), turn, TransitionId(0))
                    ..=(game_id.clone(), turn, TransitionId(u64::MAX)),
            )
            .next()
            .cloned();
        let Some(key) = first else {
            return Ok(None);
        };

        inner.open.remove(&key);
        inner.claimed.insert(key.clone());
        let edge = inner.edge_mut(key.2)?;
        edge.status = TransitionStatus::Claimed;
        Ok(Some(edge.clone()))
    }

    fn resolve(&self, id: TransitionId, child: &Signature) -> Result<()> {
        let mut inner = self.lock()?;
        let edge = inner.edge_mut(id)?;
        if edge.status == TransitionStatus::Closed {
            return Err(QuardsError::AlreadyResolved(id));
        }
        edge.status = TransitionStatus::Closed;
        edge.child_signature = Some(child.clone());
        let key = (edge.game_id.clone(), edge.turn, id);
        inner.open.remove(&key);
        inner.claimed.remove(&key);
        Ok(())
    }

    fn release(&self, id: TransitionId) -> Result<()> {
        let mut inner = self.lock()?;
        let edge = inner.edge_mut(id)?;
        if edge.status != TransitionStatus::Claimed {
            return Err(QuardsError::NotClaimed(id));
        }
        edge.status = TransitionStatus::Open;
        let key = (edge.game_id.clone(), edge.turn, id);
        inner.claimed.remove(&key);
        inner.open.insert(key);
        Ok(())
    }

    fn recover_claims(&self, game_id: &GameId) -> Result<usize> {
        let mut inner = self.lock()?;
        let stale: Vec<TurnKey> = inner
            .claimed
            .iter()
            .filter(|(g, _, _)| g == game_id)
            .cloned()
            .collect();
        for key in &stale {
            inner.claimed.remove(key);
            inner.open.insert(key.clone());
            inner.edge_mut(key.2)?.status = TransitionStatus::Open;
        }
        Ok(stale.len())
    }

    fn pending(&self, game_id: &GameId, turn: u64) -> Result<PendingCounts> {
        let inner = self.lock()?;
        Ok(PendingCounts {
            open: Inner::count_at(&inner.open, game_id, turn),
            claimed: Inner::count_at(&inner.claimed, game_id, turn),
        })
    }

    fn get_transition(&self, id: TransitionId) -> Result<Transition> {
        let inner = self.lock()?;
        inner
            .edges
            .get(&id)
            .cloned()
            .ok_or(QuardsError::TransitionNotFound(id))
    }

    fn transitions(&self, game_id: &GameId) -> Result<Vec<Transition>> {
        let inner = self.lock()?;
        Ok(inner
            .edges
            .values()
            .filter(|t| &t.game_id == game_id)
            .cloned()
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
