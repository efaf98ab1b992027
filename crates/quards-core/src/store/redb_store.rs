//! # redb-backed Storage
//!
//! A disk-backed implementation of both storage contracts using the redb
//! embedded database, providing:
//! - ACID transactions (each queue operation is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! redb serializes write transactions, which is what makes `claim_one` an
//! atomic select-and-mark and `enqueue` a race-free check-and-insert even
//! with several workers sharing one `RedbStore`.
//!
//! ## Tables
//!
//! | table           | key                        | value                 |
//! |-----------------|----------------------------|-----------------------|
//! | `states`        | (game_id, signature)       | postcard `StateRecord`|
//! | `state_turns`   | (game_id, turn, signature) | ()                    |
//! | `edges`         | id                         | postcard record       |
//! | `edge_keys`     | canonical natural key      | id                    |
//! | `open_edges`    | (game_id, turn, id)        | ()                    |
//! | `claimed_edges` | (game_id, turn, id)        | ()                    |
//! | `metadata`      | name                       | u64                   |

use super::{StateStore, TransitionQueue};
use crate::state::GameState;
use crate::transition::{
    Enqueued, NewTransition, PendingCounts, Transition, TransitionRecord, TransitionStatus,
};
use crate::{GameId, QuardsError, Result, Signature, TransitionId};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, WriteTransaction,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// States: (game_id, signature) -> serialized `StateRecord`.
const STATES: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("states");

/// Turn index over states: (game_id, turn, signature) -> ().
const STATE_TURNS: TableDefinition<(&str, u64, &str), ()> = TableDefinition::new("state_turns");

/// Transitions: id -> serialized `TransitionRecord`.
const EDGES: TableDefinition<u64, &[u8]> = TableDefinition::new("edges");

/// Natural key index: canonical (game_id, parent, name, params) -> id.
const EDGE_KEYS: TableDefinition<&str, u64> = TableDefinition::new("edge_keys");

/// Claimable transitions: (game_id, turn, id) -> ().
const OPEN_EDGES: TableDefinition<(&str, u64, u64), ()> = TableDefinition::new("open_edges");

/// In-flight transitions: (game_id, turn, id) -> ().
const CLAIMED_EDGES: TableDefinition<(&str, u64, u64), ()> =
    TableDefinition::new("claimed_edges");

/// Metadata: key string -> value u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Upper bound for signature ranges. Signatures are lowercase hex, all of
/// which sort below `~`.
const SIGNATURE_MAX: &str = "~";

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    game: String,
    state_json: String,
}

fn io(e: impl std::fmt::Display) -> QuardsError {
    QuardsError::IoError(e.to_string())
}

/// A disk-backed state store and transition queue.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            let _ = write_txn.open_table(STATES).map_err(io)?;
            let _ = write_txn.open_table(STATE_TURNS).map_err(io)?;
            let _ = write_txn.open_table(EDGES).map_err(io)?;
            let _ = write_txn.open_table(EDGE_KEYS).map_err(io)?;
            let _ = write_txn.open_table(OPEN_EDGES).map_err(io)?;
            let _ = write_txn.open_table(CLAIMED_EDGES).map_err(io)?;
            let _ = write_txn.open_table(METADATA).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        Ok(Self { db })
    }

    /// Total number of transitions across all runs.
    pub fn edge_count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let edges = read_txn.open_table(EDGES).map_err(io)?;
        Ok(edges.len().map_err(io)? as usize)
    }
}

// =============================================================================
// RECORD HELPERS
// =============================================================================

fn read_edge<T>(table: &T, id: TransitionId) -> Result<Transition>
where
    T: ReadableTable<u64, &'static [u8]>,
{
    let bytes = table
        .get(id.0)
        .map_err(io)?
        .ok_or(QuardsError::TransitionNotFound(id))?
        .value()
        .to_vec();
    let record: TransitionRecord = postcard::from_bytes(&bytes)?;
    record.into_transition(id)
}

fn write_edge(txn: &WriteTransaction, transition: &Transition) -> Result<()> {
    let record = TransitionRecord::from_transition(transition)?;
    let bytes = postcard::to_allocvec(&record)?;
    let mut edges = txn.open_table(EDGES).map_err(io)?;
    edges.insert(transition.id.0, bytes.as_slice()).map_err(io)?;
    Ok(())
}

fn count_at_turn(
    read_txn: &ReadTransaction,
    definition: TableDefinition<'static, (&'static str, u64, u64), ()>,
    game: &str,
    turn: u64,
) -> Result<usize> {
    let table = read_txn.open_table(definition).map_err(io)?;
    let mut count = 0;
    for entry in table
        .range((game, turn, 0u64)..=(game, turn, u64::MAX))
        .map_err(io)?
    {
        entry.map_err(io)?;
        count += 1;
    }
    Ok(count)
}

fn decode_state(game_id: &GameId, signature: &str, bytes: &[u8]) -> Result<GameState> {
    let record: StateRecord = postcard::from_bytes(bytes)?;
    let data = serde_json::from_str(&record.state_json)?;
    Ok(GameState::from_parts(
        game_id.clone(),
        record.game,
        Signature(signature.to_string()),
        data,
    ))
}

// =============================================================================
// STATE STORE
// =============================================================================

impl StateStore for RedbStore {
    fn put_state(&self, state: &GameState) -> Result<bool> {
        let turn = state.turn()?;
        let record = StateRecord {
            game: state.game.clone(),
            state_json: state.canonical_data()?,
        };
        let bytes = postcard::to_allocvec(&record)?;
        let game = state.game_id.as_str();
        let sig = state.signature.as_str();

        let write_txn = self.db.begin_write().map_err(io)?;
        let inserted = {
            let mut states = write_txn.open_table(STATES).map_err(io)?;
            if states.get((game, sig)).map_err(io)?.is_some() {
                false
            } else {
                states.insert((game, sig), bytes.as_slice()).map_err(io)?;
                let mut turns = write_txn.open_table(STATE_TURNS).map_err(io)?;
                turns.insert((game, turn, sig), ()).map_err(io)?;
                true
            }
        };
        if inserted {
            write_txn.commit().map_err(io)?;
        } else {
            write_txn.abort().map_err(io)?;
        }
        Ok(inserted)
    }

    fn get_state(&self, game_id: &GameId, signature: &Signature) -> Result<GameState> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let states = read_txn.open_table(STATES).map_err(io)?;
        match states
            .get((game_id.as_str(), signature.as_str()))
            .map_err(io)?
        {
            Some(data) => decode_state(game_id, signature.as_str(), data.value()),
            None => Err(QuardsError::StateNotFound {
                game_id: game_id.clone(),
                signature: signature.clone(),
            }),
        }
    }

    fn states_for_turn(&self, game_id: &GameId, turn: u64) -> Result<Vec<GameState>> {
        let game = game_id.as_str();
        let read_txn = self.db.begin_read().map_err(io)?;
        let turns = read_txn.open_table(STATE_TURNS).map_err(io)?;
        let states = read_txn.open_table(STATES).map_err(io)?;

        let mut result = Vec::new();
        for entry in turns
            .range((game, turn, "")..=(game, turn, SIGNATURE_MAX))
            .map_err(io)?
        {
            let (key, _) = entry.map_err(io)?;
            let (_, _, sig) = key.value();
            if let Some(data) = states.get((game, sig)).map_err(io)? {
                result.push(decode_state(game_id, sig, data.value())?);
            }
        }
        Ok(result)
    }

    fn state_count(&self, game_id: &GameId) -> Result<usize> {
        let game = game_id.as_str();
        let read_txn = self.db.begin_read().map_err(io)?;
        let states = read_txn.open_table(STATES).map_err(io)?;
        let mut count = 0;
        for entry in states.range((game, "")..=(game, SIGNATURE_MAX)).map_err(io)? {
            entry.map_err(io)?;
            count += 1;
        }
        Ok(count)
    }
}

// =============================================================================
// TRANSITION QUEUE
// =============================================================================

impl TransitionQueue for RedbStore {
    fn enqueue(&self, transition: &NewTransition) -> Result<Enqueued> {
        let key = transition.natural_key()?;
        let game = transition.game_id.as_str();

        let write_txn = self.db.begin_write().map_err(io)?;
        let existing = {
            let keys = write_txn.open_table(EDGE_KEYS).map_err(io)?;
            keys.get(key.as_str()).map_err(io)?.map(|v| v.value())
        };
        if let Some(id) = existing {
            write_txn.abort().map_err(io)?;
            return Ok(Enqueued::Duplicate(TransitionId(id)));
        }

        let id = {
            let mut meta = write_txn.open_table(METADATA).map_err(io)?;
            let next = meta
                .get("next_edge_id")
                .map_err(io)?
                .map(|v| v.value())
                .unwrap_or(0);
            meta.insert("next_edge_id", next.saturating_add(1))
                .map_err(io)?;
            TransitionId(next)
        };
        {
            let mut keys = write_txn.open_table(EDGE_KEYS).map_err(io)?;
            keys.insert(key.as_str(), id.0).map_err(io)?;
            let mut open = write_txn.open_table(OPEN_EDGES).map_err(io)?;
            open.insert((game, transition.turn, id.0), ()).map_err(io)?;
        }
        write_edge(&write_txn, &Transition::open(id, transition.clone()))?;
        write_txn.commit().map_err(io)?;
        Ok(Enqueued::Inserted(id))
    }

    fn claim_one(&self, game_id: &GameId, turn: u64) -> Result<Option<Transition>> {
        let game = game_id.as_str();
        let write_txn = self.db.begin_write().map_err(io)?;

        let first = {
            let open = write_txn.open_table(OPEN_EDGES).map_err(io)?;
            let mut range = open
                .range((game, turn, 0u64)..=(game, turn, u64::MAX))
                .map_err(io)?;
            let mut found = None;
            if let Some(entry) = range.next() {
                let (key, _) = entry.map_err(io)?;
                found = Some(key.value().2);
            }
            found
        };
        let Some(raw_id) = first else {
            write_txn.abort().map_err(io)?;
            return Ok(None);
        };

        let mut transition = {
            let edges = write_txn.open_table(EDGES).map_err(io)?;
            read_edge(&edges, TransitionId(raw_id))?
        };
        transition.status = TransitionStatus::Claimed;
        {
            let mut open = write_txn.open_table(OPEN_EDGES).map_err(io)?;
            open.remove((game, turn, raw_id)).map_err(io)?;
            let mut claimed = write_txn.open_table(CLAIMED_EDGES).map_err(io)?;
            claimed.insert((game, turn, raw_id), ()).map_err(io)?;
        }
        write_edge(&write_txn, &transition)?;
        write_txn.commit().map_err(io)?;
        Ok(Some(transition))
    }

    fn resolve(&self, id: TransitionId, child: &Signature) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(io)?;
        let mut transition = {
            let edges = write_txn.open_table(EDGES).map_err(io)?;
            read_edge(&edges, id)?
        };
        if transition.status == TransitionStatus::Closed {
            write_txn.abort().map_err(io)?;
            return Err(QuardsError::AlreadyResolved(id));
        }

        let key = (transition.game_id.as_str(), transition.turn, id.0);
        {
            let mut open = write_txn.open_table(OPEN_EDGES).map_err(io)?;
            open.remove(key).map_err(io)?;
            let mut claimed = write_txn.open_table(CLAIMED_EDGES).map_err(io)?;
            claimed.remove(key).map_err(io)?;
        }
        transition.status = TransitionStatus::Closed;
        transition.child_signature = Some(child.clone());
        write_edge(&write_txn, &transition)?;
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn release(&self, id: TransitionId) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(io)?;
        let mut transition = {
            let edges = write_txn.open_table(EDGES).map_err(io)?;
            read_edge(&edges, id)?
        };
        if transition.status != TransitionStatus::Claimed {
            write_txn.abort().map_err(io)?;
            return Err(QuardsError::NotClaimed(id));
        }

        let key = (transition.game_id.as_str(), transition.turn, id.0);
        {
            let mut claimed = write_txn.open_table(CLAIMED_EDGES).map_err(io)?;
            claimed.remove(key).map_err(io)?;
            let mut open = write_txn.open_table(OPEN_EDGES).map_err(io)?;
            open.insert(key, ()).map_err(io)?;
        }
        transition.status = TransitionStatus::Open;
        write_edge(&write_txn, &transition)?;
        write_txn.commit().map_err(io)?;
        Ok(())
    }

    fn recover_claims(&self, game_id: &GameId) -> Result<usize> {
        let game = game_id.as_str();
        let write_txn = self.db.begin_write().map_err(io)?;

        let stale: Vec<(u64, u64)> = {
            let claimed = write_txn.open_table(CLAIMED_EDGES).map_err(io)?;
            let mut keys = Vec::new();
            for entry in claimed
                .range((game, 0u64, 0u64)..=(game, u64::MAX, u64::MAX))
                .map_err(io)?
            {
                let (key, _) = entry.map_err(io)?;
                let (_, turn, id) = key.value();
                keys.push((turn, id));
            }
            keys
        };

        for &(turn, raw_id) in &stale {
            {
                let mut claimed = write_txn.open_table(CLAIMED_EDGES).map_err(io)?;
                claimed.remove((game, turn, raw_id)).map_err(io)?;
                let mut open = write_txn.open_table(OPEN_EDGES).map_err(io)?;
                open.insert((game, turn, raw_id), ()).map_err(io)?;
            }
            let mut transition = {
                let edges = write_txn.open_table(EDGES).map_err(io)?;
                read_edge(&edges, TransitionId(raw_id))?
            };
            transition.status = TransitionStatus::Open;
            write_edge(&write_txn, &transition)?;
        }
        write_txn.commit().map_err(io)?;
        Ok(stale.len())
    }

    fn pending(&self, game_id: &GameId, turn: u64) -> Result<PendingCounts> {
        let read_txn = self.db.begin_read().map_err(io)?;
        Ok(PendingCounts {
            open: count_at_turn(&read_txn, OPEN_EDGES, game_id.as_str(), turn)?,
            claimed: count_at_turn(&read_txn, CLAIMED_EDGES, game_id.as_str(), turn)?,
        })
    }

    fn get_transition(&self, id: TransitionId) -> Result<Transition> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let edges = read_txn.open_table(EDGES).map_err(io)?;
        read_edge(&edges, id)
    }

    fn transitions(&self, game_id: &GameId) -> Result<Vec<Transition>> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let edges = read_txn.open_table(EDGES).map_err(io)?;

        let mut result = Vec::new();
        for entry in edges.iter().map_err(io)? {
            let (key, value) = entry.map_err(io)?;
            let record: TransitionRecord = postcard::from_bytes(value.value())?;
            if record.game_id == game_id.as_str() {
                result.push(record.into_transition(TransitionId(key.value()))?);
            }
        }
        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
