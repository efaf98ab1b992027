//! Lorcana turn structure and action legality.
//!
//! Supported actions:
//! - `start`: begin turn 1 for player one (no draw on the first turn)
//! - `ink {player, card_id}`: put an inkable card from hand into the inkwell,
//!   once per turn
//! - `play {player, card_id, ink}`: pay `ink` (the card's cost) to play a card
//! - `quest {player, slot}`: exert a ready character to gain its lore
//! - `pass`: end the turn; the opponent readies and draws one card, losing
//!   if their deck is empty
//!
//! Reaching [`LORE_TO_WIN`] lore ends the game immediately.

use super::cards::{CardId, CardIndex, CardType};
use super::state::{FieldCard, LORE_TO_WIN, LorcanaState, Player};
use crate::transition::{Action, START_ACTION};
use crate::{QuardsError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// End the current turn.
pub const PASS: &str = "pass";
/// Put a card into the inkwell.
pub const INK: &str = "ink";
/// Play a card from hand.
pub const PLAY: &str = "play";
/// Quest with a character on the field.
pub const QUEST: &str = "quest";

// =============================================================================
// PARAMETERS
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct CardParams {
    player: Player,
    card_id: CardId,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlayParams {
    player: Player,
    card_id: CardId,
    ink: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestParams {
    player: Player,
    slot: usize,
}

fn params<T: DeserializeOwned>(action: &Action) -> Result<T> {
    serde_json::from_value(action.params.clone())
        .map_err(|e| QuardsError::illegal(&action.name, format!("bad parameters: {e}")))
}

fn action_with<T: Serialize>(name: &str, params: &T) -> Result<Action> {
    Ok(Action::with_params(name, serde_json::to_value(params)?))
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Apply `action` to a copy of `state`.
pub fn apply(state: &LorcanaState, action: &Action, cards: &CardIndex) -> Result<LorcanaState> {
    if state.complete {
        return Err(QuardsError::illegal(&action.name, "the game is over"));
    }
    let mut next = state.clone();
    match action.name.as_str() {
        START_ACTION => start(&mut next)?,
        PASS => pass(&mut next)?,
        INK => ink(&mut next, &params(action)?, cards)?,
        PLAY => play(&mut next, &params(action)?, cards)?,
        QUEST => quest(&mut next, &params(action)?, cards)?,
        other => return Err(QuardsError::illegal(other, "unknown action")),
    }
    Ok(next)
}

fn start(state: &mut LorcanaState) -> Result<()> {
    if state.turn != 0 {
        return Err(QuardsError::illegal(START_ACTION, "the game already started"));
    }
    state.turn = 1;
    state.begin_turn();
    Ok(())
}

fn pass(state: &mut LorcanaState) -> Result<()> {
    if state.turn == 0 {
        return Err(QuardsError::illegal(PASS, "the game has not started"));
    }
    state.turn += 1;
    state.current_player = state.current_player.other();
    state.begin_turn();
    if state.current_mut().draw(1) == 0 {
        let winner = state.current_player.other();
        state.finish(winner);
    }
    Ok(())
}

fn ink(state: &mut LorcanaState, params: &CardParams, cards: &CardIndex) -> Result<()> {
    ensure_turn_of(state, params.player, INK)?;
    if state.ink_drops == 0 {
        return Err(QuardsError::illegal(INK, "already inked this turn"));
    }
    let card = cards.require(&params.card_id)?;
    if !card.inkable {
        return Err(QuardsError::illegal(
            INK,
            format!("{} is not inkable", card.id.0),
        ));
    }
    let taken = take(state, &params.card_id, INK)?;
    state.current_mut().inkwell.push_back(taken);
    state.ink_drops -= 1;
    state.ink_available += 1;
    Ok(())
}

fn play(state: &mut LorcanaState, params: &PlayParams, cards: &CardIndex) -> Result<()> {
    ensure_turn_of(state, params.player, PLAY)?;
    let card = cards.require(&params.card_id)?;
    if params.ink != card.cost {
        return Err(QuardsError::illegal(
            PLAY,
            format!("{} costs {}, offered {}", card.id.0, card.cost, params.ink),
        ));
    }
    if card.cost > state.ink_available {
        return Err(QuardsError::illegal(
            PLAY,
            format!("{} costs {}, only {} ink left", card.id.0, card.cost, state.ink_available),
        ));
    }
    let taken = take(state, &params.card_id, PLAY)?;
    state.ink_available -= card.cost;
    let zones = state.current_mut();
    match card.card_type {
        CardType::Character | CardType::Item => zones.field.push_back(FieldCard {
            id: taken,
            ready: false,
            exerted: false,
        }),
        CardType::Action => zones.discard.push_back(taken),
    }
    Ok(())
}

fn quest(state: &mut LorcanaState, params: &QuestParams, cards: &CardIndex) -> Result<()> {
    ensure_turn_of(state, params.player, QUEST)?;
    let zones = state.current_mut();
    let Some(field_card) = zones.field.get_mut(params.slot) else {
        return Err(QuardsError::illegal(
            QUEST,
            format!("no card in slot {}", params.slot),
        ));
    };
    if !field_card.ready || field_card.exerted {
        return Err(QuardsError::illegal(
            QUEST,
            format!("{} cannot quest this turn", field_card.id.0),
        ));
    }
    let card = cards.require(&field_card.id)?;
    if card.card_type != CardType::Character {
        return Err(QuardsError::illegal(
            QUEST,
            format!("{} is not a character", card.id.0),
        ));
    }
    field_card.exerted = true;
    zones.lore = zones.lore.saturating_add(card.lore);
    if zones.lore >= LORE_TO_WIN {
        state.finish(params.player);
    }
    Ok(())
}

fn ensure_turn_of(state: &LorcanaState, player: Player, action: &str) -> Result<()> {
    if state.turn == 0 {
        return Err(QuardsError::illegal(action, "the game has not started"));
    }
    if player != state.current_player {
        return Err(QuardsError::illegal(
            action,
            format!("it is not {}'s turn", player.as_str()),
        ));
    }
    Ok(())
}

fn take(state: &mut LorcanaState, card: &CardId, action: &str) -> Result<CardId> {
    state
        .current_mut()
        .take_from_hand(card)
        .ok_or_else(|| QuardsError::illegal(action, format!("{} is not in hand", card.0)))
}

// =============================================================================
// LEGAL ACTIONS
// =============================================================================

/// Every action legal in `state`, in a stable order.
///
/// `pass` first, then `ink` and `play` per distinct card in hand (hand
/// order), then `quest` per eligible field slot. Empty once the game is over.
pub fn legal_actions(state: &LorcanaState, cards: &CardIndex) -> Result<Vec<Action>> {
    if state.complete {
        return Ok(Vec::new());
    }
    if state.turn == 0 {
        return Ok(vec![Action::new(START_ACTION)]);
    }

    let player = state.current_player;
    let zones = state.current();
    let mut actions = vec![Action::new(PASS)];

    let mut seen = BTreeSet::new();
    for card_id in zones.hand.iter() {
        if !seen.insert(card_id) {
            continue;
        }
        let card = cards.require(card_id)?;
        if state.ink_drops > 0 && card.inkable {
            actions.push(action_with(
                INK,
                &CardParams {
                    player,
                    card_id: card_id.clone(),
                },
            )?);
        }
        if card.cost <= state.ink_available {
            actions.push(action_with(
                PLAY,
                &PlayParams {
                    player,
                    card_id: card_id.clone(),
                    ink: card.cost,
                },
            )?);
        }
    }

    for (slot, field_card) in zones.field.iter().enumerate() {
        if !field_card.ready || field_card.exerted {
            continue;
        }
        let card = cards.require(&field_card.id)?;
        if card.card_type == CardType::Character {
            actions.push(action_with(QUEST, &QuestParams { player, slot })?);
        }
    }

    Ok(actions)
}
