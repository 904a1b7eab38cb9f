// ═══════════════════════════════════════════════════════════════════════
// Run View — read-only snapshot handed to agents and the CLI
//
// Agents MUST decide from a RunView, never from the raw RunState: the
// view joins each situation with its catalog definition and derives
// the per-situation dice totals agents actually reason about.
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Catalog, EffectSpec};
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunView {
    pub turn_number: u32,
    pub phase: Phase,
    pub defense: i32,
    pub stability: i32,
    pub gold: i32,
    /// Only guards still active this turn.
    pub active_guards: BTreeMap<ResourceKey, u32>,
    pub dice: Vec<Die>,
    pub situations: Vec<SituationView>,
    pub last_resolution: ResolutionSummary,
    pub game_over_reason: Option<GameOverReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationView {
    pub id: SituationId,
    pub definition_id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub demand: i32,
    pub deadline: i32,
    pub board_order: usize,
    /// Dice currently assigned here, rolled or not.
    pub assigned_dice: Vec<usize>,
    /// Sum of current faces of rolled dice assigned here.
    pub pending_damage: i32,
    /// Catalog failure penalty against a guarded resource, summed.
    pub fail_penalty: i32,
}

impl SituationView {
    /// Rolled damage already covers the demand.
    pub fn is_covered(&self) -> bool {
        self.pending_damage >= self.demand
    }
}

impl RunView {
    pub fn is_game_over(&self) -> bool {
        self.game_over_reason.is_some()
    }

    pub fn situation(&self, id: SituationId) -> Option<&SituationView> {
        self.situations.iter().find(|s| s.id == id)
    }

    pub fn free_dice(&self) -> impl Iterator<Item = &Die> + '_ {
        self.dice.iter().filter(|d| d.assigned_situation.is_none())
    }

    pub fn resource(&self, key: ResourceKey) -> i32 {
        match key {
            ResourceKey::Defense => self.defense,
            ResourceKey::Stability => self.stability,
        }
    }
}

/// Build the view of `state` against its catalog.
pub fn run_view(state: &RunState, catalog: &Catalog) -> RunView {
    let situations = state
        .situations
        .iter()
        .map(|s| {
            let def = catalog.situation(&s.definition_id);
            let fail_penalty = def
                .map(|d| {
                    d.on_fail
                        .iter()
                        .filter_map(|e| match e {
                            EffectSpec::ResourceDelta { value, .. } if *value < 0 => Some(value.saturating_neg()),
                            _ => None,
                        })
                        .fold(0, i32::saturating_add)
                })
                .unwrap_or(0);
            SituationView {
                id: s.id,
                definition_id: s.definition_id.clone(),
                name: def.map_or_else(|| s.definition_id.clone(), |d| d.name.clone()),
                tags: def.map(|d| d.tags.clone()).unwrap_or_default(),
                demand: s.demand,
                deadline: s.deadline,
                board_order: s.board_order,
                assigned_dice: state
                    .dice
                    .iter()
                    .filter(|d| d.assigned_situation == Some(s.id))
                    .map(|d| d.index)
                    .collect(),
                pending_damage: state.pending_damage(s.id),
                fail_penalty,
            }
        })
        .collect();

    let active_guards = state
        .resource_guard_until_turn
        .iter()
        .filter(|(_, &until)| until >= state.turn_number)
        .map(|(&k, &until)| (k, until))
        .collect();

    RunView {
        turn_number: state.turn_number,
        phase: state.phase,
        defense: state.defense,
        stability: state.stability,
        gold: state.gold,
        active_guards,
        dice: state.dice.clone(),
        situations,
        last_resolution: state.last_resolution,
        game_over_reason: state.game_over_reason,
    }
}
