// ═══════════════════════════════════════════════════════════════════════
// Spawning — new situation instances and the periodic risk draw
// ═══════════════════════════════════════════════════════════════════════

use tracing::{debug, warn};

use crate::queue::{EffectQueue, Resolver};
use crate::types::*;

/// Whether a spawn check fires on `turn`. A period of 0 disables spawning.
pub fn spawn_check_due(turn: u32, period: u32) -> bool {
    period > 0 && turn > 0 && (turn - 1) % period == 0
}

impl<'a> Resolver<'a> {
    /// Put a fresh instance of `definition_id` at the end of the board.
    ///
    /// An instance born with no demand or no deadline left resolves on the
    /// spot, its follow-ups going onto `queue`.
    pub(crate) fn spawn_situation(&mut self, definition_id: &str, queue: &mut EffectQueue) -> Option<SituationId> {
        let catalog = self.catalog;
        let Some(def) = catalog.situation(definition_id) else {
            warn!(definition = definition_id, "spawn of unknown situation definition");
            return None;
        };

        let id = self.state.allocate_situation_id();
        self.state.situations.push(Situation {
            id,
            definition_id: def.id.clone(),
            demand: def.base_demand,
            deadline: def.base_deadline,
            board_order: 0,
        });
        self.state.renumber_board();
        debug!(situation = %id, definition = %def.id, demand = def.base_demand, deadline = def.base_deadline, "situation spawned");
        self.events.push(EngineEvent::SituationSpawned {
            id,
            definition_id: def.id.clone(),
        });

        if def.base_demand <= 0 {
            self.resolve_situation(id, Outcome::Success, queue);
        } else if def.base_deadline <= 0 {
            self.resolve_situation(id, Outcome::Fail, queue);
        }
        Some(id)
    }

    /// Greedy random fill of the turn's risk budget.
    ///
    /// Definitions are drawn with replacement; the first draw that would
    /// overrun the budget is discarded and ends the check, even when a
    /// cheaper definition could still fit.
    pub(crate) fn periodic_spawn(&mut self, queue: &mut EffectQueue) -> Vec<SituationId> {
        let catalog = self.catalog;
        let candidates = catalog.spawnable_situations();
        let mut spawned = Vec::new();
        if candidates.is_empty() {
            return spawned;
        }

        let budget = self.config.risk_budget;
        let mut spent: i32 = 0;
        for _ in 0..self.config.max_spawns_per_check {
            let pick = candidates[self.dice.index(candidates.len())];
            if spent.saturating_add(pick.risk_cost) > budget {
                debug!(definition = %pick.id, spent, budget, "spawn draw over budget");
                break;
            }
            spent = spent.saturating_add(pick.risk_cost);
            if let Some(id) = self.spawn_situation(&pick.id, queue) {
                spawned.push(id);
            }
        }
        spawned
    }
}
