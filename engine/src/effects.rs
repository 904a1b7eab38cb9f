// ═══════════════════════════════════════════════════════════════════════
// Effect interpreter — one handler per effect kind
//
// Every handler returns whether it changed state. Invalid input (zero
// value, missing selection, guarded resource, unrolled die) is a plain
// `false` with nothing mutated. Follow-up work goes onto the queue
// handed in by the processor.
// ═══════════════════════════════════════════════════════════════════════

use tracing::{debug, info};

use crate::catalog::{DieTarget, EffectSpec, FaceOp, TargetMode};
use crate::queue::{EffectQueue, Resolver};
use crate::types::*;

impl<'a> Resolver<'a> {
    pub(crate) fn apply_effect(&mut self, entry: &QueuedEffect, queue: &mut EffectQueue) -> bool {
        if self.state.is_game_over {
            return false;
        }
        match &entry.effect {
            EffectSpec::ResourceDelta { resource, value } => self.resource_delta(*resource, *value),
            EffectSpec::GoldDelta { value } => self.gold_delta(*value),
            EffectSpec::ResourceGuard { resource, duration } => self.resource_guard(*resource, *duration),
            EffectSpec::DemandDelta { value, target } => {
                self.queue_counter_delta(Counter::Demand, *value, target, entry, queue)
            }
            EffectSpec::DeadlineDelta { value, target } => {
                self.queue_counter_delta(Counter::Deadline, *value, target, entry, queue)
            }
            EffectSpec::DieFace { op, target } => self.die_face(*op, *target, entry),
            EffectSpec::RerollAssignedDice => self.reroll_assigned(entry, queue),
            EffectSpec::SpawnSituation { definition } => self.spawn_situation(definition, queue).is_some(),
            EffectSpec::RemoveSituation { target } => self.remove_targets(target, entry),
        }
    }

    // ── Resources ──────────────────────────────────────────────────────

    pub(crate) fn resource_delta(&mut self, resource: ResourceKey, value: i32) -> bool {
        if value == 0 {
            return false;
        }
        if value < 0 && self.state.is_guarded(resource) {
            debug!(%resource, value, "delta blocked by guard");
            return false;
        }
        let before = self.state.resource(resource);
        let after = before.saturating_add(value);
        *self.state.resource_mut(resource) = after;
        debug!(%resource, before, after, "resource changed");
        self.events.push(EngineEvent::ResourceChanged { resource, before, after });
        self.check_game_over();
        true
    }

    pub(crate) fn gold_delta(&mut self, value: i32) -> bool {
        if value == 0 {
            return false;
        }
        let before = self.state.gold;
        self.state.gold = before.saturating_add(value);
        self.events.push(EngineEvent::GoldChanged { before, after: self.state.gold });
        true
    }

    pub(crate) fn resource_guard(&mut self, resource: ResourceKey, duration: i32) -> bool {
        if duration <= 0 {
            return false;
        }
        let until = self.state.turn_number.saturating_add(duration as u32 - 1);
        let existing = self.state.resource_guard_until_turn.get(&resource).copied();
        if existing.is_some_and(|e| e >= until) {
            return false;
        }
        self.state.resource_guard_until_turn.insert(resource, until);
        debug!(%resource, until, "guard raised");
        self.events.push(EngineEvent::GuardRaised { resource, until_turn: until });
        true
    }

    fn check_game_over(&mut self) {
        if self.state.is_game_over {
            return;
        }
        if let Some(reason) = self.state.depletion() {
            info!(turn = self.state.turn_number, %reason, "game over");
            self.state.is_game_over = true;
            self.state.game_over_reason = Some(reason);
            self.events.push(EngineEvent::GameOver { reason });
        }
    }

    // ── Dice ───────────────────────────────────────────────────────────

    /// Indices of rolled dice an effect reaches.
    fn die_targets(&self, target: DieTarget, entry: &QueuedEffect) -> Vec<usize> {
        match target {
            DieTarget::SelectedDie => entry
                .selected_die
                .filter(|&i| self.state.die(i).is_some_and(|d| d.has_rolled))
                .into_iter()
                .collect(),
            DieTarget::AssignedInSelectedSituation => match entry.selected_situation {
                Some(id) => self.state.rolled_dice_on(id).map(|d| d.index).collect(),
                None => Vec::new(),
            },
        }
    }

    pub(crate) fn die_face(&mut self, op: FaceOp, target: DieTarget, entry: &QueuedEffect) -> bool {
        let mut changed = false;
        for index in self.die_targets(target, entry) {
            let Some(die) = self.state.die_mut(index) else { continue };
            let from = die.current_face;
            let to = op.apply(from);
            if to == from {
                continue;
            }
            die.current_face = to;
            debug!(die = index, from, to, ?op, "die adjusted");
            self.events.push(EngineEvent::DieAdjusted { die: index, from, to });
            changed = true;
        }
        changed
    }

    /// Draw a fresh face for one die.
    pub(crate) fn roll_die(&mut self, index: usize) -> Option<i32> {
        let sides = self.config.die_sides;
        let face = self.dice.range(1, sides + 1);
        let die = self.state.die_mut(index)?;
        die.set_roll(face);
        debug!(die = index, face, "die rolled");
        self.events.push(EngineEvent::DieRolled { die: index, face });
        Some(face)
    }

    pub(crate) fn reroll_assigned(&mut self, entry: &QueuedEffect, queue: &mut EffectQueue) -> bool {
        let Some(selected) = entry.selected_situation else {
            return false;
        };
        let targets: Vec<usize> = self.state.rolled_dice_on(selected).map(|d| d.index).collect();
        if targets.is_empty() {
            return false;
        }
        for &index in &targets {
            self.roll_die(index);
        }
        if !self.in_recheck {
            for &index in &targets {
                self.recheck_upgrade(index, queue);
            }
        }
        true
    }

    // ── Board ──────────────────────────────────────────────────────────

    /// Remove targets outright; no success or fail effects fire.
    pub(crate) fn remove_targets(&mut self, mode: &TargetMode, entry: &QueuedEffect) -> bool {
        let targets = self.resolve_targets(mode, entry.source_situation, entry.selected_situation);
        let mut changed = false;
        for id in targets {
            if let Some(removed) = self.state.remove_situation(id) {
                debug!(situation = %id, definition = %removed.definition_id, "situation removed");
                self.events.push(EngineEvent::SituationRemoved {
                    id,
                    definition_id: removed.definition_id,
                });
                changed = true;
            }
        }
        changed
    }
}
