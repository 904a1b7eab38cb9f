// ═══════════════════════════════════════════════════════════════════════
// Dice upgrades — condition checks and the recheck loop
// ═══════════════════════════════════════════════════════════════════════

use tracing::debug;

use crate::catalog::{ConditionSpec, DiceUpgradeDef, UpgradeTrigger};
use crate::queue::{EffectQueue, Resolver};
use crate::types::*;

impl<'a> Resolver<'a> {
    pub(crate) fn condition_holds(&self, condition: ConditionSpec, die_index: usize) -> bool {
        let Some(die) = self.state.die(die_index) else {
            return false;
        };
        let assigned = die.assigned_situation.and_then(|id| self.state.situation(id));
        match condition {
            ConditionSpec::Always => true,
            ConditionSpec::FaceAtLeast(v) => die.current_face >= v,
            ConditionSpec::FaceAtMost(v) => die.current_face <= v,
            ConditionSpec::FaceEquals(v) => die.current_face == v,
            ConditionSpec::FaceOdd => die.current_face % 2 == 1,
            ConditionSpec::FaceEven => die.current_face % 2 == 0,
            ConditionSpec::RolledFaceAtMost(v) => die.rolled_face <= v,
            ConditionSpec::AssignedDeadlineAtMost(v) => assigned.is_some_and(|s| s.deadline <= v),
            ConditionSpec::AssignedBoardOrderIs(v) => assigned.is_some_and(|s| s.board_order as i32 == v),
            ConditionSpec::AssignedDiceCountAtLeast(v) => {
                assigned.is_some_and(|s| self.state.assigned_dice_count(s.id) as i32 >= v)
            }
            ConditionSpec::DefenseAtMost(v) => self.state.defense <= v,
            ConditionSpec::StabilityAtMost(v) => self.state.stability <= v,
            ConditionSpec::GoldAtLeast(v) => self.state.gold >= v,
        }
    }

    /// Only the first listed condition is consulted; an empty list always holds.
    fn upgrade_applies(&self, upgrade: &DiceUpgradeDef, die_index: usize) -> bool {
        match upgrade.conditions.first() {
            Some(&condition) => self.condition_holds(condition, die_index),
            None => true,
        }
    }

    fn upgrade_for(&self, die_index: usize, trigger: UpgradeTrigger) -> Option<&'a DiceUpgradeDef> {
        let catalog = self.catalog;
        let id = self.state.die(die_index)?.upgrade_id.as_deref()?;
        catalog.dice_upgrade(id).filter(|u| u.trigger == trigger)
    }

    fn face_of(&self, die_index: usize) -> Option<i32> {
        self.state.die(die_index).map(|d| d.current_face)
    }

    /// Apply every upgrade effect to the die. Returns whether any single
    /// effect moved its face, even if a later one moved it back.
    fn apply_upgrade_effects(&mut self, upgrade: &DiceUpgradeDef, die_index: usize, queue: &mut EffectQueue) -> bool {
        let Some(assigned) = self.state.die(die_index).map(|d| d.assigned_situation) else {
            return false;
        };
        let mut moved = false;
        for effect in &upgrade.effects {
            let before = self.face_of(die_index);
            let entry = QueuedEffect {
                effect: effect.clone(),
                source_situation: assigned,
                selected_situation: assigned,
                selected_die: Some(die_index),
            };
            self.apply_effect(&entry, queue);
            moved |= self.face_of(die_index) != before;
        }
        moved
    }

    /// Roll-once upgrades fire a single time after the initial roll.
    pub(crate) fn apply_roll_once_upgrade(&mut self, die_index: usize, queue: &mut EffectQueue) -> bool {
        let Some(upgrade) = self.upgrade_for(die_index, UpgradeTrigger::RollOnce) else {
            return false;
        };
        if !self.upgrade_applies(upgrade, die_index) {
            return false;
        }
        debug!(die = die_index, upgrade = %upgrade.id, "roll-once upgrade");
        self.apply_upgrade_effects(upgrade, die_index, queue)
    }

    /// Re-evaluate a recheck upgrade until the face stops moving, the
    /// condition fails, or `recheck_limit` passes have run.
    pub(crate) fn recheck_upgrade(&mut self, die_index: usize, queue: &mut EffectQueue) -> bool {
        let Some(upgrade) = self.upgrade_for(die_index, UpgradeTrigger::Recheck) else {
            return false;
        };
        let was_in_recheck = self.in_recheck;
        self.in_recheck = true;

        let mut moved = false;
        let mut passes = 0;
        while passes < self.config.recheck_limit && !self.state.is_game_over {
            if !self.upgrade_applies(upgrade, die_index) {
                break;
            }
            passes += 1;
            if !self.apply_upgrade_effects(upgrade, die_index, queue) {
                break;
            }
            moved = true;
        }

        self.in_recheck = was_in_recheck;
        debug!(die = die_index, upgrade = %upgrade.id, passes, moved, "recheck settled");
        moved
    }
}
