// ═══════════════════════════════════════════════════════════════════════
// Effect queue processor — drains cascades, resolves targets
//
// The queue is a stack of FIFO frames. New follow-ups go to the back of
// the top frame, so siblings settle breadth-first. A demand/deadline
// effect with several targets pushes one frame per target (first target
// on top): each target's cascade drains completely before the next
// target is touched, and all of them before the effect's siblings.
// Siblings already queued are deferred on purpose rather than drained
// ahead of the targets.
// No recursion is involved, so a runaway cascade can only ever hit the
// iteration ceiling, never the stack.
// ═══════════════════════════════════════════════════════════════════════

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::catalog::{Catalog, EffectSpec, TargetMode};
use crate::config::EngineConfig;
use crate::error::CascadeError;
use crate::rng::DiceSource;
use crate::types::*;

/// One unit of work for the processor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    /// Interpret a catalog effect with its captured context.
    Apply(QueuedEffect),
    /// Apply a delta to one counter of one situation, resolving it at zero.
    Touch {
        situation: SituationId,
        counter: Counter,
        value: i32,
    },
}

#[derive(Debug)]
pub(crate) struct EffectQueue {
    frames: Vec<VecDeque<Step>>,
}

impl EffectQueue {
    pub(crate) fn new() -> Self {
        EffectQueue {
            frames: vec![VecDeque::new()],
        }
    }

    /// Seed a queue with effects sharing one targeting context.
    pub(crate) fn with_effects(
        effects: &[EffectSpec],
        source: Option<SituationId>,
        selected_situation: Option<SituationId>,
        selected_die: Option<usize>,
    ) -> Self {
        let mut queue = EffectQueue::new();
        for effect in effects {
            queue.push(Step::Apply(QueuedEffect {
                effect: effect.clone(),
                source_situation: source,
                selected_situation,
                selected_die,
            }));
        }
        queue
    }

    pub(crate) fn push(&mut self, step: Step) {
        match self.frames.last_mut() {
            Some(frame) => frame.push_back(step),
            None => self.frames.push(VecDeque::from([step])),
        }
    }

    /// Give each step its own frame, first step on top.
    pub(crate) fn push_isolated(&mut self, steps: Vec<Step>) {
        for step in steps.into_iter().rev() {
            self.frames.push(VecDeque::from([step]));
        }
    }

    /// Empty frames above the base are discarded lazily, so follow-ups
    /// pushed while a frame's last step is being applied stay in that frame.
    pub(crate) fn pop(&mut self) -> Option<Step> {
        loop {
            let depth = self.frames.len();
            let frame = self.frames.last_mut()?;
            if let Some(step) = frame.pop_front() {
                return Some(step);
            }
            if depth == 1 {
                return None;
            }
            self.frames.pop();
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.frames.iter().all(|f| f.is_empty())
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.iter().map(|f| f.len()).sum()
    }
}

/// Mutable view over one run, handed to the interpreter for a single
/// processing run. Holds no state of its own beyond the borrows.
pub(crate) struct Resolver<'a> {
    pub(crate) state: &'a mut RunState,
    pub(crate) catalog: &'a Catalog,
    pub(crate) dice: &'a mut dyn DiceSource,
    pub(crate) config: &'a EngineConfig,
    pub(crate) events: &'a mut Vec<EngineEvent>,
    /// Set while a recheck loop runs, so rerolls inside it do not nest another.
    pub(crate) in_recheck: bool,
}

impl<'a> Resolver<'a> {
    /// Drain `queue` until empty, game over, or the iteration ceiling.
    ///
    /// Returns whether any step changed state. On the ceiling, the
    /// remaining entries are dropped and everything already applied stays.
    pub(crate) fn process(&mut self, queue: &mut EffectQueue) -> Result<bool, CascadeError> {
        let limit = self.config.iteration_ceiling;
        let mut changed = false;
        let mut iterations = 0usize;

        while !self.state.is_game_over {
            let Some(step) = queue.pop() else { break };
            iterations += 1;
            if iterations > limit {
                warn!(limit, pending = queue.len() + 1, "cascade hit iteration ceiling");
                self.events.push(EngineEvent::CascadeAborted { iterations: limit });
                return Err(CascadeError::IterationCeiling { limit, changed });
            }
            changed |= self.apply_step(step, queue);
        }

        debug!(iterations, changed, "queue drained");
        Ok(changed)
    }

    fn apply_step(&mut self, step: Step, queue: &mut EffectQueue) -> bool {
        match step {
            Step::Apply(entry) => self.apply_effect(&entry, queue),
            Step::Touch { situation, counter, value } => self.touch(situation, counter, value, queue),
        }
    }

    // ── Target resolution ──────────────────────────────────────────────

    /// Situations an effect reaches, in board order. Missing ids yield nothing.
    pub(crate) fn resolve_targets(
        &mut self,
        mode: &TargetMode,
        source: Option<SituationId>,
        selected: Option<SituationId>,
    ) -> Vec<SituationId> {
        match mode {
            TargetMode::SelfSituation => source
                .filter(|&id| self.state.has_situation(id))
                .into_iter()
                .collect(),
            TargetMode::SelectedSituation => selected
                .filter(|&id| self.state.has_situation(id))
                .into_iter()
                .collect(),
            TargetMode::AllOtherSituations => self
                .state
                .situations
                .iter()
                .map(|s| s.id)
                .filter(|&id| Some(id) != source)
                .collect(),
            TargetMode::RandomOtherSituation => {
                let others: Vec<SituationId> = self
                    .state
                    .situations
                    .iter()
                    .map(|s| s.id)
                    .filter(|&id| Some(id) != source)
                    .collect();
                if others.is_empty() {
                    return Vec::new();
                }
                vec![others[self.dice.index(others.len())]]
            }
            TargetMode::ByTag(tag) => {
                let catalog = self.catalog;
                self.state
                    .situations
                    .iter()
                    .filter(|s| catalog.situation(&s.definition_id).is_some_and(|d| d.has_tag(tag)))
                    .map(|s| s.id)
                    .collect()
            }
        }
    }

    /// Queue one isolated touch per target.
    pub(crate) fn queue_counter_delta(
        &mut self,
        counter: Counter,
        value: i32,
        mode: &TargetMode,
        entry: &QueuedEffect,
        queue: &mut EffectQueue,
    ) -> bool {
        if value == 0 {
            return false;
        }
        let targets = self.resolve_targets(mode, entry.source_situation, entry.selected_situation);
        if targets.is_empty() {
            debug!(?mode, ?counter, "no targets");
            return false;
        }
        queue.push_isolated(
            targets
                .into_iter()
                .map(|situation| Step::Touch { situation, counter, value })
                .collect(),
        );
        false
    }

    // ── Situation counters and resolution ──────────────────────────────

    /// Apply `value` to one counter; resolves the situation at `<= 0`.
    pub(crate) fn touch(
        &mut self,
        id: SituationId,
        counter: Counter,
        value: i32,
        queue: &mut EffectQueue,
    ) -> bool {
        let Some(situation) = self.state.situation_mut(id) else {
            return false;
        };
        let slot = match counter {
            Counter::Demand => &mut situation.demand,
            Counter::Deadline => &mut situation.deadline,
        };
        *slot = slot.saturating_add(value);
        let remaining = *slot;
        debug!(situation = %id, ?counter, value, remaining, "counter changed");
        if remaining <= 0 {
            self.resolve_situation(id, counter.exhausted_outcome(), queue);
        }
        true
    }

    /// Remove a situation and queue its on-success or on-fail effects.
    pub(crate) fn resolve_situation(&mut self, id: SituationId, outcome: Outcome, queue: &mut EffectQueue) {
        let Some(removed) = self.state.remove_situation(id) else {
            return;
        };
        debug!(situation = %id, definition = %removed.definition_id, ?outcome, "situation resolved");

        if self.state.phase == Phase::Resolution {
            match outcome {
                Outcome::Success => self.state.last_resolution.successes += 1,
                Outcome::Fail => self.state.last_resolution.fails += 1,
            }
        }

        let catalog = self.catalog;
        match catalog.situation(&removed.definition_id) {
            Some(def) => {
                for effect in def.outcome_effects(outcome) {
                    queue.push(Step::Apply(QueuedEffect::from_source(effect.clone(), id)));
                }
            }
            None => warn!(definition = %removed.definition_id, "resolved situation has no definition"),
        }

        self.events.push(EngineEvent::SituationResolved {
            id,
            definition_id: removed.definition_id,
            outcome,
        });
    }
}
