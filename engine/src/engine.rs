// ═══════════════════════════════════════════════════════════════════════
// Turn Engine — phase state machine and public entry points
//
// Architecture:
//   The engine owns the RunState, a shared read-only Catalog and the
//   injected dice source. It never does I/O and never calls back into
//   its driver. Anything worth reporting is buffered as an EngineEvent
//   and drained by the caller.
//
// Flow:
//   TurnStart → Assignment → Roll → Adjustment → Resolution → TurnStart
//   1. Driver calls `advance_phase()`; the engine runs the entry action
//      of the phase it lands on (upkeep, rolls, resolution)
//   2. In Assignment the driver calls `assign_die()`
//   3. In any phase the driver may call `apply_direct_effects()` for
//      advisor / decree use
//   4. Game over freezes everything: every entry point returns false
// ═══════════════════════════════════════════════════════════════════════

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, EffectSpec};
use crate::config::{EngineConfig, RunConfig};
use crate::error::{CascadeError, SetupError};
use crate::queue::{EffectQueue, Resolver, Step};
use crate::rng::DiceSource;
use crate::setup;
use crate::spawn::spawn_check_due;
use crate::types::*;

pub struct TurnEngine<D: DiceSource> {
    state: RunState,
    catalog: Arc<Catalog>,
    dice: D,
    config: EngineConfig,
    events: Vec<EngineEvent>,
    last_cascade_error: Option<CascadeError>,
}

impl<D: DiceSource> TurnEngine<D> {
    /// Start a new run: place the initial situations, then enter turn 1.
    pub fn new(catalog: Arc<Catalog>, run: &RunConfig, dice: D) -> Result<Self, SetupError> {
        let state = setup::create_initial_state(&catalog, run)?;
        let mut engine = TurnEngine {
            state,
            catalog,
            dice,
            config: run.engine.clone(),
            events: Vec::new(),
            last_cascade_error: None,
        };

        let mut queue = EffectQueue::new();
        for definition in &run.initial_situations {
            engine.resolver().spawn_situation(definition, &mut queue);
        }
        engine.drain(queue);

        if !engine.state.is_game_over {
            engine.enter_phase(Phase::TurnStart);
        }
        Ok(engine)
    }

    /// Resume from a saved state. No entry action is re-run.
    pub fn from_state(state: RunState, catalog: Arc<Catalog>, config: EngineConfig, dice: D) -> Self {
        TurnEngine {
            state,
            catalog,
            dice,
            config,
            events: Vec::new(),
            last_cascade_error: None,
        }
    }

    fn resolver(&mut self) -> Resolver<'_> {
        Resolver {
            state: &mut self.state,
            catalog: &self.catalog,
            dice: &mut self.dice,
            config: &self.config,
            events: &mut self.events,
            in_recheck: false,
        }
    }

    /// Run the processor over `queue`; a runaway cascade is logged and kept.
    fn drain(&mut self, mut queue: EffectQueue) -> bool {
        if queue.is_empty() {
            return false;
        }
        let result = self.resolver().process(&mut queue);
        match result {
            Ok(changed) => changed,
            Err(err) => {
                warn!(turn = self.state.turn_number, phase = %self.state.phase, "{err}");
                let changed = err.changed_state();
                self.last_cascade_error = Some(err);
                changed
            }
        }
    }

    // ── Commands ───────────────────────────────────────────────────────

    /// Move to the next phase and run its entry action.
    pub fn advance_phase(&mut self) -> bool {
        if self.state.is_game_over {
            return false;
        }
        let next = self.state.phase.next();
        self.enter_phase(next);
        true
    }

    /// Assign (or with `None`, unassign) a die. Assignment phase only.
    pub fn assign_die(&mut self, die_index: usize, situation: Option<SituationId>) -> bool {
        if self.state.is_game_over || self.state.phase != Phase::Assignment {
            return false;
        }
        if let Some(id) = situation {
            if !self.state.has_situation(id) {
                return false;
            }
        }
        let Some(die) = self.state.die_mut(die_index) else {
            return false;
        };
        die.assigned_situation = situation;
        debug!(die = die_index, ?situation, "die assigned");
        true
    }

    /// Advisor / decree entry point. Returns whether anything changed.
    pub fn apply_direct_effects(
        &mut self,
        effects: &[EffectSpec],
        source: Option<SituationId>,
        selected_situation: Option<SituationId>,
        selected_die: Option<usize>,
    ) -> bool {
        if self.state.is_game_over || effects.is_empty() {
            return false;
        }
        let queue = EffectQueue::with_effects(effects, source, selected_situation, selected_die);
        self.drain(queue)
    }

    // ── Phase entry actions ────────────────────────────────────────────

    fn enter_phase(&mut self, phase: Phase) {
        let from = self.state.phase;
        self.state.phase = phase;
        if phase == Phase::TurnStart {
            self.state.turn_number += 1;
            for die in &mut self.state.dice {
                die.reset();
            }
        }
        info!(turn = self.state.turn_number, %from, to = %phase, "phase changed");
        self.events.push(EngineEvent::PhaseChanged {
            turn: self.state.turn_number,
            from,
            to: phase,
        });

        match phase {
            Phase::TurnStart => self.run_turn_start(),
            Phase::Roll => self.run_roll(),
            Phase::Resolution => self.run_resolution(),
            Phase::Assignment | Phase::Adjustment => {}
        }
    }

    fn run_turn_start(&mut self) {
        let catalog = Arc::clone(&self.catalog);
        for id in self.state.situation_ids() {
            if self.state.is_game_over {
                return;
            }
            let Some(situation) = self.state.situation(id) else { continue };
            let Some(def) = catalog.situation(&situation.definition_id) else { continue };
            if def.on_turn_start.is_empty() {
                continue;
            }
            self.drain(EffectQueue::with_effects(&def.on_turn_start, Some(id), None, None));
        }

        if self.state.is_game_over || !spawn_check_due(self.state.turn_number, self.config.spawn_period) {
            return;
        }
        let mut queue = EffectQueue::new();
        let spawned = self.resolver().periodic_spawn(&mut queue);
        debug!(turn = self.state.turn_number, count = spawned.len(), "periodic spawn");
        self.drain(queue);
    }

    fn run_roll(&mut self) {
        for index in 0..self.state.dice.len() {
            if self.state.is_game_over {
                return;
            }
            if self.state.dice[index].assigned_situation.is_none() {
                continue;
            }
            let mut queue = EffectQueue::new();
            let mut resolver = self.resolver();
            resolver.roll_die(index);
            resolver.apply_roll_once_upgrade(index, &mut queue);
            resolver.recheck_upgrade(index, &mut queue);
            self.drain(queue);
        }
    }

    fn run_resolution(&mut self) {
        self.state.last_resolution = ResolutionSummary::default();

        for id in self.state.situation_ids() {
            if self.state.is_game_over {
                return;
            }
            if !self.state.has_situation(id) {
                continue;
            }
            let damage = self.state.pending_damage(id);
            if damage <= 0 {
                continue;
            }
            self.state.last_resolution.demand_applied = self.state.last_resolution.demand_applied.saturating_add(damage);
            let mut queue = EffectQueue::new();
            queue.push(Step::Touch {
                situation: id,
                counter: Counter::Demand,
                value: -damage,
            });
            self.drain(queue);
        }

        for id in self.state.situation_ids() {
            if self.state.is_game_over {
                return;
            }
            if !self.state.has_situation(id) {
                continue;
            }
            let mut queue = EffectQueue::new();
            queue.push(Step::Touch {
                situation: id,
                counter: Counter::Deadline,
                value: -1,
            });
            self.drain(queue);
        }

        let summary = self.state.last_resolution;
        info!(
            turn = self.state.turn_number,
            demand = summary.demand_applied,
            successes = summary.successes,
            fails = summary.fails,
            "resolution done"
        );
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_state(self) -> RunState {
        self.state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn turn_number(&self) -> u32 {
        self.state.turn_number
    }

    pub fn resource(&self, key: ResourceKey) -> i32 {
        self.state.resource(key)
    }

    pub fn gold(&self) -> i32 {
        self.state.gold
    }

    pub fn dice(&self) -> &[Die] {
        &self.state.dice
    }

    pub fn situations(&self) -> &[Situation] {
        &self.state.situations
    }

    pub fn last_resolution(&self) -> ResolutionSummary {
        self.state.last_resolution
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.state.game_over_reason
    }

    /// The most recent cascade cut off by the iteration ceiling, if any.
    pub fn last_cascade_error(&self) -> Option<&CascadeError> {
        self.last_cascade_error.as_ref()
    }

    /// Take every event buffered since the last call.
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}
