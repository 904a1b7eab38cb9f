// ═══════════════════════════════════════════════════════════════════════
// Core types — run state, dice, situations, queued effects, events
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::EffectSpec;

// ── Enums ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    TurnStart,
    Assignment,
    Roll,
    Adjustment,
    Resolution,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::TurnStart,
        Phase::Assignment,
        Phase::Roll,
        Phase::Adjustment,
        Phase::Resolution,
    ];

    /// The phase entered by the next `advance_phase` call.
    pub fn next(self) -> Phase {
        match self {
            Phase::TurnStart => Phase::Assignment,
            Phase::Assignment => Phase::Roll,
            Phase::Roll => Phase::Adjustment,
            Phase::Adjustment => Phase::Resolution,
            Phase::Resolution => Phase::TurnStart,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::TurnStart => write!(f, "TurnStart"),
            Phase::Assignment => write!(f, "Assignment"),
            Phase::Roll => write!(f, "Roll"),
            Phase::Adjustment => write!(f, "Adjustment"),
            Phase::Resolution => write!(f, "Resolution"),
        }
    }
}

/// The two guarded resources. Either one reaching zero ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKey {
    Defense,
    Stability,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 2] = [ResourceKey::Defense, ResourceKey::Stability];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKey::Defense => "defense",
            ResourceKey::Stability => "stability",
        }
    }

    pub fn parse(name: &str) -> Option<ResourceKey> {
        match name {
            "defense" => Some(ResourceKey::Defense),
            "stability" => Some(ResourceKey::Stability),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    DefenseDepleted,
    StabilityDepleted,
    BothDepleted,
}

impl GameOverReason {
    pub fn as_str(self) -> &'static str {
        match self {
            GameOverReason::DefenseDepleted => "defense_depleted",
            GameOverReason::StabilityDepleted => "stability_depleted",
            GameOverReason::BothDepleted => "defense_and_stability_depleted",
        }
    }
}

impl std::fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Fail,
}

// ── Situation ID ───────────────────────────────────────────────────────
// Monotonic per run, never reused after a situation is removed.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SituationId(pub u32);

impl std::fmt::Display for SituationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Die ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Die {
    pub index: usize,
    pub upgrade_id: Option<String>,
    pub assigned_situation: Option<SituationId>,
    /// Face as originally rolled.
    pub rolled_face: i32,
    /// Face after adjustments; this is what deals damage.
    pub current_face: i32,
    pub has_rolled: bool,
}

impl Die {
    pub fn new(index: usize, upgrade_id: Option<String>) -> Self {
        Die {
            index,
            upgrade_id,
            assigned_situation: None,
            rolled_face: 0,
            current_face: 0,
            has_rolled: false,
        }
    }

    /// Clear assignment and roll. The upgrade stays with the die.
    pub fn reset(&mut self) {
        self.assigned_situation = None;
        self.rolled_face = 0;
        self.current_face = 0;
        self.has_rolled = false;
    }

    pub fn set_roll(&mut self, face: i32) {
        self.rolled_face = face;
        self.current_face = face;
        self.has_rolled = true;
    }
}

// ── Situation (instance) ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Situation {
    pub id: SituationId,
    pub definition_id: String,
    pub demand: i32,
    pub deadline: i32,
    pub board_order: usize,
}

/// Which counter of a situation an effect touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Counter {
    Demand,
    Deadline,
}

impl Counter {
    /// Outcome when this counter drops to zero or below.
    pub fn exhausted_outcome(self) -> Outcome {
        match self {
            Counter::Demand => Outcome::Success,
            Counter::Deadline => Outcome::Fail,
        }
    }
}

// ── Resolution summary ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSummary {
    pub demand_applied: i32,
    pub successes: u32,
    pub fails: u32,
}

// ── Queued effect entry ────────────────────────────────────────────────

/// Targeting context captured when the effect is enqueued. Never re-resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEffect {
    pub effect: EffectSpec,
    pub source_situation: Option<SituationId>,
    pub selected_situation: Option<SituationId>,
    pub selected_die: Option<usize>,
}

impl QueuedEffect {
    pub fn new(effect: EffectSpec) -> Self {
        QueuedEffect {
            effect,
            source_situation: None,
            selected_situation: None,
            selected_die: None,
        }
    }

    pub fn from_source(effect: EffectSpec, source: SituationId) -> Self {
        QueuedEffect {
            source_situation: Some(source),
            ..QueuedEffect::new(effect)
        }
    }
}

// ── Engine events ──────────────────────────────────────────────────────
// Buffered by the engine and drained by whoever drives it.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    PhaseChanged { turn: u32, from: Phase, to: Phase },
    SituationSpawned { id: SituationId, definition_id: String },
    SituationResolved { id: SituationId, definition_id: String, outcome: Outcome },
    SituationRemoved { id: SituationId, definition_id: String },
    DieRolled { die: usize, face: i32 },
    DieAdjusted { die: usize, from: i32, to: i32 },
    ResourceChanged { resource: ResourceKey, before: i32, after: i32 },
    GoldChanged { before: i32, after: i32 },
    GuardRaised { resource: ResourceKey, until_turn: u32 },
    GameOver { reason: GameOverReason },
    CascadeAborted { iterations: usize },
}

// ── Run State ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub turn_number: u32,
    pub defense: i32,
    pub stability: i32,
    pub gold: i32,
    pub phase: Phase,
    /// Negative deltas to a resource are rejected while `until >= turn_number`.
    pub resource_guard_until_turn: BTreeMap<ResourceKey, u32>,
    pub dice: Vec<Die>,
    pub situations: Vec<Situation>,
    pub next_situation_id: u32,
    pub last_resolution: ResolutionSummary,
    pub is_game_over: bool,
    pub game_over_reason: Option<GameOverReason>,
}

impl RunState {
    pub fn new(defense: i32, stability: i32, gold: i32, dice: Vec<Die>) -> Self {
        RunState {
            turn_number: 0,
            defense,
            stability,
            gold,
            phase: Phase::TurnStart,
            resource_guard_until_turn: BTreeMap::new(),
            dice,
            situations: Vec::new(),
            next_situation_id: 1,
            last_resolution: ResolutionSummary::default(),
            is_game_over: false,
            game_over_reason: None,
        }
    }

    pub fn resource(&self, key: ResourceKey) -> i32 {
        match key {
            ResourceKey::Defense => self.defense,
            ResourceKey::Stability => self.stability,
        }
    }

    pub fn resource_mut(&mut self, key: ResourceKey) -> &mut i32 {
        match key {
            ResourceKey::Defense => &mut self.defense,
            ResourceKey::Stability => &mut self.stability,
        }
    }

    pub fn is_guarded(&self, key: ResourceKey) -> bool {
        self.resource_guard_until_turn
            .get(&key)
            .is_some_and(|&until| until >= self.turn_number)
    }

    pub fn situation(&self, id: SituationId) -> Option<&Situation> {
        self.situations.iter().find(|s| s.id == id)
    }

    pub fn situation_mut(&mut self, id: SituationId) -> Option<&mut Situation> {
        self.situations.iter_mut().find(|s| s.id == id)
    }

    pub fn has_situation(&self, id: SituationId) -> bool {
        self.situation(id).is_some()
    }

    /// Situation ids in board order, snapshotted for iteration that may mutate.
    pub fn situation_ids(&self) -> Vec<SituationId> {
        self.situations.iter().map(|s| s.id).collect()
    }

    pub fn die(&self, index: usize) -> Option<&Die> {
        self.dice.get(index)
    }

    pub fn die_mut(&mut self, index: usize) -> Option<&mut Die> {
        self.dice.get_mut(index)
    }

    /// Rolled dice currently assigned to `id`.
    pub fn rolled_dice_on(&self, id: SituationId) -> impl Iterator<Item = &Die> + '_ {
        self.dice
            .iter()
            .filter(move |d| d.has_rolled && d.assigned_situation == Some(id))
    }

    /// Sum of the current faces of rolled dice on `id`.
    pub fn pending_damage(&self, id: SituationId) -> i32 {
        self.rolled_dice_on(id).fold(0, |acc, d| acc.saturating_add(d.current_face))
    }

    pub fn assigned_dice_count(&self, id: SituationId) -> usize {
        self.dice
            .iter()
            .filter(|d| d.assigned_situation == Some(id))
            .count()
    }

    pub fn allocate_situation_id(&mut self) -> SituationId {
        let id = SituationId(self.next_situation_id);
        self.next_situation_id += 1;
        id
    }

    /// Renumber `board_order` densely from list position.
    pub fn renumber_board(&mut self) {
        for (i, s) in self.situations.iter_mut().enumerate() {
            s.board_order = i;
        }
    }

    /// Remove a situation, clear it from every die and renumber the board.
    pub fn remove_situation(&mut self, id: SituationId) -> Option<Situation> {
        let pos = self.situations.iter().position(|s| s.id == id)?;
        let removed = self.situations.remove(pos);
        for die in &mut self.dice {
            if die.assigned_situation == Some(id) {
                die.assigned_situation = None;
            }
        }
        self.renumber_board();
        Some(removed)
    }

    /// Depletion check over both guarded resources.
    pub fn depletion(&self) -> Option<GameOverReason> {
        match (self.defense <= 0, self.stability <= 0) {
            (true, true) => Some(GameOverReason::BothDepleted),
            (true, false) => Some(GameOverReason::DefenseDepleted),
            (false, true) => Some(GameOverReason::StabilityDepleted),
            (false, false) => None,
        }
    }
}
