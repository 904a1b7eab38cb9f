// ═══════════════════════════════════════════════════════════════════════
// Configuration — engine limits and starting conditions for a run
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Tunables of the resolution engine itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on queue pops per processing run.
    pub iteration_ceiling: usize,
    /// Max passes of a recheck upgrade on one die.
    pub recheck_limit: usize,
    pub die_sides: i32,
    /// Spawn check fires when `(turn - 1) % spawn_period == 0`.
    pub spawn_period: u32,
    /// Total risk cost one spawn check may add.
    pub risk_budget: i32,
    /// Draw cap per spawn check, so zero-cost definitions cannot loop forever.
    pub max_spawns_per_check: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            iteration_ceiling: 10_000,
            recheck_limit: 24,
            die_sides: 6,
            spawn_period: 3,
            risk_budget: 6,
            max_spawns_per_check: 16,
        }
    }
}

/// Starting conditions for a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub defense: i32,
    pub stability: i32,
    pub gold: i32,
    /// One entry per die: its upgrade id, if any.
    pub dice: Vec<Option<String>>,
    /// Definitions placed on the board before the first spawn check.
    pub initial_situations: Vec<String>,
    /// Advisors the orchestrating layer may call on.
    pub advisors: Vec<String>,
    pub engine: EngineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            defense: 10,
            stability: 10,
            gold: 3,
            dice: vec![
                None,
                None,
                None,
                Some("loaded".to_string()),
                Some("steady_hand".to_string()),
            ],
            initial_situations: Vec::new(),
            advisors: vec![
                "marshal".to_string(),
                "chancellor".to_string(),
                "spymaster".to_string(),
            ],
            engine: EngineConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json(json: &str) -> Result<RunConfig, SetupError> {
        Ok(serde_json::from_str(json)?)
    }
}
