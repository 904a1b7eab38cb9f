// ═══════════════════════════════════════════════════════════════════════
// Run setup — builds the initial RunState from a RunConfig
// ═══════════════════════════════════════════════════════════════════════

use crate::catalog::Catalog;
use crate::config::RunConfig;
use crate::error::SetupError;
use crate::types::*;

/// Check every id the run configuration names against the catalog.
pub fn validate_run_config(catalog: &Catalog, run: &RunConfig) -> Result<(), SetupError> {
    if run.dice.is_empty() {
        return Err(SetupError::NoDice);
    }
    for (die, upgrade) in run.dice.iter().enumerate() {
        if let Some(id) = upgrade {
            if catalog.dice_upgrade(id).is_none() {
                return Err(SetupError::UnknownUpgrade { die, id: id.clone() });
            }
        }
    }
    if let Some(id) = run.initial_situations.iter().find(|id| catalog.situation(id).is_none()) {
        return Err(SetupError::UnknownSituation(id.clone()));
    }
    if let Some(id) = run.advisors.iter().find(|id| catalog.advisor(id).is_none()) {
        return Err(SetupError::UnknownAdvisor(id.clone()));
    }
    Ok(())
}

/// Turn 0, no situations yet, dice unassigned. Initial situations and the
/// first turn-start are applied by the engine, since both can cascade.
pub fn create_initial_state(catalog: &Catalog, run: &RunConfig) -> Result<RunState, SetupError> {
    validate_run_config(catalog, run)?;
    let dice = run
        .dice
        .iter()
        .enumerate()
        .map(|(i, upgrade)| Die::new(i, upgrade.clone()))
        .collect();
    Ok(RunState::new(run.defense, run.stability, run.gold, dice))
}
