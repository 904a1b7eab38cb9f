// ═══════════════════════════════════════════════════════════════════════
// Campaign Runner — runs a complete headless council run with one agent
// ═══════════════════════════════════════════════════════════════════════

use council_agents::{Agent, Intervention, Offer, OfferKind};
use council_engine::catalog::{Catalog, EffectSpec};
use council_engine::config::RunConfig;
use council_engine::error::SetupError;
use council_engine::rng::SeededDice;
use council_engine::types::*;
use council_engine::visibility::run_view;
use council_engine::TurnEngine;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a finished (or turn-capped) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignResult {
    pub seed: u64,
    pub agent_name: String,
    /// Turns fully resolved before the run ended or hit the cap.
    pub turns_survived: u32,
    pub game_over_reason: Option<GameOverReason>,
    pub final_defense: i32,
    pub final_stability: i32,
    pub final_gold: i32,
    pub successes: u32,
    pub fails: u32,
    pub interventions_used: u32,
    pub cascade_aborts: u32,
    pub final_state: RunState,
}

/// Aggregate of many runs by the same agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub runs: u32,
    pub game_overs: u32,
    pub avg_turns: f64,
    pub best_turns: u32,
    pub worst_turns: u32,
}

impl BatchSummary {
    pub fn from_results(results: &[CampaignResult]) -> Self {
        if results.is_empty() {
            return BatchSummary::default();
        }
        let total: u64 = results.iter().map(|r| r.turns_survived as u64).sum();
        BatchSummary {
            runs: results.len() as u32,
            game_overs: results.iter().filter(|r| r.game_over_reason.is_some()).count() as u32,
            avg_turns: total as f64 / results.len() as f64,
            best_turns: results.iter().map(|r| r.turns_survived).max().unwrap_or(0),
            worst_turns: results.iter().map(|r| r.turns_survived).min().unwrap_or(0),
        }
    }
}

/// Advisors on the roster plus every decree in the catalog.
fn roster_offers(catalog: &Catalog, run: &RunConfig) -> Vec<Offer> {
    run.advisors
        .iter()
        .filter_map(|id| catalog.advisor(id))
        .map(Offer::advisor)
        .chain(catalog.decrees().iter().map(Offer::decree))
        .collect()
}

/// Effect list for one intervention, with a decree's cost charged up front.
/// `None` when the offer is unknown or the treasury cannot cover it.
fn intervention_effects(catalog: &Catalog, pick: &Intervention, gold: i32) -> Option<Vec<EffectSpec>> {
    match pick.kind {
        OfferKind::Advisor => catalog.advisor(&pick.id).map(|a| a.effects.clone()),
        OfferKind::Decree => {
            let decree = catalog.decree(&pick.id)?;
            if decree.gold_cost > gold {
                return None;
            }
            let mut effects = Vec::with_capacity(decree.effects.len() + 1);
            if decree.gold_cost > 0 {
                effects.push(EffectSpec::GoldDelta { value: -decree.gold_cost });
            }
            effects.extend(decree.effects.iter().cloned());
            Some(effects)
        }
    }
}

/// Run one campaign with `agent` until game over or `max_turns` turns have
/// been resolved.
///
/// Each roster advisor may be used once per turn; decrees any number of
/// times as long as gold covers them.
pub fn run_campaign(
    agent: &mut dyn Agent,
    catalog: Arc<Catalog>,
    run: &RunConfig,
    seed: u64,
    max_turns: u32,
) -> Result<CampaignResult, SetupError> {
    let offers = roster_offers(&catalog, run);
    let mut engine = TurnEngine::new(Arc::clone(&catalog), run, SeededDice::new(seed))?;

    let mut successes = 0;
    let mut fails = 0;
    let mut interventions_used = 0;
    let mut cascade_aborts = 0;

    while !engine.is_game_over() && engine.turn_number() <= max_turns {
        match engine.phase() {
            Phase::Assignment => {
                let view = run_view(engine.state(), &catalog);
                for (die, target) in agent.assign_dice(&view) {
                    if !engine.assign_die(die, target) {
                        debug!(agent = agent.name(), die, ?target, "assignment rejected");
                    }
                }
            }
            Phase::Adjustment => {
                let view = run_view(engine.state(), &catalog);
                let mut advisors_used: HashSet<String> = HashSet::new();
                for pick in agent.interventions(&view, &catalog, &offers) {
                    if engine.is_game_over() {
                        break;
                    }
                    if pick.kind == OfferKind::Advisor && !advisors_used.insert(pick.id.clone()) {
                        continue;
                    }
                    let Some(effects) = intervention_effects(&catalog, &pick, engine.gold()) else {
                        debug!(agent = agent.name(), id = %pick.id, "intervention skipped");
                        continue;
                    };
                    engine.apply_direct_effects(&effects, None, pick.selected_situation, pick.selected_die);
                    interventions_used += 1;
                }
            }
            _ => {}
        }

        engine.advance_phase();
        if engine.phase() == Phase::Resolution {
            let summary = engine.last_resolution();
            successes += summary.successes;
            fails += summary.fails;
        }
        cascade_aborts += engine
            .drain_events()
            .iter()
            .filter(|e| matches!(e, EngineEvent::CascadeAborted { .. }))
            .count() as u32;
    }

    let state = engine.into_state();
    let turns_survived = state.turn_number.saturating_sub(1).min(max_turns);
    info!(
        seed,
        agent = agent.name(),
        turns = turns_survived,
        reason = ?state.game_over_reason,
        "campaign finished"
    );

    Ok(CampaignResult {
        seed,
        agent_name: agent.name().to_string(),
        turns_survived,
        game_over_reason: state.game_over_reason,
        final_defense: state.defense,
        final_stability: state.stability,
        final_gold: state.gold,
        successes,
        fails,
        interventions_used,
        cascade_aborts,
        final_state: state,
    })
}

/// Run one campaign per seed in parallel. `make_agent` builds a fresh agent
/// for each seed.
pub fn run_batch<F>(
    make_agent: F,
    catalog: Arc<Catalog>,
    run: &RunConfig,
    seeds: &[u64],
    max_turns: u32,
) -> Vec<Result<CampaignResult, SetupError>>
where
    F: Fn(u64) -> Box<dyn Agent> + Sync,
{
    seeds
        .par_iter()
        .map(|&seed| {
            let mut agent = make_agent(seed);
            run_campaign(agent.as_mut(), Arc::clone(&catalog), run, seed, max_turns)
        })
        .collect()
}
