// ═══════════════════════════════════════════════════════════════════════
// Random Agent — makes all decisions randomly.
// Serves as baseline and for testing engine stability.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{Agent, Intervention, Offer};
use council_engine::catalog::Catalog;
use council_engine::types::SituationId;
use council_engine::visibility::RunView;
use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rand::SeedableRng;

pub struct RandomAgent {
    rng: ChaCha8Rng,
}

impl RandomAgent {
    pub fn new(seed: u64) -> Self {
        RandomAgent {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn name(&self) -> &str { "Random" }

    fn assign_dice(&mut self, view: &RunView) -> Vec<(usize, Option<SituationId>)> {
        let ids: Vec<SituationId> = view.situations.iter().map(|s| s.id).collect();
        view.dice
            .iter()
            .map(|die| {
                // Occasionally hold a die back
                let target = if self.rng.gen_bool(0.1) {
                    None
                } else {
                    ids.choose(&mut self.rng).copied()
                };
                (die.index, target)
            })
            .collect()
    }

    fn interventions(&mut self, view: &RunView, _catalog: &Catalog, offers: &[Offer]) -> Vec<Intervention> {
        let rolled: Vec<usize> = view.dice.iter().filter(|d| d.has_rolled).map(|d| d.index).collect();
        let ids: Vec<SituationId> = view.situations.iter().map(|s| s.id).collect();
        let mut gold = view.gold;
        let mut picks = Vec::new();

        for offer in offers {
            if offer.gold_cost > gold || !self.rng.gen_bool(0.3) {
                continue;
            }
            let situation = if offer.needs_situation {
                match ids.choose(&mut self.rng) {
                    Some(&id) => Some(id),
                    None => continue,
                }
            } else {
                None
            };
            let die = if offer.needs_die {
                match rolled.choose(&mut self.rng) {
                    Some(&i) => Some(i),
                    None => continue,
                }
            } else {
                None
            };
            gold -= offer.gold_cost;
            picks.push(Intervention::of(offer, situation, die));
        }
        picks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_engine::visibility::run_view;
    use council_engine::{Catalog, RunConfig, SeededDice, TurnEngine};
    use std::sync::Arc;

    fn view_with_board() -> (RunView, Catalog) {
        let catalog = Catalog::standard().unwrap();
        let run = RunConfig {
            initial_situations: vec!["bandit_raid".to_string(), "plague".to_string()],
            ..RunConfig::default()
        };
        let engine = TurnEngine::new(Arc::new(catalog.clone()), &run, SeededDice::new(3)).unwrap();
        (run_view(engine.state(), engine.catalog()), catalog)
    }

    #[test]
    fn test_random_assignments_target_live_situations() {
        let (view, _) = view_with_board();
        let mut agent = RandomAgent::new(11);
        for _ in 0..20 {
            let plan = agent.assign_dice(&view);
            assert_eq!(plan.len(), view.dice.len());
            for (_, target) in plan {
                if let Some(id) = target {
                    assert!(view.situation(id).is_some());
                }
            }
        }
    }

    #[test]
    fn test_random_interventions_stay_affordable() {
        let (view, catalog) = view_with_board();
        let offers: Vec<Offer> = catalog.decrees().iter().map(Offer::decree).collect();
        let mut agent = RandomAgent::new(5);
        for _ in 0..50 {
            let spent: i32 = agent
                .interventions(&view, &catalog, &offers)
                .iter()
                .map(|i| catalog.decree(&i.id).map_or(0, |d| d.gold_cost))
                .sum();
            assert!(spent <= view.gold);
        }
    }
}
