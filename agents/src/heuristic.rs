// ═══════════════════════════════════════════════════════════════════════
// Heuristic Agent — makes decisions using simple urgency heuristics.
// Significantly stronger than RandomAgent.
//
// Urgency: situations closest to their deadline come first, ties broken
// by how much their failure would cost. Dice are spread so that each
// urgent situation gets enough expected damage to clear, and advisors
// are aimed at whatever is still short after the roll.
// ═══════════════════════════════════════════════════════════════════════

use crate::agent::{Agent, Intervention, Offer, OfferKind};
use council_engine::catalog::{Catalog, DieTarget, EffectSpec, TargetMode};
use council_engine::types::{ResourceKey, SituationId};
use council_engine::visibility::{RunView, SituationView};

/// Mean face of a six-sided die, rounded down to stay conservative.
const EXPECTED_FACE: i32 = 3;

/// Resources at or below this are treated as in danger.
const DANGER_LEVEL: i32 = 4;

pub struct HeuristicAgent;

impl HeuristicAgent {
    pub fn new() -> Self {
        HeuristicAgent
    }

    /// Board sorted most urgent first.
    fn by_urgency(view: &RunView) -> Vec<&SituationView> {
        let mut board: Vec<&SituationView> = view.situations.iter().collect();
        board.sort_by_key(|s| (s.deadline, -s.fail_penalty, s.board_order));
        board
    }

    /// Damage still missing after the current roll.
    fn shortfall(s: &SituationView) -> i32 {
        s.demand.saturating_sub(s.pending_damage).max(0)
    }

    /// Most urgent situation still short of its demand.
    fn neediest(view: &RunView) -> Option<&SituationView> {
        Self::by_urgency(view).into_iter().find(|s| Self::shortfall(s) > 0)
    }

    /// Situation that a demand reduction of `amount` would finish, else the neediest.
    fn best_finish(view: &RunView, amount: i32) -> Option<&SituationView> {
        Self::by_urgency(view)
            .into_iter()
            .find(|s| (1..=amount).contains(&Self::shortfall(s)))
            .or_else(|| Self::neediest(view))
    }

    /// Lowest-faced rolled die on a situation that is still short.
    fn weakest_useful_die(view: &RunView) -> Option<(usize, SituationId)> {
        Self::by_urgency(view)
            .into_iter()
            .filter(|s| Self::shortfall(s) > 0)
            .flat_map(|s| {
                s.assigned_dice
                    .iter()
                    .filter_map(move |&i| view.dice.get(i))
                    .filter(|d| d.has_rolled)
                    .map(move |d| (d.current_face, d.index, s.id))
            })
            .min_by_key(|&(face, index, _)| (face, index))
            .map(|(_, index, id)| (index, id))
    }

    /// Whether losses due this turn would hurt `resource` badly.
    fn under_threat(view: &RunView, resource: ResourceKey) -> bool {
        let at_risk: i32 = view
            .situations
            .iter()
            .filter(|s| s.deadline <= 1 && !s.is_covered())
            .map(|s| s.fail_penalty)
            .fold(0, i32::saturating_add);
        at_risk > 0 && view.resource(resource).saturating_sub(at_risk) <= DANGER_LEVEL
    }

    /// Pick targets for one offer, or `None` if it is not worth using now.
    fn plan(&self, view: &RunView, effects: &[EffectSpec]) -> Option<(Option<SituationId>, Option<usize>)> {
        let first = effects.iter().find(|e| !matches!(e, EffectSpec::GoldDelta { value } if *value < 0))?;
        match first {
            EffectSpec::DemandDelta { value, target: TargetMode::SelectedSituation } if *value < 0 => {
                Self::best_finish(view, value.saturating_neg()).map(|s| (Some(s.id), None))
            }
            EffectSpec::DeadlineDelta { value, target: TargetMode::SelectedSituation } if *value > 0 => view
                .situations
                .iter()
                .filter(|s| s.deadline <= 1 && !s.is_covered())
                .max_by_key(|s| s.fail_penalty)
                .map(|s| (Some(s.id), None)),
            EffectSpec::DieFace { target: DieTarget::SelectedDie, .. } => {
                Self::weakest_useful_die(view).map(|(die, id)| (Some(id), Some(die)))
            }
            EffectSpec::DieFace { target: DieTarget::AssignedInSelectedSituation, .. }
            | EffectSpec::RerollAssignedDice => Self::by_urgency(view)
                .into_iter()
                .filter(|s| Self::shortfall(s) > 0 && !s.assigned_dice.is_empty())
                .find(|s| s.pending_damage < s.assigned_dice.len() as i32 * EXPECTED_FACE)
                .map(|s| (Some(s.id), None)),
            EffectSpec::RemoveSituation { target: TargetMode::SelectedSituation } => view
                .situations
                .iter()
                .filter(|s| s.deadline <= 1 && !s.is_covered() && s.fail_penalty >= DANGER_LEVEL)
                .max_by_key(|s| s.fail_penalty)
                .map(|s| (Some(s.id), None)),
            EffectSpec::ResourceGuard { resource, .. } => {
                let active = view.active_guards.contains_key(resource);
                (!active && Self::under_threat(view, *resource)).then_some((None, None))
            }
            EffectSpec::ResourceDelta { resource, value } if *value > 0 => {
                (view.resource(*resource) <= DANGER_LEVEL).then_some((None, None))
            }
            EffectSpec::GoldDelta { value } if *value > 0 => {
                let safe = ResourceKey::ALL.iter().all(|&r| view.resource(r) > DANGER_LEVEL + 2);
                safe.then_some((None, None))
            }
            _ => None,
        }
    }
}

impl Default for HeuristicAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for HeuristicAgent {
    fn name(&self) -> &str { "Heuristic" }

    fn assign_dice(&mut self, view: &RunView) -> Vec<(usize, Option<SituationId>)> {
        let mut free: Vec<usize> = view.dice.iter().map(|d| d.index).collect();
        let mut plan = Vec::new();
        let board = Self::by_urgency(view);

        for s in &board {
            let needed = (s.demand.saturating_add(EXPECTED_FACE - 1) / EXPECTED_FACE).max(1) as usize;
            // Only commit dice where the expected roll clears the demand
            if needed > free.len() {
                continue;
            }
            for die in free.drain(..needed) {
                plan.push((die, Some(s.id)));
            }
        }

        // Spare dice chip away at the most urgent situation
        if let Some(first) = board.first() {
            for die in free {
                plan.push((die, Some(first.id)));
            }
        }
        plan
    }

    fn interventions(&mut self, view: &RunView, catalog: &Catalog, offers: &[Offer]) -> Vec<Intervention> {
        let mut gold = view.gold;
        let mut picks = Vec::new();

        // Free advisors first, then decrees cheapest first
        let mut ordered: Vec<&Offer> = offers.iter().collect();
        ordered.sort_by_key(|o| (o.kind == OfferKind::Decree, o.gold_cost));

        for offer in ordered {
            if offer.gold_cost > gold {
                continue;
            }
            let Some((situation, die)) = self.plan(view, offer.effects(catalog)) else {
                continue;
            };
            if (offer.needs_situation && situation.is_none()) || (offer.needs_die && die.is_none()) {
                continue;
            }
            gold -= offer.gold_cost;
            picks.push(Intervention::of(offer, situation, die));
        }
        picks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_engine::types::{Die, Phase, ResolutionSummary};
    use std::collections::BTreeMap;

    fn situation(id: u32, demand: i32, deadline: i32, fail_penalty: i32) -> SituationView {
        SituationView {
            id: SituationId(id),
            definition_id: format!("s{id}"),
            name: format!("S{id}"),
            tags: vec![],
            demand,
            deadline,
            board_order: id as usize,
            assigned_dice: vec![],
            pending_damage: 0,
            fail_penalty,
        }
    }

    fn view(situations: Vec<SituationView>, dice: usize) -> RunView {
        RunView {
            turn_number: 1,
            phase: Phase::Assignment,
            defense: 10,
            stability: 10,
            gold: 3,
            active_guards: BTreeMap::new(),
            dice: (0..dice).map(|i| Die::new(i, None)).collect(),
            situations,
            last_resolution: ResolutionSummary::default(),
            game_over_reason: None,
        }
    }

    #[test]
    fn test_urgent_situation_gets_dice_first() {
        let v = view(vec![situation(1, 6, 4, 2), situation(2, 5, 1, 3)], 3);
        let plan = HeuristicAgent::new().assign_dice(&v);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], (0, Some(SituationId(2))));
        assert_eq!(plan[1], (1, Some(SituationId(2))));
    }

    #[test]
    fn test_every_die_is_placed_when_board_is_nonempty() {
        let v = view(vec![situation(1, 20, 5, 1)], 4);
        let plan = HeuristicAgent::new().assign_dice(&v);
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|&(_, t)| t == Some(SituationId(1))));
    }

    #[test]
    fn test_marshal_finishes_what_it_can() {
        let catalog = Catalog::standard().unwrap();
        let mut near = situation(1, 5, 3, 2);
        near.pending_damage = 3;
        let far = situation(2, 9, 1, 4);
        let v = view(vec![near, far], 2);
        let offers: Vec<Offer> = catalog.advisors().iter().filter(|a| a.id == "marshal").map(Offer::advisor).collect();
        let picks = HeuristicAgent::new().interventions(&v, &catalog, &offers);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].selected_situation, Some(SituationId(1)));
    }

    #[test]
    fn test_unaffordable_decrees_are_skipped() {
        let catalog = Catalog::standard().unwrap();
        let mut v = view(vec![situation(1, 9, 1, 5)], 1);
        v.gold = 0;
        v.defense = 3;
        let offers: Vec<Offer> = catalog.decrees().iter().map(Offer::decree).collect();
        let picks = HeuristicAgent::new().interventions(&v, &catalog, &offers);
        assert!(picks
            .iter()
            .all(|p| catalog.decree(&p.id).is_some_and(|d| d.gold_cost == 0)));
    }
}
