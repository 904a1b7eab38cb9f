// ═══════════════════════════════════════════════════════════════════════
// Agent Trait — interface every council player implements
//
// KEY DESIGN PRINCIPLE:
//   Agents receive a `RunView` (not the raw RunState). The view joins
//   each situation with its definition and pre-computes the dice
//   totals, so agents never reach into engine internals and cannot
//   mutate the run except through the decisions they return.
//
//   The driver asks for two kinds of decision each turn:
//     - dice assignment (Assignment phase)
//     - interventions: advisor and decree uses (Adjustment phase)
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

use council_engine::catalog::{AdvisorDef, Catalog, DecreeDef, EffectSpec};
use council_engine::types::SituationId;
use council_engine::visibility::RunView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferKind {
    Advisor,
    Decree,
}

/// Something the agent may use right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub kind: OfferKind,
    pub id: String,
    pub gold_cost: i32,
    /// At least one effect reads the selected situation.
    pub needs_situation: bool,
    /// At least one effect reads the selected die.
    pub needs_die: bool,
}

impl Offer {
    pub fn advisor(def: &AdvisorDef) -> Self {
        Offer {
            kind: OfferKind::Advisor,
            id: def.id.clone(),
            gold_cost: 0,
            needs_situation: def.effects.iter().any(EffectSpec::needs_selected_situation),
            needs_die: def.effects.iter().any(EffectSpec::needs_selected_die),
        }
    }

    pub fn decree(def: &DecreeDef) -> Self {
        Offer {
            kind: OfferKind::Decree,
            id: def.id.clone(),
            gold_cost: def.gold_cost,
            needs_situation: def.effects.iter().any(EffectSpec::needs_selected_situation),
            needs_die: def.effects.iter().any(EffectSpec::needs_selected_die),
        }
    }

    /// Catalog effects behind this offer.
    pub fn effects<'c>(&self, catalog: &'c Catalog) -> &'c [EffectSpec] {
        let effects = match self.kind {
            OfferKind::Advisor => catalog.advisor(&self.id).map(|a| a.effects.as_slice()),
            OfferKind::Decree => catalog.decree(&self.id).map(|d| d.effects.as_slice()),
        };
        effects.unwrap_or(&[])
    }
}

/// One use of an offer, with the targets the agent picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub kind: OfferKind,
    pub id: String,
    pub selected_situation: Option<SituationId>,
    pub selected_die: Option<usize>,
}

impl Intervention {
    pub fn of(offer: &Offer, selected_situation: Option<SituationId>, selected_die: Option<usize>) -> Self {
        Intervention {
            kind: offer.kind,
            id: offer.id.clone(),
            selected_situation,
            selected_die,
        }
    }
}

/// Trait that all council agents implement.
pub trait Agent: Send {
    /// Human-readable name, also the leaderboard key.
    fn name(&self) -> &str;

    /// Where each die goes this turn. `None` leaves a die idle; dice not
    /// mentioned stay unassigned.
    fn assign_dice(&mut self, view: &RunView) -> Vec<(usize, Option<SituationId>)>;

    /// Advisor and decree uses, applied in order. Offers the agent cannot
    /// afford or has already spent are skipped by the driver.
    fn interventions(&mut self, view: &RunView, catalog: &Catalog, offers: &[Offer]) -> Vec<Intervention>;
}
