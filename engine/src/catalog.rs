// ═══════════════════════════════════════════════════════════════════════
// Catalog — situation, advisor, decree and dice upgrade definitions
//
// Definitions arrive as string-keyed JSON (`Raw*` types) and are
// validated once into closed enums. Nothing downstream ever dispatches
// on a string; an unknown kind is a CatalogError at load time.
// ═══════════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::CatalogError;
use crate::types::ResourceKey;

// ── Typed effect specs ─────────────────────────────────────────────────

/// Which situations a situation-affecting effect reaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetMode {
    SelfSituation,
    SelectedSituation,
    AllOtherSituations,
    RandomOtherSituation,
    ByTag(String),
}

impl TargetMode {
    fn parse(mode: Option<&str>, tag: Option<&str>, context: &str) -> Result<TargetMode, CatalogError> {
        match mode.unwrap_or("self") {
            "self" => Ok(TargetMode::SelfSituation),
            "selected_situation" => Ok(TargetMode::SelectedSituation),
            "all_other_situations" => Ok(TargetMode::AllOtherSituations),
            "random_other_situation" => Ok(TargetMode::RandomOtherSituation),
            "by_tag" => match tag {
                Some(t) if !t.is_empty() => Ok(TargetMode::ByTag(t.to_string())),
                _ => Err(CatalogError::MissingField {
                    context: context.to_string(),
                    field: "target_tag",
                }),
            },
            other => Err(CatalogError::UnknownTargetMode {
                context: context.to_string(),
                mode: other.to_string(),
            }),
        }
    }
}

/// Which dice a die-face effect reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DieTarget {
    SelectedDie,
    AssignedInSelectedSituation,
}

impl DieTarget {
    fn parse(mode: Option<&str>, context: &str) -> Result<DieTarget, CatalogError> {
        match mode.unwrap_or("selected_die") {
            "selected_die" => Ok(DieTarget::SelectedDie),
            "selected_situation" | "assigned_in_selected_situation" => {
                Ok(DieTarget::AssignedInSelectedSituation)
            }
            other => Err(CatalogError::UnknownTargetMode {
                context: context.to_string(),
                mode: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FaceOp {
    Delta(i32),
    Set(i32),
    Min(i32),
    Mult(f64),
}

impl FaceOp {
    /// New face for `current`, never below zero.
    pub fn apply(self, current: i32) -> i32 {
        let next = match self {
            FaceOp::Delta(v) => current.saturating_add(v),
            FaceOp::Set(v) => v,
            FaceOp::Min(v) => current.max(v),
            FaceOp::Mult(m) => (current as f64 * m).round() as i32,
        };
        next.max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectSpec {
    ResourceDelta { resource: ResourceKey, value: i32 },
    GoldDelta { value: i32 },
    ResourceGuard { resource: ResourceKey, duration: i32 },
    DemandDelta { value: i32, target: TargetMode },
    DeadlineDelta { value: i32, target: TargetMode },
    DieFace { op: FaceOp, target: DieTarget },
    RerollAssignedDice,
    SpawnSituation { definition: String },
    RemoveSituation { target: TargetMode },
}

impl EffectSpec {
    /// Whether applying this effect needs an externally selected situation.
    pub fn needs_selected_situation(&self) -> bool {
        match self {
            EffectSpec::DemandDelta { target, .. }
            | EffectSpec::DeadlineDelta { target, .. }
            | EffectSpec::RemoveSituation { target } => *target == TargetMode::SelectedSituation,
            EffectSpec::DieFace { target, .. } => *target == DieTarget::AssignedInSelectedSituation,
            EffectSpec::RerollAssignedDice => true,
            _ => false,
        }
    }

    pub fn needs_selected_die(&self) -> bool {
        matches!(self, EffectSpec::DieFace { target: DieTarget::SelectedDie, .. })
    }

    fn from_raw(raw: &RawEffect, context: &str) -> Result<EffectSpec, CatalogError> {
        let int_value = || -> Result<i32, CatalogError> {
            raw.value.map(|v| v.round() as i32).ok_or_else(|| CatalogError::MissingField {
                context: context.to_string(),
                field: "value",
            })
        };
        let resource = || -> Result<ResourceKey, CatalogError> {
            let name = raw.target_resource.as_deref().ok_or_else(|| CatalogError::MissingField {
                context: context.to_string(),
                field: "target_resource",
            })?;
            ResourceKey::parse(name).ok_or_else(|| CatalogError::UnknownResource {
                context: context.to_string(),
                resource: name.to_string(),
            })
        };
        let situations = || TargetMode::parse(raw.target_mode.as_deref(), raw.target_tag.as_deref(), context);
        let dice = || DieTarget::parse(raw.target_mode.as_deref(), context);

        let spec = match raw.effect_type.as_str() {
            "resource_delta" => EffectSpec::ResourceDelta { resource: resource()?, value: int_value()? },
            "gold_delta" => EffectSpec::GoldDelta { value: int_value()? },
            "resource_guard" => EffectSpec::ResourceGuard {
                resource: resource()?,
                // absent duration is kept and treated as a no-op guard
                duration: raw.duration.unwrap_or(0),
            },
            "demand_delta" => EffectSpec::DemandDelta { value: int_value()?, target: situations()? },
            "deadline_delta" => EffectSpec::DeadlineDelta { value: int_value()?, target: situations()? },
            "die_face_delta" => EffectSpec::DieFace { op: FaceOp::Delta(int_value()?), target: dice()? },
            "die_face_set" => EffectSpec::DieFace { op: FaceOp::Set(int_value()?), target: dice()? },
            "die_face_min" => EffectSpec::DieFace { op: FaceOp::Min(int_value()?), target: dice()? },
            "die_face_mult" => EffectSpec::DieFace {
                op: FaceOp::Mult(raw.value.ok_or_else(|| CatalogError::MissingField {
                    context: context.to_string(),
                    field: "value",
                })?),
                target: dice()?,
            },
            "reroll_assigned_dice" => match raw.target_mode.as_deref() {
                None | Some("selected_situation") => EffectSpec::RerollAssignedDice,
                Some(other) => {
                    return Err(CatalogError::UnknownTargetMode {
                        context: context.to_string(),
                        mode: other.to_string(),
                    })
                }
            },
            "spawn_situation" => EffectSpec::SpawnSituation {
                definition: raw.definition.clone().ok_or_else(|| CatalogError::MissingField {
                    context: context.to_string(),
                    field: "definition",
                })?,
            },
            "remove_situation" => EffectSpec::RemoveSituation { target: situations()? },
            other => {
                return Err(CatalogError::UnknownEffectType {
                    context: context.to_string(),
                    effect_type: other.to_string(),
                })
            }
        };
        Ok(spec)
    }
}

// ── Typed condition specs ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionSpec {
    Always,
    FaceAtLeast(i32),
    FaceAtMost(i32),
    FaceEquals(i32),
    FaceOdd,
    FaceEven,
    RolledFaceAtMost(i32),
    AssignedDeadlineAtMost(i32),
    AssignedBoardOrderIs(i32),
    AssignedDiceCountAtLeast(i32),
    DefenseAtMost(i32),
    StabilityAtMost(i32),
    GoldAtLeast(i32),
}

impl ConditionSpec {
    fn from_raw(raw: &RawCondition, context: &str) -> Result<ConditionSpec, CatalogError> {
        let value = || -> Result<i32, CatalogError> {
            raw.value.map(|v| v.round() as i32).ok_or_else(|| CatalogError::MissingField {
                context: context.to_string(),
                field: "value",
            })
        };
        let spec = match raw.condition_type.as_str() {
            "always" => ConditionSpec::Always,
            "face_at_least" => ConditionSpec::FaceAtLeast(value()?),
            "face_at_most" => ConditionSpec::FaceAtMost(value()?),
            "face_equals" => ConditionSpec::FaceEquals(value()?),
            "face_odd" => ConditionSpec::FaceOdd,
            "face_even" => ConditionSpec::FaceEven,
            "rolled_face_at_most" => ConditionSpec::RolledFaceAtMost(value()?),
            "assigned_deadline_at_most" => ConditionSpec::AssignedDeadlineAtMost(value()?),
            "assigned_board_order_is" => ConditionSpec::AssignedBoardOrderIs(value()?),
            "assigned_dice_count_at_least" => ConditionSpec::AssignedDiceCountAtLeast(value()?),
            "defense_at_most" => ConditionSpec::DefenseAtMost(value()?),
            "stability_at_most" => ConditionSpec::StabilityAtMost(value()?),
            "gold_at_least" => ConditionSpec::GoldAtLeast(value()?),
            other => {
                return Err(CatalogError::UnknownConditionType {
                    context: context.to_string(),
                    condition_type: other.to_string(),
                })
            }
        };
        Ok(spec)
    }
}

// ── Definitions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationDef {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub risk_cost: i32,
    pub base_demand: i32,
    pub base_deadline: i32,
    /// Eligible for the periodic spawn draw.
    pub spawnable: bool,
    pub on_success: Vec<EffectSpec>,
    pub on_fail: Vec<EffectSpec>,
    pub on_turn_start: Vec<EffectSpec>,
}

impl SituationDef {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn outcome_effects(&self, outcome: crate::types::Outcome) -> &[EffectSpec] {
        match outcome {
            crate::types::Outcome::Success => &self.on_success,
            crate::types::Outcome::Fail => &self.on_fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorDef {
    pub id: String,
    pub name: String,
    pub effects: Vec<EffectSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecreeDef {
    pub id: String,
    pub name: String,
    pub gold_cost: i32,
    pub effects: Vec<EffectSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeTrigger {
    /// Applied once, right after the initial roll.
    RollOnce,
    /// Re-evaluated after every roll or reroll until the face settles.
    Recheck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiceUpgradeDef {
    pub id: String,
    pub name: String,
    pub trigger: UpgradeTrigger,
    pub conditions: Vec<ConditionSpec>,
    pub effects: Vec<EffectSpec>,
}

// ── Raw (string-keyed) schema ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEffect {
    pub effect_type: String,
    #[serde(default)]
    pub target_resource: Option<String>,
    #[serde(default)]
    pub target_mode: Option<String>,
    #[serde(default)]
    pub target_tag: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCondition {
    pub condition_type: String,
    #[serde(default)]
    pub value: Option<f64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSituation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub risk_cost: i32,
    pub base_demand: i32,
    pub base_deadline: i32,
    #[serde(default = "default_true")]
    pub spawnable: bool,
    #[serde(default)]
    pub on_success: Vec<RawEffect>,
    #[serde(default)]
    pub on_fail: Vec<RawEffect>,
    #[serde(default)]
    pub on_turn_start: Vec<RawEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAdvisor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub effects: Vec<RawEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDecree {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gold_cost: i32,
    pub effects: Vec<RawEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDiceUpgrade {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub trigger: String,
    #[serde(default)]
    pub conditions: Vec<RawCondition>,
    pub effects: Vec<RawEffect>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCatalog {
    #[serde(default)]
    pub situations: Vec<RawSituation>,
    #[serde(default)]
    pub advisors: Vec<RawAdvisor>,
    #[serde(default)]
    pub decrees: Vec<RawDecree>,
    #[serde(default)]
    pub dice_upgrades: Vec<RawDiceUpgrade>,
}

// ── Catalog ────────────────────────────────────────────────────────────

const STANDARD_CATALOG: &str = include_str!("../data/standard_catalog.json");

/// Immutable definition store shared by every run.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    situations: Vec<SituationDef>,
    advisors: Vec<AdvisorDef>,
    decrees: Vec<DecreeDef>,
    dice_upgrades: Vec<DiceUpgradeDef>,
    situation_index: HashMap<String, usize>,
    advisor_index: HashMap<String, usize>,
    decree_index: HashMap<String, usize>,
    upgrade_index: HashMap<String, usize>,
}

fn convert_effects(raw: &[RawEffect], context: &str) -> Result<Vec<EffectSpec>, CatalogError> {
    raw.iter()
        .enumerate()
        .map(|(i, e)| EffectSpec::from_raw(e, &format!("{context}[{i}]")))
        .collect()
}

fn index_unique(ids: impl Iterator<Item = String>, kind: &'static str) -> Result<HashMap<String, usize>, CatalogError> {
    let mut index = HashMap::new();
    for (i, id) in ids.enumerate() {
        if index.insert(id.clone(), i).is_some() {
            return Err(CatalogError::DuplicateId { kind, id });
        }
    }
    Ok(index)
}

impl Catalog {
    /// The definitions bundled with the engine.
    pub fn standard() -> Result<Catalog, CatalogError> {
        Catalog::from_json(STANDARD_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Catalog, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(json)?;
        Catalog::from_raw(&raw)
    }

    pub fn from_raw(raw: &RawCatalog) -> Result<Catalog, CatalogError> {
        let situations = raw
            .situations
            .iter()
            .map(|s| -> Result<SituationDef, CatalogError> {
                let ctx = format!("situation '{}'", s.id);
                Ok(SituationDef {
                    id: s.id.clone(),
                    name: if s.name.is_empty() { s.id.clone() } else { s.name.clone() },
                    tags: s.tags.clone(),
                    risk_cost: s.risk_cost,
                    base_demand: s.base_demand,
                    base_deadline: s.base_deadline,
                    spawnable: s.spawnable,
                    on_success: convert_effects(&s.on_success, &format!("{ctx}.on_success"))?,
                    on_fail: convert_effects(&s.on_fail, &format!("{ctx}.on_fail"))?,
                    on_turn_start: convert_effects(&s.on_turn_start, &format!("{ctx}.on_turn_start"))?,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let advisors = raw
            .advisors
            .iter()
            .map(|a| -> Result<AdvisorDef, CatalogError> {
                Ok(AdvisorDef {
                    id: a.id.clone(),
                    name: if a.name.is_empty() { a.id.clone() } else { a.name.clone() },
                    effects: convert_effects(&a.effects, &format!("advisor '{}'", a.id))?,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let decrees = raw
            .decrees
            .iter()
            .map(|d| -> Result<DecreeDef, CatalogError> {
                Ok(DecreeDef {
                    id: d.id.clone(),
                    name: if d.name.is_empty() { d.id.clone() } else { d.name.clone() },
                    gold_cost: d.gold_cost,
                    effects: convert_effects(&d.effects, &format!("decree '{}'", d.id))?,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let dice_upgrades = raw
            .dice_upgrades
            .iter()
            .map(|u| -> Result<DiceUpgradeDef, CatalogError> {
                let ctx = format!("dice upgrade '{}'", u.id);
                let trigger = match u.trigger.as_str() {
                    "roll_once" | "on_roll_once" => UpgradeTrigger::RollOnce,
                    "recheck" | "on_recheck" => UpgradeTrigger::Recheck,
                    other => {
                        return Err(CatalogError::UnknownTrigger {
                            context: ctx,
                            trigger: other.to_string(),
                        })
                    }
                };
                let conditions = u
                    .conditions
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ConditionSpec::from_raw(c, &format!("{ctx}.conditions[{i}]")))
                    .collect::<Result<Vec<_>, CatalogError>>()?;
                Ok(DiceUpgradeDef {
                    id: u.id.clone(),
                    name: if u.name.is_empty() { u.id.clone() } else { u.name.clone() },
                    trigger,
                    conditions,
                    effects: convert_effects(&u.effects, &format!("{ctx}.effects"))?,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let catalog = Catalog {
            situation_index: index_unique(situations.iter().map(|s| s.id.clone()), "situation")?,
            advisor_index: index_unique(advisors.iter().map(|a| a.id.clone()), "advisor")?,
            decree_index: index_unique(decrees.iter().map(|d| d.id.clone()), "decree")?,
            upgrade_index: index_unique(dice_upgrades.iter().map(|u| u.id.clone()), "dice upgrade")?,
            situations,
            advisors,
            decrees,
            dice_upgrades,
        };
        catalog.check_references()?;
        Ok(catalog)
    }

    /// Every `spawn_situation` must name a known situation definition.
    fn check_references(&self) -> Result<(), CatalogError> {
        let lists = self
            .situations
            .iter()
            .flat_map(|s| [&s.on_success, &s.on_fail, &s.on_turn_start])
            .chain(self.advisors.iter().map(|a| &a.effects))
            .chain(self.decrees.iter().map(|d| &d.effects))
            .chain(self.dice_upgrades.iter().map(|u| &u.effects));
        for list in lists {
            for effect in list {
                if let EffectSpec::SpawnSituation { definition } = effect {
                    if !self.situation_index.contains_key(definition) {
                        return Err(CatalogError::UnknownDefinition {
                            kind: "situation",
                            id: definition.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    pub fn situation(&self, id: &str) -> Option<&SituationDef> {
        self.situation_index.get(id).map(|&i| &self.situations[i])
    }

    pub fn advisor(&self, id: &str) -> Option<&AdvisorDef> {
        self.advisor_index.get(id).map(|&i| &self.advisors[i])
    }

    pub fn decree(&self, id: &str) -> Option<&DecreeDef> {
        self.decree_index.get(id).map(|&i| &self.decrees[i])
    }

    pub fn dice_upgrade(&self, id: &str) -> Option<&DiceUpgradeDef> {
        self.upgrade_index.get(id).map(|&i| &self.dice_upgrades[i])
    }

    pub fn situations(&self) -> &[SituationDef] {
        &self.situations
    }

    pub fn advisors(&self) -> &[AdvisorDef] {
        &self.advisors
    }

    pub fn decrees(&self) -> &[DecreeDef] {
        &self.decrees
    }

    pub fn dice_upgrades(&self) -> &[DiceUpgradeDef] {
        &self.dice_upgrades
    }

    /// Definitions eligible for the periodic spawn draw, in catalog order.
    pub fn spawnable_situations(&self) -> Vec<&SituationDef> {
        self.situations.iter().filter(|s| s.spawnable).collect()
    }
}
