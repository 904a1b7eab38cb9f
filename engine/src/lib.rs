pub mod types;
pub mod catalog;
pub mod config;
pub mod error;
pub mod rng;
pub mod queue;
pub mod effects;
pub mod upgrades;
pub mod spawn;
pub mod setup;
pub mod engine;
pub mod visibility;


pub use types::*;
pub use catalog::{Catalog, EffectSpec, TargetMode, DieTarget, FaceOp, ConditionSpec, UpgradeTrigger};
pub use config::{EngineConfig, RunConfig};
pub use error::{CascadeError, CatalogError, SetupError};
pub use rng::{DiceSource, SeededDice};
pub use engine::TurnEngine;
