pub mod runner;
pub mod database;

pub use runner::{run_batch, run_campaign, BatchSummary, CampaignResult};
pub use database::{AgentStanding, Database, StoreError, StoredRun};
