// ═══════════════════════════════════════════════════════════════════════
// Database — SQLite storage for campaign results and final snapshots
// ═══════════════════════════════════════════════════════════════════════

use rusqlite::{params, Connection, OptionalExtension};
use council_engine::types::RunState;
use serde::{Deserialize, Serialize};

use crate::runner::CampaignResult;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("snapshot encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no stored run with id {0}")]
    RunNotFound(i64),
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStanding {
    pub name: String,
    pub runs: u32,
    pub avg_turns: f64,
    pub best_turns: u32,
    pub game_overs: u32,
}

/// A stored run without its snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRun {
    pub id: i64,
    pub agent_name: String,
    pub seed: u64,
    pub turns_survived: u32,
    pub game_over_reason: Option<String>,
    pub defense: i32,
    pub stability: i32,
    pub gold: i32,
    pub successes: u32,
    pub fails: u32,
    pub played_at: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = Database {
            conn: Connection::open(path)?,
        };
        db.create_schema()?;
        Ok(db)
    }

    /// In-memory database (useful for tests).
    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.create_schema()?;
        Ok(db)
    }

    fn create_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("
            CREATE TABLE IF NOT EXISTS agents (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                runs        INTEGER NOT NULL DEFAULT 0,
                total_turns INTEGER NOT NULL DEFAULT 0,
                best_turns  INTEGER NOT NULL DEFAULT 0,
                game_overs  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS runs (
                id          INTEGER PRIMARY KEY,
                agent_id    INTEGER NOT NULL REFERENCES agents(id),
                seed        INTEGER NOT NULL,
                turns       INTEGER NOT NULL,
                reason      TEXT,
                defense     INTEGER NOT NULL,
                stability   INTEGER NOT NULL,
                gold        INTEGER NOT NULL,
                successes   INTEGER NOT NULL,
                fails       INTEGER NOT NULL,
                played_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS snapshots (
                run_id      INTEGER PRIMARY KEY REFERENCES runs(id),
                state_json  TEXT NOT NULL
            );
        ")?;
        Ok(())
    }

    /// Register an agent (or return existing ID).
    pub fn register_agent(&self, name: &str) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO agents (name) VALUES (?1)",
            params![name],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM agents WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Store a finished run with its final state and fold it into the
    /// agent's aggregates. Returns the run id.
    pub fn store_run(&mut self, result: &CampaignResult) -> Result<i64, StoreError> {
        let snapshot = serde_json::to_string(&result.final_state)?;
        let agent_id = self.register_agent(&result.agent_name)?;
        let reason = result.game_over_reason.map(|r| r.as_str());

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO runs (agent_id, seed, turns, reason, defense, stability, gold, successes, fails)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                agent_id,
                result.seed as i64,
                result.turns_survived,
                reason,
                result.final_defense,
                result.final_stability,
                result.final_gold,
                result.successes,
                result.fails,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO snapshots (run_id, state_json) VALUES (?1, ?2)",
            params![run_id, snapshot],
        )?;
        tx.execute(
            "UPDATE agents SET runs = runs + 1,
                               total_turns = total_turns + ?1,
                               best_turns = MAX(best_turns, ?1),
                               game_overs = game_overs + ?2
             WHERE id = ?3",
            params![result.turns_survived, reason.is_some() as i64, agent_id],
        )?;
        tx.commit()?;
        Ok(run_id)
    }

    /// Final state of a stored run.
    pub fn load_state(&self, run_id: i64) -> Result<RunState, StoreError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT state_json FROM snapshots WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or(StoreError::RunNotFound(run_id))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn run(&self, run_id: i64) -> Result<StoredRun, StoreError> {
        self.conn
            .query_row(
                "SELECT r.id, a.name, r.seed, r.turns, r.reason, r.defense, r.stability,
                        r.gold, r.successes, r.fails, r.played_at
                 FROM runs r JOIN agents a ON a.id = r.agent_id
                 WHERE r.id = ?1",
                params![run_id],
                |row| {
                    Ok(StoredRun {
                        id: row.get(0)?,
                        agent_name: row.get(1)?,
                        seed: row.get::<_, i64>(2)? as u64,
                        turns_survived: row.get(3)?,
                        game_over_reason: row.get(4)?,
                        defense: row.get(5)?,
                        stability: row.get(6)?,
                        gold: row.get(7)?,
                        successes: row.get(8)?,
                        fails: row.get(9)?,
                        played_at: row.get(10)?,
                    })
                },
            )
            .optional()?
            .ok_or(StoreError::RunNotFound(run_id))
    }

    /// Agents ranked by average turns survived.
    pub fn leaderboard(&self) -> Result<Vec<AgentStanding>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, runs, CAST(total_turns AS REAL) / runs AS avg_turns, best_turns, game_overs
             FROM agents WHERE runs > 0
             ORDER BY avg_turns DESC, best_turns DESC, name"
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(AgentStanding {
                name: row.get(0)?,
                runs: row.get(1)?,
                avg_turns: row.get(2)?,
                best_turns: row.get(3)?,
                game_overs: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Get total number of runs stored.
    pub fn run_count(&self) -> Result<u32, StoreError> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_campaign;
    use council_agents::{HeuristicAgent, RandomAgent};
    use council_engine::{Catalog, RunConfig};
    use std::sync::Arc;

    fn campaign(seed: u64, heuristic: bool) -> CampaignResult {
        let catalog = Arc::new(Catalog::standard().unwrap());
        let run = RunConfig::default();
        if heuristic {
            run_campaign(&mut HeuristicAgent::new(), catalog, &run, seed, 25).unwrap()
        } else {
            run_campaign(&mut RandomAgent::new(seed), catalog, &run, seed, 25).unwrap()
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut db = Database::in_memory().unwrap();
        let result = campaign(3, true);
        let id = db.store_run(&result).unwrap();
        assert_eq!(db.load_state(id).unwrap(), result.final_state);

        let stored = db.run(id).unwrap();
        assert_eq!(stored.seed, 3);
        assert_eq!(stored.agent_name, "Heuristic");
        assert_eq!(stored.turns_survived, result.turns_survived);
        assert_eq!(stored.game_over_reason.as_deref(), result.game_over_reason.map(|r| r.as_str()));
    }

    #[test]
    fn test_missing_run() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(db.load_state(99), Err(StoreError::RunNotFound(99))));
        assert!(matches!(db.run(99), Err(StoreError::RunNotFound(99))));
    }

    #[test]
    fn test_register_agent_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let a = db.register_agent("Random").unwrap();
        let b = db.register_agent("Random").unwrap();
        assert_eq!(a, b);
        assert!(db.leaderboard().unwrap().is_empty());
    }

    #[test]
    fn test_leaderboard_aggregates_runs() {
        let mut db = Database::in_memory().unwrap();
        let mut turns = Vec::new();
        for seed in 0..3 {
            let result = campaign(seed, false);
            turns.push(result.turns_survived);
            db.store_run(&result).unwrap();
        }
        db.store_run(&campaign(0, true)).unwrap();
        assert_eq!(db.run_count().unwrap(), 4);

        let board = db.leaderboard().unwrap();
        assert_eq!(board.len(), 2);
        let random = board.iter().find(|s| s.name == "Random").unwrap();
        assert_eq!(random.runs, 3);
        assert_eq!(random.best_turns, *turns.iter().max().unwrap());
        let expected = turns.iter().sum::<u32>() as f64 / 3.0;
        assert!((random.avg_turns - expected).abs() < 1e-9);
        assert!(board[0].avg_turns >= board[1].avg_turns);
    }
}
