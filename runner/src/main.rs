// ═══════════════════════════════════════════════════════════════════════
// Runner — CLI entry point for playing runs and batches
// ═══════════════════════════════════════════════════════════════════════

use council_agents::{Agent, HeuristicAgent, RandomAgent};
use council_engine::{Catalog, RunConfig};
use council_tournament::{run_batch, run_campaign, BatchSummary, CampaignResult, Database};
use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "council-runner", about = "Dice Council turn-resolution lab")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Run configuration JSON (defaults built in)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog JSON (defaults to the bundled standard catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a single run with one agent
    Play {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// Agent type: "random" or "heuristic"
        #[arg(short, long, default_value = "heuristic")]
        agent: String,
        #[arg(short, long, default_value_t = 100)]
        max_turns: u32,
        /// Also store the result in this database
        #[arg(long)]
        db: Option<String>,
    },
    /// Play N runs in parallel and store them
    Batch {
        #[arg(short, long, default_value_t = 100)]
        games: u32,
        /// Agent type: "random", "heuristic", or "both"
        #[arg(short, long, default_value = "both")]
        agent: String,
        #[arg(short, long, default_value_t = 100)]
        max_turns: u32,
        #[arg(long, default_value_t = 1)]
        first_seed: u64,
        #[arg(short, long, default_value = "results.db")]
        db: String,
    },
    /// Show leaderboard from database
    Leaderboard {
        #[arg(short, long, default_value = "results.db")]
        db: String,
    },
    /// Show one stored run and its final state
    Show {
        run_id: i64,
        #[arg(short, long, default_value = "results.db")]
        db: String,
    },
    /// List the catalog definitions
    Catalog,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_inputs(&cli).and_then(|(catalog, run)| match cli.command {
        Commands::Play { seed, ref agent, max_turns, ref db } => {
            cmd_play(catalog, &run, seed, agent, max_turns, db.as_deref())
        }
        Commands::Batch { games, ref agent, max_turns, first_seed, ref db } => {
            cmd_batch(catalog, &run, games, agent, max_turns, first_seed, db)
        }
        Commands::Leaderboard { ref db } => cmd_leaderboard(db),
        Commands::Show { run_id, ref db } => cmd_show(db, run_id),
        Commands::Catalog => cmd_catalog(&catalog),
    });

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_inputs(cli: &Cli) -> Result<(Arc<Catalog>, RunConfig), Box<dyn Error>> {
    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_json(&std::fs::read_to_string(path)?)?,
        None => Catalog::standard()?,
    };
    let run = match &cli.config {
        Some(path) => RunConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => RunConfig::default(),
    };
    Ok((Arc::new(catalog), run))
}

fn make_agent(agent_type: &str, seed: u64) -> Result<Box<dyn Agent>, Box<dyn Error>> {
    match agent_type {
        "random" => Ok(Box::new(RandomAgent::new(seed))),
        "heuristic" => Ok(Box::new(HeuristicAgent::new())),
        other => Err(format!("unknown agent type '{other}'").into()),
    }
}

fn print_result(result: &CampaignResult) {
    println!("  Agent:          {}", result.agent_name);
    println!("  Seed:           {}", result.seed);
    println!("  Turns survived: {}", result.turns_survived);
    match result.game_over_reason {
        Some(reason) => println!("  Ended by:       {reason}"),
        None => println!("  Ended by:       turn limit"),
    }
    println!(
        "  Final:          defense {}, stability {}, gold {}",
        result.final_defense, result.final_stability, result.final_gold
    );
    println!(
        "  Situations:     {} cleared, {} failed, {} still on the board",
        result.successes,
        result.fails,
        result.final_state.situations.len()
    );
    println!("  Interventions:  {}", result.interventions_used);
    if result.cascade_aborts > 0 {
        println!("  Cascade aborts: {}", result.cascade_aborts);
    }
}

fn cmd_play(catalog: Arc<Catalog>, run: &RunConfig, seed: u64, agent_type: &str, max_turns: u32, db: Option<&str>) -> CliResult {
    println!("=== Dice Council ===\n");
    println!("Running single game: seed={}, agent={}, max_turns={}\n", seed, agent_type, max_turns);

    let mut agent = make_agent(agent_type, seed)?;
    let result = run_campaign(agent.as_mut(), catalog, run, seed, max_turns)?;
    print_result(&result);

    if let Some(path) = db {
        let mut db = Database::open(path)?;
        let id = db.store_run(&result)?;
        println!("\nStored as run {} in {}", id, path);
    }
    Ok(())
}

fn cmd_batch(
    catalog: Arc<Catalog>,
    run: &RunConfig,
    games: u32,
    agent_type: &str,
    max_turns: u32,
    first_seed: u64,
    db_path: &str,
) -> CliResult {
    let kinds: Vec<&str> = match agent_type {
        "both" => vec!["random", "heuristic"],
        other => vec![other],
    };
    // Fail fast on a bad agent name before spinning up the pool
    for kind in &kinds {
        make_agent(kind, 0)?;
    }

    println!("=== Batch: {} games per agent, agents={:?}, max_turns={} ===\n", games, kinds, max_turns);
    let seeds: Vec<u64> = (0..games as u64).map(|g| first_seed + g).collect();
    let mut db = Database::open(db_path)?;

    for kind in kinds {
        let outcomes = run_batch(
            |seed| match kind {
                "random" => Box::new(RandomAgent::new(seed)) as Box<dyn Agent>,
                _ => Box::new(HeuristicAgent::new()),
            },
            Arc::clone(&catalog),
            run,
            &seeds,
            max_turns,
        );

        let mut results = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let result = outcome?;
            db.store_run(&result)?;
            results.push(result);
        }
        let summary = BatchSummary::from_results(&results);
        info!(agent = kind, runs = summary.runs, avg_turns = summary.avg_turns, "batch stored");

        println!("--- {} ({} runs) ---", kind, summary.runs);
        println!("  Avg turns:  {:.2}", summary.avg_turns);
        println!("  Best/worst: {} / {}", summary.best_turns, summary.worst_turns);
        println!("  Game overs: {}", summary.game_overs);
        println!();
    }

    println!("Results saved to: {}", db_path);
    println!("Total runs in DB: {}", db.run_count()?);
    Ok(())
}

fn cmd_leaderboard(db_path: &str) -> CliResult {
    let db = Database::open(db_path)?;
    let board = db.leaderboard()?;
    if board.is_empty() {
        println!("No runs found. Run a batch first.");
        return Ok(());
    }
    println!("=== Leaderboard ===\n");
    println!("{:<20} {:>8} {:>10} {:>8} {:>10}", "Agent", "Runs", "Avg turns", "Best", "Game overs");
    println!("{}", "-".repeat(60));
    for s in &board {
        println!("{:<20} {:>8} {:>10.2} {:>8} {:>10}", s.name, s.runs, s.avg_turns, s.best_turns, s.game_overs);
    }
    Ok(())
}

fn cmd_show(db_path: &str, run_id: i64) -> CliResult {
    let db = Database::open(db_path)?;
    let run = db.run(run_id)?;
    let state = db.load_state(run_id)?;

    println!("=== Run {} ({}) ===\n", run.id, run.played_at);
    println!("  Agent: {}  Seed: {}  Turns: {}", run.agent_name, run.seed, run.turns_survived);
    println!("  Ended by: {}", run.game_over_reason.as_deref().unwrap_or("turn limit"));
    println!("  Cleared {} / failed {}", run.successes, run.fails);
    println!();
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn cmd_catalog(catalog: &Catalog) -> CliResult {
    println!("=== Situations ===");
    for s in catalog.situations() {
        println!(
            "  {:<18} demand {:>2}  deadline {:>2}  risk {:>2}  {}{}",
            s.id,
            s.base_demand,
            s.base_deadline,
            s.risk_cost,
            s.tags.join(","),
            if s.spawnable { "" } else { "  (not spawnable)" }
        );
    }
    println!("\n=== Advisors ===");
    for a in catalog.advisors() {
        println!("  {:<18} {}", a.id, a.name);
    }
    println!("\n=== Decrees ===");
    for d in catalog.decrees() {
        println!("  {:<18} {:>2} gold  {}", d.id, d.gold_cost, d.name);
    }
    println!("\n=== Dice upgrades ===");
    for u in catalog.dice_upgrades() {
        println!("  {:<18} {:?}  {}", u.id, u.trigger, u.name);
    }
    Ok(())
}
