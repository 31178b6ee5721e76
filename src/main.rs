//! Command line front end: solves the sample pair, random pairs, or pairs loaded from JSON, and reports timings.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use lazy_static::lazy_static;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use tracing::{debug, info, warn};

use digraph_iso::random::{random_digraph, shuffled};
use digraph_iso::{Digraph, Solver, SolverConfig};

lazy_static! {
    /// A pair of isomorphic graphs with exactly one isomorphism between them.
    static ref SAMPLE: (Digraph, Digraph) = (
        serde_json::from_str("[[0,1,5,7],[0,5],[2,1,4],[0,4],[6],[7,4],[7],[6,5,1]]").unwrap(),
        serde_json::from_str("[[1,5],[1,2,3,6],[6,5],[2,1],[6],[4],[4,2,3],[7,3,5]]").unwrap(),
    );
}

/// Directed graph isomorphism by constraint propagation
#[derive(Parser, Debug)]
#[command(name = "digraph-iso")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Give up after materializing this many search states
    #[arg(long, global = true)]
    max_states: Option<usize>,
    /// Give up after this many milliseconds per solve
    #[arg(long, global = true)]
    time_limit_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn to_config(&self) -> SolverConfig {
        SolverConfig {
            max_states: self.max_states,
            time_limit: self.time_limit_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the built-in 8-vertex sample pair and print the mapping
    Sample,
    /// Solve random graphs against shuffled copies of themselves, for geometrically growing orders
    Sweep {
        /// Probability of each ordered vertex pair being an edge
        #[arg(long, default_value_t = 0.25)]
        ratio: f64,
        /// Largest order to try
        #[arg(long, default_value_t = 9000)]
        max_order: usize,
        /// Factor applied to the order after each run
        #[arg(long, default_value_t = 1.25)]
        growth: f64,
        /// Seed for the graph generator (random if omitted)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Solve two graphs stored as JSON arrays of adjacency lists
    Check {
        /// Graph to map from
        a: PathBuf,
        /// Graph to map onto
        b: PathBuf,
        /// Print the mapping and whether it verifies
        #[arg(long)]
        show_solution: bool,
    },
}

fn load(path: &Path) -> Result<Digraph, Box<dyn Error>> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let g = serde_json::from_str(&text).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(g)
}

fn check_graphs(solver: &mut Solver, a: &Digraph, b: &Digraph, show_solution: bool) -> Result<(), Box<dyn Error>> {
    let started = Instant::now();
    let outcome = solver.solve(a, b);
    let elapsed = started.elapsed();
    debug!(stats = ?solver.stats(), "solve finished");

    let found = match &outcome {
        Ok(Some(_)) => "true".to_owned(),
        Ok(None) => "false".to_owned(),
        Err(e) => {
            warn!(%e, "search gave up");
            format!("unknown ({})", e)
        }
    };
    if let (true, Ok(Some(m))) = (show_solution, &outcome) {
        println!("Solution:");
        println!("  {}", serde_json::to_string(m)?);
        println!("Solution valid: {}", a.verify_mapping(b, m));
    }

    let edges = a.size();
    let millis = elapsed.as_secs_f64() * 1000.0;
    let per_edge = if edges > 0 { millis / edges as f64 } else { 0.0 };
    println!("Stats: Time={} ms | Nodes={} | Edges={} | Solution={} | TimePerEdge={}", elapsed.as_millis(), a.order(), edges, found, per_edge);
    Ok(())
}

fn run_sweep(solver: &mut Solver, ratio: f64, max_order: usize, growth: f64, seed: Option<u64>) -> Result<(), Box<dyn Error>> {
    if !(0.0..=1.0).contains(&ratio) { return Err(format!("--ratio must be between 0 and 1, got {}", ratio).into()); }
    if growth <= 1.0 { return Err(format!("--growth must be greater than 1, got {}", growth).into()); }

    let seed = seed.unwrap_or_else(rand::random);
    info!(seed, ratio, max_order, "running successive graph sizes");
    println!("== Running successive graph sizes ======================");

    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut order = 2.0;
    while order <= max_order as f64 {
        let a = random_digraph(&mut rng, order as usize, ratio);
        let (b, _) = shuffled(&mut rng, &a);
        check_graphs(solver, &a, &b, false)?;
        order *= growth;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut solver = Solver::new(args.to_config());
    debug!(config = ?solver.config(), "solver limits");

    match &args.command {
        Command::Sample => {
            println!("== Checking Sample Graph ==========================");
            let (a, b) = &*SAMPLE;
            check_graphs(&mut solver, a, b, true)?;
        }
        Command::Sweep { ratio, max_order, growth, seed } => {
            run_sweep(&mut solver, *ratio, *max_order, *growth, *seed)?;
        }
        Command::Check { a, b, show_solution } => {
            let (a, b) = (load(a)?, load(b)?);
            info!(order = a.order(), other = b.order(), "loaded graphs");
            check_graphs(&mut solver, &a, &b, *show_solution)?;
        }
    }
    Ok(())
}
