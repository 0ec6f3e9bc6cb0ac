//! Runs all three solvers on tic-tac-toe and reports how far they agree.
//!
//! Usage:
//!   cargo run --release --bin compare_solvers -- [OPTIONS]

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use mdp_solver::games::tictactoe::{Board, Move, SolveReport, TicTacToeEnv, TicTacToeMdp};
use mdp_solver::mdp::{
    Policy, PolicyIterationSolver, QLearningSolver, SolverConfig, ValueIterationSolver,
};

#[derive(Parser, Debug)]
#[command(about = "Compare policy iteration, value iteration and Q-learning")]
struct Args {
    /// Configuration JSON file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Number of Q-learning episodes
    #[arg(long, short = 'e')]
    episodes: Option<u64>,

    /// Random seed for reproducibility
    #[arg(long, short = 's', default_value_t = 42)]
    seed: u64,

    /// Test games per solver
    #[arg(long, short = 'g', default_value_t = 1000)]
    games: usize,

    /// Output file for the JSON comparison
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

/// How often two policies choose the same move.
#[derive(Debug, Serialize)]
struct Agreement {
    left: String,
    right: String,
    shared_states: usize,
    same_action: usize,
}

impl Agreement {
    fn between(
        left: &str,
        right: &str,
        a: &Policy<Board, Move>,
        b: &Policy<Board, Move>,
    ) -> Self {
        let mut shared_states = 0;
        let mut same_action = 0;
        for (state, action) in a.iter() {
            if let Some(other) = b.action_for(state) {
                shared_states += 1;
                if other == action {
                    same_action += 1;
                }
            }
        }
        Self {
            left: left.to_string(),
            right: right.to_string(),
            shared_states,
            same_action,
        }
    }

    fn rate(&self) -> f64 {
        if self.shared_states == 0 {
            return 0.0;
        }
        self.same_action as f64 / self.shared_states as f64
    }
}

#[derive(Debug, Serialize)]
struct Comparison {
    reports: Vec<SolveReport>,
    agreements: Vec<Agreement>,
    max_value_gap: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SolverConfig::from_json_file(path)?,
        None => SolverConfig::exact(),
    };
    config = config.with_seed(args.seed);
    if let Some(episodes) = args.episodes {
        config = config.with_episodes(episodes);
    }
    config.validate()?;

    println!("=================================================");
    println!("  Solver Comparison: Tic-Tac-Toe");
    println!("=================================================");
    println!();

    let mdp = TicTacToeMdp::new(config.rewards);

    println!("Running policy iteration...");
    let mut pi = PolicyIterationSolver::new(mdp.clone(), config.clone())?;
    let pi_policy = pi.train()?;

    println!("Running value iteration...");
    let mut vi = ValueIterationSolver::new(mdp.clone(), config.clone())?;
    let vi_policy = vi.train()?;

    println!("Running Q-learning ({} episodes)...", config.episodes);
    let env = TicTacToeEnv::seeded(config.rewards, args.seed.wrapping_add(1));
    let mut ql = QLearningSolver::new(mdp, env, config.clone())?;
    let ql_policy = ql.train()?;

    let max_value_gap = vi
        .values()
        .iter()
        .filter_map(|(state, v)| pi.value(state).map(|p| (v - p).abs()))
        .fold(0.0, f64::max);

    let agreements = vec![
        Agreement::between("policy-iteration", "value-iteration", &pi_policy, &vi_policy),
        Agreement::between("value-iteration", "q-learning", &vi_policy, &ql_policy),
    ];

    let runs = [
        ("policy-iteration", &pi_policy, pi.stats()),
        ("value-iteration", &vi_policy, vi.stats()),
        ("q-learning", &ql_policy, ql.stats()),
    ];

    println!();
    println!("{:<20} {:>8} {:>8} {:>8} {:>10}", "solver", "wins", "draws", "losses", "time (s)");
    let mut reports = Vec::with_capacity(runs.len());
    for (name, policy, stats) in runs {
        let mut env = TicTacToeEnv::seeded(config.rewards, args.seed);
        let record = env.play_policy(policy, args.games);
        println!(
            "{:<20} {:>8} {:>8} {:>8} {:>10.2}",
            name, record.wins, record.draws, record.losses, stats.elapsed_seconds
        );
        reports.push(SolveReport::new(name, &config, stats, policy).with_evaluation(record));
    }

    println!();
    println!("Max |V_pi - V_vi|: {:.3e}", max_value_gap);
    for agreement in &agreements {
        println!(
            "{} vs {}: {}/{} states agree ({:.1}%)",
            agreement.left,
            agreement.right,
            agreement.same_action,
            agreement.shared_states,
            agreement.rate() * 100.0
        );
    }

    if let Some(path) = &args.output {
        let comparison = Comparison {
            reports,
            agreements,
            max_value_gap,
        };
        std::fs::write(path, serde_json::to_string_pretty(&comparison)?)?;
        println!();
        println!("Comparison saved to {}", path.display());
    }

    Ok(())
}
