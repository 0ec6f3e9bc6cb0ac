//! Tic-tac-toe solver binary.
//!
//! Usage:
//!   cargo run --release --bin solve_tictactoe -- <SOLVER> [OPTIONS]
//!
//! Trains one solver against the chosen opponent, plays the resulting
//! policy for a number of test games and optionally writes a JSON report.
//! Set `RUST_LOG=debug` to see per-sweep progress.

use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use mdp_solver::games::tictactoe::{
    Board, MatchRecord, Move, Opponent, PolicyOpponent, RandomOpponent, SolveReport, TicTacToeEnv,
    TicTacToeMdp,
};
use mdp_solver::mdp::{
    Policy, PolicyIterationSolver, QLearningSolver, SolveStats, SolverConfig, SweepMode,
    ValueIterationSolver,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SolverKind {
    /// Policy iteration
    Policy,
    /// Value iteration
    Value,
    /// Q-learning against the live game
    QLearning,
}

impl SolverKind {
    fn name(self) -> &'static str {
        match self {
            SolverKind::Policy => "policy-iteration",
            SolverKind::Value => "value-iteration",
            SolverKind::QLearning => "q-learning",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OpponentKind {
    /// Uniformly random replies
    Random,
    /// Always the lowest free square
    FirstFree,
}

#[derive(Parser, Debug)]
#[command(about = "Solve tic-tac-toe against a random opponent", allow_negative_numbers = true)]
struct Args {
    /// Solver to train
    #[arg(value_enum)]
    solver: SolverKind,

    /// Configuration JSON file; flags below override its fields
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Discount factor
    #[arg(long)]
    discount: Option<f64>,

    /// Convergence threshold
    #[arg(long)]
    delta: Option<f64>,

    /// Run exactly this many value-iteration sweeps
    #[arg(long)]
    sweeps: Option<usize>,

    /// Number of Q-learning episodes
    #[arg(long, short = 'e')]
    episodes: Option<u64>,

    /// Q-learning rate
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Exploration probability
    #[arg(long)]
    exploration: Option<f64>,

    /// Random seed for reproducibility
    #[arg(long, short = 's')]
    seed: Option<u64>,

    /// Player behind O
    #[arg(long, value_enum, default_value_t = OpponentKind::Random)]
    opponent: OpponentKind,

    /// Let the opponent open every game
    #[arg(long)]
    opponent_starts: bool,

    /// Test games to play with the trained policy
    #[arg(long, short = 'g', default_value_t = 1000)]
    games: usize,

    /// Output file for the JSON report
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

impl Args {
    fn solver_config(&self) -> Result<SolverConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => SolverConfig::from_json_file(path)?,
            None => SolverConfig::default(),
        };
        if let Some(discount) = self.discount {
            config = config.with_discount(discount);
        }
        if let Some(delta) = self.delta {
            config = config.with_delta(delta);
        }
        if let Some(sweeps) = self.sweeps {
            config = config.with_sweep_mode(SweepMode::Fixed(sweeps));
        }
        if let Some(episodes) = self.episodes {
            config = config.with_episodes(episodes);
        }
        if let Some(rate) = self.learning_rate {
            config = config.with_learning_rate(rate);
        }
        if let Some(exploration) = self.exploration {
            config = config.with_exploration(exploration);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config.validate()?;
        Ok(config)
    }
}

fn training_progress(episodes: u64) -> Result<ProgressBar, Box<dyn Error>> {
    let pb = ProgressBar::new(episodes);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

fn train<O: Opponent + Clone>(
    kind: SolverKind,
    config: &SolverConfig,
    opponent: &O,
    opponent_starts: bool,
) -> Result<(Policy<Board, Move>, SolveStats), Box<dyn Error>> {
    let mdp = TicTacToeMdp::with_opponent(config.rewards, opponent.clone(), opponent_starts);

    match kind {
        SolverKind::Policy => {
            let mut solver = PolicyIterationSolver::new(mdp, config.clone())?;
            let policy = solver.train()?;
            Ok((policy, solver.stats().clone()))
        }
        SolverKind::Value => {
            let mut solver = ValueIterationSolver::new(mdp, config.clone())?;
            let policy = solver.train()?;
            Ok((policy, solver.stats().clone()))
        }
        SolverKind::QLearning => {
            let env_seed = config.seed.map_or(0, |s| s.wrapping_add(1));
            let env = TicTacToeEnv::seeded(config.rewards, env_seed)
                .with_opponent(opponent.clone())
                .with_opponent_start(opponent_starts);
            let mut solver = QLearningSolver::new(mdp, env, config.clone())?;

            let progress = training_progress(config.episodes)?;
            let interval = (config.episodes / 100).max(1);
            let policy = solver.train_with_callback(interval, |stats| {
                progress.set_position(stats.episodes);
                progress.set_message(format!("{} steps", stats.steps));
            })?;
            progress.finish_with_message("done");
            Ok((policy, solver.stats().clone()))
        }
    }
}

/// Train, then play test games against the same opponent.
fn run<O: Opponent + Clone>(
    args: &Args,
    config: &SolverConfig,
    opponent: O,
) -> Result<(Policy<Board, Move>, SolveStats, Option<MatchRecord>), Box<dyn Error>> {
    let (policy, stats) = train(args.solver, config, &opponent, args.opponent_starts)?;
    if args.games == 0 {
        return Ok((policy, stats, None));
    }
    let mut env = TicTacToeEnv::seeded(config.rewards, config.seed.unwrap_or(0))
        .with_opponent(opponent)
        .with_opponent_start(args.opponent_starts);
    let record = env.play_policy(&policy, args.games);
    Ok((policy, stats, Some(record)))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.solver_config()?;

    println!("=================================================");
    println!("  Tic-Tac-Toe Solver");
    println!("=================================================");
    println!();
    println!("Solver: {}", args.solver.name());
    println!("Discount: {}", config.discount);
    match args.solver {
        SolverKind::QLearning => {
            println!("Episodes: {}", config.episodes);
            println!("Learning rate: {}", config.learning_rate);
            println!("Exploration: {}", config.exploration);
        }
        _ => println!("Delta: {}", config.delta),
    }
    if let Some(seed) = config.seed {
        println!("Seed: {}", seed);
    }
    println!("Opponent: {:?}", args.opponent);
    println!(
        "First move: {}",
        if args.opponent_starts { "opponent" } else { "agent" }
    );
    println!();

    let start_time = Instant::now();
    let (policy, stats, evaluation) = match args.opponent {
        OpponentKind::Random => run(&args, &config, RandomOpponent)?,
        OpponentKind::FirstFree => run(&args, &config, PolicyOpponent::default())?,
    };

    println!();
    println!("Training complete!");
    println!("Total time: {:.2}s", start_time.elapsed().as_secs_f64());
    println!("Policy size: {}", policy.len());
    if let Some(mv) = policy.action_for(&Board::default()) {
        println!("Opening move: {}", mv);
    }

    let mut report = SolveReport::new(args.solver.name(), &config, &stats, &policy);
    if let Some(record) = evaluation {
        println!();
        println!("=== {} test games vs {:?} ===", record.games(), args.opponent);
        println!("  Wins:   {}", record.wins);
        println!("  Draws:  {}", record.draws);
        println!("  Losses: {}", record.losses);
        println!("  Not lost: {:.1}%", record.non_loss_rate() * 100.0);
        report = report.with_evaluation(record);
    }

    if let Some(path) = &args.output {
        println!();
        println!("Exporting report to {}...", path.display());
        report.save_json(path)?;
    }

    println!("Done!");
    Ok(())
}
