//! Benchmarks for the MDP solvers.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mdp_solver::games::tictactoe::{TicTacToeEnv, TicTacToeMdp};
use mdp_solver::mdp::{
    PolicyIterationSolver, QLearningSolver, SolverConfig, SweepMode, ValueIterationSolver,
};

fn state_enumeration_benchmark(c: &mut Criterion) {
    c.bench_function("tictactoe_state_enumeration", |b| {
        b.iter(|| TicTacToeMdp::new(black_box(Default::default())))
    });
}

fn value_sweep_benchmark(c: &mut Criterion) {
    let mdp = TicTacToeMdp::new(Default::default());
    let config = SolverConfig::default().with_sweep_mode(SweepMode::Fixed(1));
    let mut solver = ValueIterationSolver::new(mdp, config).unwrap();

    c.bench_function("tictactoe_value_sweep", |b| {
        b.iter(|| black_box(solver.sweep().unwrap()))
    });
}

fn policy_iteration_benchmark(c: &mut Criterion) {
    let mdp = TicTacToeMdp::new(Default::default());

    c.bench_function("tictactoe_policy_iteration", |b| {
        b.iter(|| {
            let config = SolverConfig::default().with_seed(42);
            let mut solver = PolicyIterationSolver::new(mdp.clone(), config).unwrap();
            solver.train().unwrap()
        })
    });
}

fn q_learning_1000_episodes_benchmark(c: &mut Criterion) {
    let mdp = TicTacToeMdp::new(Default::default());

    c.bench_function("tictactoe_q_learning_1000_episodes", |b| {
        b.iter(|| {
            let config = SolverConfig::default()
                .with_episodes(black_box(1000))
                .with_seed(42);
            let env = TicTacToeEnv::seeded(config.rewards, 7);
            let mut solver = QLearningSolver::new(mdp.clone(), env, config).unwrap();
            solver.train().unwrap()
        })
    });
}

criterion_group!(
    benches,
    state_enumeration_benchmark,
    value_sweep_benchmark,
    policy_iteration_benchmark,
    q_learning_1000_episodes_benchmark
);
criterion_main!(benches);
