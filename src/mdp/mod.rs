//! Solvers for finite Markov decision processes.
//!
//! This module provides three solvers for turn-based games modelled as an
//! MDP: the agent picks a move, the environment answers with an opponent or
//! chance move, and the agent receives a reward and the next position.
//!
//! # Solvers
//!
//! - **Policy iteration** ([`PolicyIterationSolver`]): alternates policy
//!   evaluation and greedy improvement until the policy is stable.
//! - **Value iteration** ([`ValueIterationSolver`]): applies the Bellman
//!   optimality update until values settle, then reads off a greedy policy.
//! - **Q-learning** ([`QLearningSolver`]): learns action values from play
//!   against an [`Environment`], without access to transition
//!   probabilities.
//!
//! The planning solvers need a [`TransitionModel`]. Q-learning needs only a
//! [`StateSpace`] to size its table plus an [`Environment`] to play in.
//!
//! # Example
//!
//! ```
//! use mdp_solver::games::table::TableMdp;
//! use mdp_solver::mdp::{SolverConfig, ValueIterationSolver};
//!
//! let mdp = TableMdp::new()
//!     .with_transition("start", "safe", 1.0, 1.0, "end")
//!     .with_transition("start", "bold", 0.5, 4.0, "end")
//!     .with_transition("start", "bold", 0.5, -1.0, "end")
//!     .with_terminal("end");
//!
//! let mut solver = ValueIterationSolver::new(mdp, SolverConfig::exact()).unwrap();
//! let policy = solver.train().unwrap();
//! assert_eq!(policy.action_for(&"start"), Some(&"bold"));
//! ```
//!
//! # Theory
//!
//! All three solvers target the Bellman optimality equation
//!
//! ```text
//! V*(s) = max_a Σ P(s' | s, a) · [ r + γ · V*(s') ]
//! ```
//!
//! with `V*(s) = 0` for terminal states. Sweeps are synchronous: every
//! update in a sweep reads the values from the end of the previous sweep.

pub mod bellman;
pub mod config;
pub mod error;
pub mod model;
pub mod policy_iteration;
pub mod q_learning;
pub mod storage;
pub mod value_iteration;

// Re-export main types for convenient access
pub use bellman::VALUE_TOLERANCE;
pub use config::{ConfigError, ConvergencePoint, RewardConfig, SolveStats, SolverConfig, SweepMode};
pub use error::{Result, SolverError};
pub use model::{
    Action, Environment, IllegalAction, Outcome, State, StateSpace, TransitionModel,
    TransitionProb,
};
pub use policy_iteration::PolicyIterationSolver;
pub use q_learning::{EpisodeSummary, QLearningSolver};
pub use storage::{Policy, QTable, ValueTable};
pub use value_iteration::ValueIterationSolver;
