//! # MDP Solver
//!
//! Policy iteration, value iteration and Q-learning for turn-based games
//! modelled as finite Markov decision processes.
//!
//! ## Features
//!
//! - **Generic solvers**: Work with any game implementing the model traits
//! - **Synchronous sweeps**: Deterministic results independent of state order
//! - **Deterministic tie-breaks**: Equal-valued actions resolve to the first legal one
//! - **Seedable randomness**: Reproducible policy initialisation and exploration
//! - **Tic-tac-toe**: A complete game against a random or scripted opponent
//!
//! ## Quick Start
//!
//! ```
//! use mdp_solver::games::tictactoe::TicTacToeMdp;
//! use mdp_solver::mdp::{SolverConfig, ValueIterationSolver};
//!
//! let mdp = TicTacToeMdp::new(Default::default());
//! let mut solver = ValueIterationSolver::new(mdp, SolverConfig::default()).unwrap();
//! let policy = solver.train().unwrap();
//! assert!(!policy.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`mdp`]: Model traits, storage and the three solvers
//! - [`games`]: Game implementations (explicit tables, tic-tac-toe)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Solvers (Generic)                         │
//! │  PolicyIteration    ValueIteration        QLearning              │
//! │  (TransitionModel)  (TransitionModel)     (StateSpace + Env)     │
//! └──────────────────────────────────────────────────────────────────┘
//!                               │
//!                               │ implements model traits
//!                               ▼
//!              ┌────────────────┴────────────────┐
//!              │                                 │
//!              ▼                                 ▼
//!        ┌───────────┐                     ┌───────────┐
//!        │ TableMdp  │                     │ TicTacToe │
//!        └───────────┘                     └───────────┘
//! ```

#![warn(missing_docs)]

/// Markov decision process solvers.
///
/// This is the core module containing the model traits and the solvers.
pub mod mdp;

/// Game implementations module.
///
/// Contains explicit tabular MDPs and tic-tac-toe.
pub mod games;

// Re-export commonly used types at crate root for convenience
pub use mdp::{
    Environment, Policy, PolicyIterationSolver, QLearningSolver, SolveStats, SolverConfig,
    SolverError, StateSpace, TransitionModel, ValueIterationSolver,
};
