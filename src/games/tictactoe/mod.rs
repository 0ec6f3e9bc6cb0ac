//! Tic-tac-toe against a fixed opponent.
//!
//! The agent always plays X. [`TicTacToeMdp`] gives the full transition
//! model for the planning solvers; [`TicTacToeEnv`] plays games live for
//! Q-learning. O is played by an [`Opponent`]: [`RandomOpponent`] by
//! default, or a [`PolicyOpponent`] that follows a fixed policy. Model and
//! environment share one reward scheme:
//!
//! | result after the step | reward |
//! |---|---|
//! | X has three in a row | `win` |
//! | O has three in a row | `lose` |
//! | board full, no line | `draw` |
//! | game goes on | `living` |

pub mod board;
pub mod env;
pub mod mdp;
pub mod opponent;
pub mod output;

pub use board::{Board, Cell, Move, Player, WINNING_LINES};
pub use env::{MatchRecord, TicTacToeEnv};
pub use mdp::TicTacToeMdp;
pub use opponent::{Opponent, PolicyOpponent, RandomOpponent};
pub use output::SolveReport;
