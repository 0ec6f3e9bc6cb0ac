//! Game implementations for the solvers.
//!
//! These serve as:
//!
//! 1. **Validation**: Small tables with values known in closed form check
//!    that the solvers are correct.
//!
//! 2. **Examples**: Show how to implement the model traits for a new game.
//!
//! 3. **Benchmarks**: Provide standardized games for performance testing.
//!
//! ## Available Games
//!
//! - [`table`]: Explicit transition tables, built by hand
//! - [`tictactoe`]: Tic-tac-toe against a random or scripted opponent
//!
//! ## Adding New Games
//!
//! 1. Create a new module under `src/games/`
//! 2. Define state and action types
//! 3. Implement `StateSpace`, plus `TransitionModel` for the planning
//!    solvers or `Environment` for Q-learning
//! 4. Add tests that verify expected behavior

pub mod table;
pub mod tictactoe;
