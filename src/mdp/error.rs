//! Error types for the solvers.

use thiserror::Error;

use crate::mdp::config::ConfigError;

/// Errors raised while training a solver.
///
/// Most variants describe an inconsistency between the solver and the game
/// model it was given, not a recoverable runtime condition.
#[derive(Debug, Error)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum SolverError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("non-terminal state {state} has no legal actions")]
    NoLegalActions { state: String },

    #[error("state {state} is not part of the state space")]
    UnknownState { state: String },

    #[error("no q-value for action {action} in state {state}")]
    UnknownPair { state: String, action: String },

    #[error("no policy action for non-terminal state {state}")]
    MissingPolicyAction { state: String },

    #[error("policy action {action} is not legal in state {state}")]
    IllegalPolicyAction { state: String, action: String },

    #[error("environment rejected {attempts} consecutive actions in state {state}")]
    IllegalActionLimit { state: String, attempts: usize },

    #[error("values still changed by {change} after {sweeps} sweeps")]
    NotConverged { sweeps: usize, change: f64 },
}

/// Convenience type alias for Results using the solver error type.
pub type Result<T> = std::result::Result<T, SolverError>;
