//! Model traits consumed by the solvers.
//!
//! The solvers never build states or moves themselves. They only talk to a
//! game through these traits, which keeps the algorithms independent of
//! any particular board or reward scheme.

use std::fmt::Debug;
use std::hash::Hash;

use thiserror::Error;

/// Trait for game positions.
///
/// A state must capture everything that distinguishes two positions,
/// including whose turn it is. Two states compare equal iff they describe
/// the same position and turn.
pub trait State: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> State for T {}

/// Trait for moves.
///
/// An action is only meaningful relative to the state it was listed for.
pub trait Action: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Action for T {}

/// One observed step: `(s, a, r, s')`.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<S, A> {
    /// The state the action was taken in.
    pub state: S,
    /// The action taken.
    pub action: A,
    /// Immediate reward received for the step.
    pub reward: f64,
    /// The resulting state, after any opponent or chance move.
    pub next_state: S,
}

impl<S, A> Outcome<S, A> {
    /// Create a new outcome.
    pub fn new(state: S, action: A, reward: f64, next_state: S) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
        }
    }
}

/// An outcome together with the probability of it happening.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionProb<S, A> {
    /// Probability in `[0, 1]`.
    pub probability: f64,
    /// What happens if this branch is taken.
    pub outcome: Outcome<S, A>,
}

impl<S, A> TransitionProb<S, A> {
    /// Create a new weighted outcome.
    pub fn new(probability: f64, outcome: Outcome<S, A>) -> Self {
        Self {
            probability,
            outcome,
        }
    }
}

/// Enumerates the reachable state space and the legal moves in it.
///
/// # Example
/// ```ignore
/// struct MyGame;
///
/// impl StateSpace for MyGame {
///     type State = MyBoard;
///     type Action = MyMove;
///
///     // ... implement required methods
/// }
/// ```
pub trait StateSpace {
    /// The position type.
    type State: State;

    /// The move type.
    type Action: Action;

    /// Every reachable state, in a fixed order.
    ///
    /// The order is used for sweeps and policy extraction, so it must not
    /// change between calls.
    fn states(&self) -> Vec<Self::State>;

    /// Legal actions at `state`, in a fixed order.
    ///
    /// Returns an empty vector for terminal states. The order decides
    /// tie-breaks: among equally valued actions the first one wins.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Check if the game is over at `state`.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Get a human-readable description of a state.
    ///
    /// Used in error messages and logs.
    fn state_description(&self, state: &Self::State) -> String {
        format!("{:?}", state)
    }
}

/// Full probabilistic model of the game, used by the planning solvers.
pub trait TransitionModel: StateSpace {
    /// Every outcome of playing `action` in `state`.
    ///
    /// Probabilities must sum to 1.0. A model that violates this is
    /// defective; the solvers check it with `debug_assert!` only.
    fn transitions(
        &self,
        state: &Self::State,
        action: &Self::Action,
    ) -> Vec<TransitionProb<Self::State, Self::Action>>;
}

/// Rejection returned by an [`Environment`] for a move it cannot play.
#[derive(Debug, Clone, Error)]
#[error("illegal action {action} in state {state}")]
pub struct IllegalAction {
    /// Description of the state the move was attempted in.
    pub state: String,
    /// Description of the rejected move.
    pub action: String,
}

/// A live game the Q-learning solver plays against.
///
/// The environment applies opponent and chance moves internally, so a
/// single `step` advances the game to the agent's next decision point or
/// to the end of the game.
pub trait Environment {
    /// The position type.
    type State: State;

    /// The move type.
    type Action: Action;

    /// Start a new episode and return its first state.
    fn reset(&mut self) -> Self::State;

    /// Play `action` from the current state.
    ///
    /// On rejection the environment must stay in the state it was in.
    fn step(
        &mut self,
        action: &Self::Action,
    ) -> std::result::Result<Outcome<Self::State, Self::Action>, IllegalAction>;

    /// The state the environment is currently in.
    fn current_state(&self) -> Self::State;
}
