//! Explicit tabular MDPs.
//!
//! [`TableMdp`] lists every transition by hand. It is small enough to solve
//! on paper, which makes it the reference game for checking the solvers
//! against analytically known values.
//!
//! ```text
//!   S --go (p=1, r=10)--> T (terminal)
//! ```
//!
//! ```
//! use mdp_solver::games::table::TableMdp;
//! use mdp_solver::mdp::{PolicyIterationSolver, SolverConfig};
//!
//! let mdp = TableMdp::new()
//!     .with_transition("S", "go", 1.0, 10.0, "T")
//!     .with_terminal("T");
//! let mut solver = PolicyIterationSolver::new(mdp, SolverConfig::exact().with_seed(1)).unwrap();
//! let policy = solver.train().unwrap();
//! assert_eq!(policy.action_for(&"S"), Some(&"go"));
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::mdp::model::{
    Action, Environment, IllegalAction, Outcome, State, StateSpace, TransitionModel,
    TransitionProb,
};

/// A finite MDP given as an explicit transition table.
#[derive(Debug, Clone)]
pub struct TableMdp<S, A> {
    /// States in the order they were first mentioned.
    order: Vec<S>,
    known: FxHashSet<S>,
    terminals: FxHashSet<S>,
    /// state -> actions in the order they were first mentioned
    actions: FxHashMap<S, Vec<A>>,
    /// (state, action) -> [(probability, reward, next state)]
    transitions: FxHashMap<(S, A), Vec<(f64, f64, S)>>,
}

impl<S: State, A: Action> Default for TableMdp<S, A> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            known: FxHashSet::default(),
            terminals: FxHashSet::default(),
            actions: FxHashMap::default(),
            transitions: FxHashMap::default(),
        }
    }
}

impl<S: State, A: Action> TableMdp<S, A> {
    /// Create an empty MDP.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: mark `state` as terminal.
    pub fn with_terminal(mut self, state: S) -> Self {
        self.add_terminal(state);
        self
    }

    /// Builder method: add one outcome of playing `action` in `state`.
    pub fn with_transition(
        mut self,
        state: S,
        action: A,
        probability: f64,
        reward: f64,
        next_state: S,
    ) -> Self {
        self.add_transition(state, action, probability, reward, next_state);
        self
    }

    /// Mark `state` as terminal.
    pub fn add_terminal(&mut self, state: S) {
        self.remember(&state);
        self.terminals.insert(state);
    }

    /// Add one outcome of playing `action` in `state`.
    ///
    /// Both states are added to the state space if new. Outcomes of the
    /// same pair accumulate; their probabilities should end up summing to 1.
    pub fn add_transition(
        &mut self,
        state: S,
        action: A,
        probability: f64,
        reward: f64,
        next_state: S,
    ) {
        self.remember(&state);
        self.remember(&next_state);

        let actions = self.actions.entry(state.clone()).or_default();
        if !actions.contains(&action) {
            actions.push(action.clone());
        }
        self.transitions
            .entry((state, action))
            .or_default()
            .push((probability, reward, next_state));
    }

    fn remember(&mut self, state: &S) {
        if self.known.insert(state.clone()) {
            self.order.push(state.clone());
        }
    }
}

impl<S: State, A: Action> StateSpace for TableMdp<S, A> {
    type State = S;
    type Action = A;

    fn states(&self) -> Vec<S> {
        self.order.clone()
    }

    fn legal_actions(&self, state: &S) -> Vec<A> {
        if self.is_terminal(state) {
            return vec![];
        }
        self.actions.get(state).cloned().unwrap_or_default()
    }

    fn is_terminal(&self, state: &S) -> bool {
        self.terminals.contains(state)
    }
}

impl<S: State, A: Action> TransitionModel for TableMdp<S, A> {
    fn transitions(&self, state: &S, action: &A) -> Vec<TransitionProb<S, A>> {
        self.transitions
            .get(&(state.clone(), action.clone()))
            .map(|outcomes| {
                outcomes
                    .iter()
                    .map(|(p, r, next)| {
                        TransitionProb::new(
                            *p,
                            Outcome::new(state.clone(), action.clone(), *r, next.clone()),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Plays a [`TableMdp`] live, sampling one outcome per step.
#[derive(Debug, Clone)]
pub struct TableEnvironment<S, A, R = StdRng> {
    mdp: TableMdp<S, A>,
    start: S,
    current: S,
    rng: R,
}

impl<S: State, A: Action> TableEnvironment<S, A, StdRng> {
    /// Create an environment with a seeded generator.
    pub fn seeded(mdp: TableMdp<S, A>, start: S, seed: u64) -> Self {
        Self::new(mdp, start, StdRng::seed_from_u64(seed))
    }
}

impl<S: State, A: Action, R: Rng> TableEnvironment<S, A, R> {
    /// Create an environment that starts every episode at `start`.
    pub fn new(mdp: TableMdp<S, A>, start: S, rng: R) -> Self {
        Self {
            mdp,
            current: start.clone(),
            start,
            rng,
        }
    }

    /// The underlying table.
    pub fn mdp(&self) -> &TableMdp<S, A> {
        &self.mdp
    }
}

impl<S: State, A: Action, R: Rng> Environment for TableEnvironment<S, A, R> {
    type State = S;
    type Action = A;

    fn reset(&mut self) -> S {
        self.current = self.start.clone();
        self.current.clone()
    }

    fn step(&mut self, action: &A) -> Result<Outcome<S, A>, IllegalAction> {
        let transitions = self.mdp.transitions(&self.current, action);
        if self.mdp.is_terminal(&self.current) || transitions.is_empty() {
            return Err(IllegalAction {
                state: format!("{:?}", self.current),
                action: format!("{:?}", action),
            });
        }

        let roll: f64 = self.rng.gen();
        let mut cumulative = 0.0;
        let mut chosen = transitions.len() - 1;
        for (i, t) in transitions.iter().enumerate() {
            cumulative += t.probability;
            if roll < cumulative {
                chosen = i;
                break;
            }
        }

        let outcome = transitions[chosen].outcome.clone();
        self.current = outcome.next_state.clone();
        Ok(outcome)
    }

    fn current_state(&self) -> S {
        self.current.clone()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn coin() -> TableMdp<&'static str, &'static str> {
        TableMdp::new()
            .with_transition("start", "flip", 0.5, 1.0, "heads")
            .with_transition("start", "flip", 0.5, -1.0, "tails")
            .with_transition("start", "quit", 1.0, 0.0, "tails")
            .with_terminal("heads")
            .with_terminal("tails")
    }

    #[test]
    fn test_states_and_actions_keep_insertion_order() {
        let mdp = coin();
        assert_eq!(mdp.states(), vec!["start", "heads", "tails"]);
        assert_eq!(mdp.legal_actions(&"start"), vec!["flip", "quit"]);
        assert!(mdp.legal_actions(&"heads").is_empty());
        assert!(mdp.is_terminal(&"tails"));
        assert!(!mdp.is_terminal(&"start"));
    }

    #[test]
    fn test_transitions_sum_to_one() {
        let mdp = coin();
        let total: f64 = mdp
            .transitions(&"start", &"flip")
            .iter()
            .map(|t| t.probability)
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(mdp.transitions(&"start", &"jump").is_empty());
    }

    #[test]
    fn test_environment_samples_and_rejects() {
        let mut env = TableEnvironment::seeded(coin(), "start", 3);
        assert_eq!(env.reset(), "start");
        assert!(env.step(&"jump").is_err());
        assert_eq!(env.current_state(), "start");

        let outcome = env.step(&"flip").unwrap();
        assert_eq!(outcome.state, "start");
        assert!(outcome.next_state == "heads" || outcome.next_state == "tails");
        assert_eq!(env.current_state(), outcome.next_state);

        // game over: nothing is legal any more
        assert!(env.step(&"flip").is_err());
    }

    #[test]
    fn test_environment_frequencies() {
        let mut env = TableEnvironment::seeded(coin(), "start", 11);
        let mut heads = 0;
        for _ in 0..2000 {
            env.reset();
            if env.step(&"flip").unwrap().next_state == "heads" {
                heads += 1;
            }
        }
        assert!(heads > 850 && heads < 1150, "heads = {}", heads);
    }
}
