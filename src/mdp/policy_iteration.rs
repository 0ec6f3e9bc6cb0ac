//! Policy iteration.
//!
//! Alternates two steps until the policy stops changing:
//!
//! 1. **Evaluation**: sweep `V(s) = Σ P · [r + γ·V(s')]` under the current
//!    policy until the largest change in a sweep is at most δ.
//! 2. **Improvement**: make every state greedy with respect to `V`.
//!
//! Termination needs both notions of convergence at once: the values of
//! the final policy are converged, and improving it is a no-op.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::mdp::bellman;
use crate::mdp::config::{SolveStats, SolverConfig};
use crate::mdp::error::{Result, SolverError};
use crate::mdp::model::{StateSpace, TransitionModel};
use crate::mdp::storage::{Policy, ValueTable};

/// Policy iteration over a [`TransitionModel`].
///
/// # Example
/// ```
/// use mdp_solver::games::table::TableMdp;
/// use mdp_solver::mdp::{PolicyIterationSolver, SolverConfig};
///
/// let mdp = TableMdp::new()
///     .with_transition("S", "go", 1.0, 10.0, "T")
///     .with_terminal("T");
/// let mut solver = PolicyIterationSolver::new(mdp, SolverConfig::exact()).unwrap();
/// solver.train().unwrap();
/// assert_eq!(solver.value(&"S"), Some(10.0));
/// ```
pub struct PolicyIterationSolver<M: TransitionModel, R = StdRng> {
    /// The model being solved.
    model: M,

    /// Configuration for the solver.
    config: SolverConfig,

    /// Values of the current policy.
    values: ValueTable<M::State>,

    /// Working policy, compared by value across improvement steps.
    current: FxHashMap<M::State, M::Action>,

    /// Snapshot handed out by the last `train()`.
    policy: Option<Policy<M::State, M::Action>>,

    /// Statistics tracking.
    stats: SolveStats,

    /// Random number generator, used for the initial policy only.
    rng: R,
}

impl<M: TransitionModel> PolicyIterationSolver<M, StdRng> {
    /// Create a new solver, seeding its generator from `config.seed`.
    pub fn new(model: M, config: SolverConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(model, config, rng)
    }
}

impl<M: TransitionModel, R: Rng> PolicyIterationSolver<M, R> {
    /// Create a new solver that draws from the given generator.
    ///
    /// Every state of the model starts at value 0.0 and no policy is set.
    pub fn with_rng(model: M, config: SolverConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let values = ValueTable::new(model.states());

        Ok(Self {
            model,
            config,
            values,
            current: FxHashMap::default(),
            policy: None,
            stats: SolveStats::new(),
            rng,
        })
    }

    /// Pick one legal action uniformly at random for every non-terminal state.
    ///
    /// Terminal states get no entry. Replaces any existing working policy.
    pub fn init_random_policy(&mut self) -> Result<()> {
        self.current.clear();
        for state in self.values.states() {
            if self.model.is_terminal(state) {
                continue;
            }
            let mut actions = bellman::legal_actions(&self.model, state)?;
            let pick = self.rng.gen_range(0..actions.len());
            self.current.insert(state.clone(), actions.swap_remove(pick));
        }
        Ok(())
    }

    /// Start from `policy` instead of a random policy.
    ///
    /// Every non-terminal state of the model needs an entry, and the entry
    /// must be one of its legal actions. Entries for other states are
    /// ignored. On error the working policy is left as it was.
    pub fn set_policy(&mut self, policy: &Policy<M::State, M::Action>) -> Result<()> {
        let mut current = FxHashMap::with_capacity_and_hasher(policy.len(), Default::default());
        for state in self.values.states() {
            if self.model.is_terminal(state) {
                continue;
            }
            let action = policy.action_for(state).ok_or_else(|| {
                SolverError::MissingPolicyAction {
                    state: self.model.state_description(state),
                }
            })?;
            if !bellman::legal_actions(&self.model, state)?.contains(action) {
                return Err(SolverError::IllegalPolicyAction {
                    state: self.model.state_description(state),
                    action: format!("{:?}", action),
                });
            }
            current.insert(state.clone(), action.clone());
        }
        self.current = current;
        Ok(())
    }

    /// Sweep the current policy's values until they change by at most `delta`.
    ///
    /// Each sweep reads successor values from the table as it was before
    /// the sweep and writes into a fresh copy, so the result does not depend
    /// on state order. Terminal states are held at 0.0.
    ///
    /// # Returns
    /// The number of sweeps performed.
    pub fn evaluate_policy(&mut self, delta: f64) -> Result<usize> {
        let discount = self.config.discount;
        let mut sweeps = 0;

        loop {
            let mut next = self.values.clone();
            for state in self.values.states() {
                let value = if self.model.is_terminal(state) {
                    0.0
                } else {
                    let action = self.current.get(state).ok_or_else(|| {
                        SolverError::MissingPolicyAction {
                            state: self.model.state_description(state),
                        }
                    })?;
                    bellman::q_value(&self.model, &self.values, discount, state, action)?
                };
                next.set(state, value);
            }

            let change = next.max_abs_diff(&self.values);
            self.values = next;
            self.stats.record_sweep(change);
            sweeps += 1;
            log::debug!("{:<32}{:<16}{:.6e}", "evaluation sweep", sweeps, change);

            if change <= delta {
                return Ok(sweeps);
            }
            if let Some(limit) = self.config.max_sweeps {
                if sweeps >= limit {
                    log::warn!("policy evaluation stopped after {} sweeps", sweeps);
                    return Err(SolverError::NotConverged { sweeps, change });
                }
            }
        }
    }

    /// Make the working policy greedy with respect to the current values.
    ///
    /// Ties go to the first legal action with the best value.
    ///
    /// # Returns
    /// `true` if the action changed at any state, `false` if the policy was
    /// already greedy.
    pub fn improve_policy(&mut self) -> Result<bool> {
        let discount = self.config.discount;
        let mut improved =
            FxHashMap::with_capacity_and_hasher(self.current.len(), Default::default());
        let mut changed = 0usize;

        for state in self.values.states() {
            if self.model.is_terminal(state) {
                continue;
            }
            let (action, _) = bellman::greedy_action(&self.model, &self.values, discount, state)?;
            if self.current.get(state) != Some(&action) {
                changed += 1;
            }
            improved.insert(state.clone(), action);
        }

        self.current = improved;
        self.stats.improvements += 1;
        log::debug!("{:<32}{:<16}{}", "policy improvement", self.stats.improvements, changed);

        Ok(changed > 0)
    }

    /// Run policy iteration to convergence and return the resulting policy.
    ///
    /// Starts from a random policy unless one was set with
    /// [`set_policy`](Self::set_policy) or kept from an earlier run.
    pub fn train(&mut self) -> Result<Policy<M::State, M::Action>> {
        let start_time = Instant::now();
        log::info!("{:<32}{:<16}", "policy iteration", self.values.len());

        if self.current.is_empty() {
            self.init_random_policy()?;
        }

        let delta = self.config.delta;
        self.evaluate_policy(delta)?;
        while self.improve_policy()? {
            self.evaluate_policy(delta)?;
        }

        let policy = Policy::from(self.current.clone());
        self.stats.states = self.values.len();
        self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        log::info!(
            "policy iteration converged: {} improvements, {} sweeps, {:.2}s",
            self.stats.improvements,
            self.stats.sweeps,
            self.stats.elapsed_seconds
        );

        self.policy = Some(policy.clone());
        Ok(policy)
    }

    /// Value of a state under the current policy.
    pub fn value(&self, state: &M::State) -> Option<f64> {
        self.values.get(state)
    }

    /// The value table of the current policy.
    pub fn values(&self) -> &ValueTable<M::State> {
        &self.values
    }

    /// The working policy's action for `state`.
    pub fn current_action(&self, state: &M::State) -> Option<&M::Action> {
        self.current.get(state)
    }

    /// The policy returned by the last `train()`, if any.
    pub fn policy(&self) -> Option<&Policy<M::State, M::Action>> {
        self.policy.as_ref()
    }

    /// Get current statistics.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// Get reference to the model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}
