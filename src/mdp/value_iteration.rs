//! Value iteration.
//!
//! Applies the Bellman optimality update to every non-terminal state,
//!
//! ```text
//! V(s) ← max_a Σ P(s' | s, a) · [ r + γ · V(s') ]
//! ```
//!
//! then reads a greedy policy off the converged values. No policy is kept
//! while iterating.
//!
//! The stopping rule is [`SweepMode`]: sweep until the largest change is at
//! most δ (the default), or run a fixed number of sweeps.

use std::time::Instant;

use crate::mdp::bellman;
use crate::mdp::config::{SolveStats, SolverConfig, SweepMode};
use crate::mdp::error::{Result, SolverError};
use crate::mdp::model::{StateSpace, TransitionModel};
use crate::mdp::storage::{Policy, ValueTable};

/// Value iteration over a [`TransitionModel`].
pub struct ValueIterationSolver<M: TransitionModel> {
    /// The model being solved.
    model: M,

    /// Configuration for the solver.
    config: SolverConfig,

    /// Current value estimates.
    values: ValueTable<M::State>,

    /// Snapshot handed out by the last `train()`.
    policy: Option<Policy<M::State, M::Action>>,

    /// Statistics tracking.
    stats: SolveStats,
}

impl<M: TransitionModel> ValueIterationSolver<M> {
    /// Create a new solver with every state at value 0.0.
    pub fn new(model: M, config: SolverConfig) -> Result<Self> {
        config.validate()?;
        let values = ValueTable::new(model.states());

        Ok(Self {
            model,
            config,
            values,
            policy: None,
            stats: SolveStats::new(),
        })
    }

    /// Run one synchronous Bellman optimality sweep.
    ///
    /// # Returns
    /// The largest absolute value change over all states.
    pub fn sweep(&mut self) -> Result<f64> {
        let discount = self.config.discount;
        let mut next = self.values.clone();

        for state in self.values.states() {
            let value = if self.model.is_terminal(state) {
                0.0
            } else {
                bellman::greedy_action(&self.model, &self.values, discount, state)?.1
            };
            next.set(state, value);
        }

        let change = next.max_abs_diff(&self.values);
        self.values = next;
        self.stats.record_sweep(change);
        log::debug!("{:<32}{:<16}{:.6e}", "value sweep", self.stats.sweeps, change);
        Ok(change)
    }

    /// Sweep according to the configured [`SweepMode`].
    ///
    /// # Returns
    /// The number of sweeps performed.
    pub fn iterate(&mut self) -> Result<usize> {
        match self.config.sweep_mode {
            SweepMode::Fixed(k) => {
                for _ in 0..k {
                    self.sweep()?;
                }
                Ok(k)
            }
            SweepMode::UntilConverged => {
                let mut sweeps = 0;
                loop {
                    let change = self.sweep()?;
                    sweeps += 1;
                    if change <= self.config.delta {
                        return Ok(sweeps);
                    }
                    if let Some(limit) = self.config.max_sweeps {
                        if sweeps >= limit {
                            log::warn!("value iteration stopped after {} sweeps", sweeps);
                            return Err(SolverError::NotConverged { sweeps, change });
                        }
                    }
                }
            }
        }
    }

    /// Build the greedy policy for the current values.
    ///
    /// The argmax is recomputed per state; ties go to the first legal
    /// action. Terminal states get no entry.
    pub fn extract_policy(&self) -> Result<Policy<M::State, M::Action>> {
        let discount = self.config.discount;
        let mut entries = Vec::with_capacity(self.values.len());

        for state in self.values.states() {
            if self.model.is_terminal(state) {
                continue;
            }
            let (action, _) = bellman::greedy_action(&self.model, &self.values, discount, state)?;
            entries.push((state.clone(), action));
        }

        Ok(Policy::new(entries))
    }

    /// Iterate, then extract and store the greedy policy.
    pub fn train(&mut self) -> Result<Policy<M::State, M::Action>> {
        let start_time = Instant::now();
        log::info!("{:<32}{:<16}", "value iteration", self.values.len());

        let sweeps = self.iterate()?;
        let policy = self.extract_policy()?;

        self.stats.states = self.values.len();
        self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        log::info!(
            "value iteration finished: {} sweeps, last change {:.3e}, {:.2}s",
            sweeps,
            self.stats.last_delta.unwrap_or(0.0),
            self.stats.elapsed_seconds
        );

        self.policy = Some(policy.clone());
        Ok(policy)
    }

    /// Current value estimate for a state.
    pub fn value(&self, state: &M::State) -> Option<f64> {
        self.values.get(state)
    }

    /// The value table.
    pub fn values(&self) -> &ValueTable<M::State> {
        &self.values
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::table::{fixtures, TableMdp};
    use crate::mdp::PolicyIterationSolver;

    #[test]
    fn test_one_step_scenario() {
        let mut solver = ValueIterationSolver::new(fixtures::one_step(), SolverConfig::exact()).unwrap();
        let policy = solver.train().unwrap();

        assert_eq!(solver.value(&"S"), Some(10.0));
        assert_eq!(solver.value(&"T"), Some(0.0));
        assert_eq!(policy.action_for(&"S"), Some(&"go"));
        assert_eq!(policy.action_for(&"T"), None);
    }

    #[test]
    fn test_fixed_sweeps_are_synchronous() {
        let mdp = TableMdp::new()
            .with_transition("b", "go", 1.0, 10.0, "t")
            .with_transition("a", "go", 1.0, 0.0, "b")
            .with_terminal("t");

        let one = SolverConfig::default().with_sweep_mode(SweepMode::Fixed(1));
        let mut solver = ValueIterationSolver::new(mdp.clone(), one).unwrap();
        assert_eq!(solver.iterate().unwrap(), 1);
        assert_eq!(solver.value(&"a"), Some(0.0));
        assert_eq!(solver.value(&"b"), Some(10.0));

        let two = SolverConfig::default().with_sweep_mode(SweepMode::Fixed(2));
        let mut solver = ValueIterationSolver::new(mdp, two).unwrap();
        solver.iterate().unwrap();
        assert!((solver.value(&"a").unwrap() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_optimality_deltas_do_not_increase() {
        let mut solver =
            ValueIterationSolver::new(fixtures::loop_with_exits(), SolverConfig::exact()).unwrap();
        solver.iterate().unwrap();

        let deltas: Vec<f64> = solver.stats().delta_history.iter().map(|p| p.max_delta).collect();
        for pair in deltas.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-12, "{:?}", deltas);
        }
        assert!(*deltas.last().unwrap() <= 1e-9);
    }

    #[test]
    fn test_matches_policy_iteration() {
        let config = SolverConfig::exact().with_seed(5);
        let mut vi = ValueIterationSolver::new(fixtures::loop_with_exits(), config.clone()).unwrap();
        let mut pi = PolicyIterationSolver::new(fixtures::loop_with_exits(), config).unwrap();
        let vi_policy = vi.train().unwrap();
        let pi_policy = pi.train().unwrap();

        for (state, value) in vi.values().iter() {
            assert!((value - pi.value(state).unwrap()).abs() < 1e-6, "{}", state);
        }
        assert_eq!(vi_policy, pi_policy);
    }

    #[test]
    fn test_two_by_two_values() {
        let mut solver = ValueIterationSolver::new(fixtures::two_by_two(), SolverConfig::exact()).unwrap();
        let policy = solver.train().unwrap();
        assert!((solver.value(&"A").unwrap() - 4.5).abs() < 1e-12);
        assert!((solver.value(&"B").unwrap() - 5.0).abs() < 1e-12);
        assert_eq!(policy.action_for(&"A"), Some(&"via_b"));
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let mdp = TableMdp::new()
            .with_transition("s", "left", 1.0, 1.0, "t")
            .with_transition("s", "right", 0.5, 1.0, "t")
            .with_transition("s", "right", 0.5, 1.0, "t")
            .with_terminal("t");
        let mut solver = ValueIterationSolver::new(mdp, SolverConfig::exact()).unwrap();
        solver.iterate().unwrap();

        for _ in 0..20 {
            let policy = solver.extract_policy().unwrap();
            assert_eq!(policy.action_for(&"s"), Some(&"left"));
        }
    }

    #[test]
    fn test_sweep_cap_reports_non_convergence() {
        let config = SolverConfig::default()
            .with_discount(0.99)
            .with_delta(1e-12)
            .with_max_sweeps(2);
        let mut solver = ValueIterationSolver::new(fixtures::loop_with_exits(), config).unwrap();
        assert!(matches!(
            solver.iterate(),
            Err(SolverError::NotConverged { sweeps: 2, .. })
        ));
    }

    #[test]
    fn test_dead_end_state_is_a_configuration_error() {
        let mdp = TableMdp::new().with_transition("s", "go", 1.0, 1.0, "stuck");
        let mut solver = ValueIterationSolver::new(mdp, SolverConfig::exact()).unwrap();
        assert!(matches!(
            solver.train(),
            Err(SolverError::NoLegalActions { .. })
        ));
    }
}
