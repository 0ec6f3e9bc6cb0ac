//! Q-learning.
//!
//! Learns action values from play against an [`Environment`] without ever
//! seeing transition probabilities. Every accepted step applies
//!
//! ```text
//! Q(s, a) ← (1 − α) · Q(s, a) + α · (r + γ · max_a' Q(s', a'))
//! ```
//!
//! where the max is 0 when `s'` is terminal. Actions are chosen ε-greedily:
//! a uniformly random legal action with probability ε, otherwise the first
//! action with the highest Q-value.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::mdp::bellman;
use crate::mdp::config::{SolveStats, SolverConfig};
use crate::mdp::error::{Result, SolverError};
use crate::mdp::model::{Environment, StateSpace};
use crate::mdp::storage::{Policy, QTable};

/// What happened during one episode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeSummary {
    /// Accepted environment steps.
    pub steps: u64,
    /// Actions the environment rejected.
    pub illegal_actions: u64,
    /// Undiscounted sum of rewards.
    pub total_reward: f64,
}

/// Q-learning against a live environment.
///
/// The state space provider is used to build the Q-table and to extract
/// the final policy. All experience comes from the environment.
pub struct QLearningSolver<P: StateSpace, E, R = StdRng> {
    /// State space the Q-table covers.
    space: P,

    /// Environment episodes are played in.
    env: E,

    /// Configuration for the solver.
    config: SolverConfig,

    /// Learned action values.
    q_table: QTable<P::State, P::Action>,

    /// Current exploration rate ε.
    exploration: f64,

    /// Snapshot handed out by the last `train()`.
    policy: Option<Policy<P::State, P::Action>>,

    /// Statistics tracking.
    stats: SolveStats,

    /// Random number generator for exploration.
    rng: R,
}

impl<P, E> QLearningSolver<P, E, StdRng>
where
    P: StateSpace,
    E: Environment<State = P::State, Action = P::Action>,
{
    /// Create a new solver, seeding its generator from `config.seed`.
    pub fn new(space: P, env: E, config: SolverConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(space, env, config, rng)
    }
}

impl<P, E, R> QLearningSolver<P, E, R>
where
    P: StateSpace,
    E: Environment<State = P::State, Action = P::Action>,
    R: Rng,
{
    /// Create a new solver that explores with the given generator.
    ///
    /// The Q-table is initialised immediately. The discount must be below 1.
    pub fn with_rng(space: P, env: E, config: SolverConfig, rng: R) -> Result<Self> {
        config.validate_for_learning()?;

        let mut solver = Self {
            space,
            env,
            exploration: config.exploration,
            config,
            q_table: QTable::new(),
            policy: None,
            stats: SolveStats::new(),
            rng,
        };
        solver.init_q_table()?;
        Ok(solver)
    }

    /// Set Q(s, a) = 0.0 for every legal pair of every non-terminal state.
    pub fn init_q_table(&mut self) -> Result<()> {
        self.q_table.clear();
        for state in self.space.states() {
            if self.space.is_terminal(&state) {
                continue;
            }
            let actions = bellman::legal_actions(&self.space, &state)?;
            self.q_table.insert_state(state, actions);
        }
        log::debug!("{:<32}{:<16}", "q-table pairs", self.q_table.len());
        Ok(())
    }

    /// Choose an action for `state` ε-greedily.
    pub fn select_action(&mut self, state: &P::State) -> Result<P::Action> {
        let row = self
            .q_table
            .row(state)
            .ok_or_else(|| SolverError::UnknownState {
                state: self.space.state_description(state),
            })?;
        if row.is_empty() {
            return Err(SolverError::NoLegalActions {
                state: self.space.state_description(state),
            });
        }

        if self.rng.gen::<f64>() < self.exploration {
            // Explore: choose random action
            let pick = self.rng.gen_range(0..row.len());
            return Ok(row[pick].0.clone());
        }

        bellman::argmax(row.iter().map(|(a, q)| (a, *q)))
            .map(|(a, _)| a.clone())
            .ok_or_else(|| SolverError::NoLegalActions {
                state: self.space.state_description(state),
            })
    }

    /// Play one episode from `reset()` to a terminal state, learning as it goes.
    ///
    /// A rejected action leaves the Q-table untouched and the step is
    /// retried from the same state. The `max_illegal_retries`-th rejection
    /// in a row fails the episode.
    pub fn run_episode(&mut self) -> Result<EpisodeSummary> {
        let alpha = self.config.learning_rate;
        let discount = self.config.discount;
        let mut summary = EpisodeSummary::default();
        let mut rejected = 0usize;
        let mut state = self.env.reset();

        while !self.space.is_terminal(&state) {
            let action = self.select_action(&state)?;
            let outcome = match self.env.step(&action) {
                Ok(outcome) => outcome,
                Err(illegal) => {
                    rejected += 1;
                    summary.illegal_actions += 1;
                    self.stats.illegal_actions += 1;
                    log::warn!("{}", illegal);
                    if rejected >= self.config.max_illegal_retries {
                        return Err(SolverError::IllegalActionLimit {
                            state: self.space.state_description(&state),
                            attempts: rejected,
                        });
                    }
                    continue;
                }
            };
            rejected = 0;

            let target = if self.space.is_terminal(&outcome.next_state) {
                outcome.reward
            } else {
                outcome.reward + discount * self.max_q(&outcome.next_state)?
            };

            let old = self
                .q_table
                .get(&outcome.state, &outcome.action)
                .ok_or_else(|| SolverError::UnknownPair {
                    state: self.space.state_description(&outcome.state),
                    action: format!("{:?}", outcome.action),
                })?;
            self.q_table.set(
                &outcome.state,
                &outcome.action,
                (1.0 - alpha) * old + alpha * target,
            );

            summary.steps += 1;
            summary.total_reward += outcome.reward;
            state = outcome.next_state;
        }

        self.stats.episodes += 1;
        self.stats.steps += summary.steps;
        if let Some(decay) = self.config.exploration_decay {
            self.exploration = (self.exploration * decay).max(self.config.min_exploration);
        }

        Ok(summary)
    }

    /// Train for `config.episodes` episodes and return the greedy policy.
    pub fn train(&mut self) -> Result<Policy<P::State, P::Action>> {
        self.train_with_callback(0, |_| {})
    }

    /// Train with a callback for progress tracking.
    ///
    /// # Arguments
    /// * `callback_interval` - How often to call the callback, in episodes
    ///   (0 = never)
    /// * `callback` - Function called every `callback_interval` episodes
    pub fn train_with_callback<F>(
        &mut self,
        callback_interval: u64,
        mut callback: F,
    ) -> Result<Policy<P::State, P::Action>>
    where
        F: FnMut(&SolveStats),
    {
        let start_time = Instant::now();
        let episodes = self.config.episodes;
        log::info!("{:<32}{:<16}", "q-learning episodes", episodes);

        for i in 0..episodes {
            self.run_episode()?;

            if callback_interval > 0 && (i + 1) % callback_interval == 0 {
                self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
                log::debug!(
                    "{:<32}{:<16}{:.4}",
                    "episodes / exploration",
                    self.stats.episodes,
                    self.exploration
                );
                callback(&self.stats);
            }
        }

        let policy = self.extract_policy()?;
        self.stats.states = self.q_table.states().len();
        self.stats.elapsed_seconds = start_time.elapsed().as_secs_f64();
        log::info!(
            "q-learning finished: {} episodes, {} steps, {} rejected actions, {:.2}s",
            self.stats.episodes,
            self.stats.steps,
            self.stats.illegal_actions,
            self.stats.elapsed_seconds
        );

        self.policy = Some(policy.clone());
        Ok(policy)
    }

    /// Greedy policy over every non-terminal state of the state space.
    ///
    /// Ties go to the first legal action.
    pub fn extract_policy(&self) -> Result<Policy<P::State, P::Action>> {
        let mut entries = Vec::with_capacity(self.q_table.states().len());

        for state in self.space.states() {
            if self.space.is_terminal(&state) {
                continue;
            }
            let action = match self.q_table.best(&state) {
                Some((action, _)) => action.clone(),
                None => {
                    return Err(SolverError::UnknownState {
                        state: self.space.state_description(&state),
                    })
                }
            };
            entries.push((state, action));
        }

        Ok(Policy::new(entries))
    }

    fn max_q(&self, state: &P::State) -> Result<f64> {
        match self.q_table.row(state) {
            Some(_) => Ok(self.q_table.max_value(state)),
            None => Err(SolverError::UnknownState {
                state: self.space.state_description(state),
            }),
        }
    }

    /// Get Q(s, a).
    pub fn q_value(&self, state: &P::State, action: &P::Action) -> Option<f64> {
        self.q_table.get(state, action)
    }

    /// The learned Q-table.
    pub fn q_table(&self) -> &QTable<P::State, P::Action> {
        &self.q_table
    }

    /// Current exploration rate.
    pub fn exploration(&self) -> f64 {
        self.exploration
    }

    /// The policy returned by the last `train()`, if any.
    pub fn policy(&self) -> Option<&Policy<P::State, P::Action>> {
        self.policy.as_ref()
    }

    /// Get current statistics.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// Get reference to the environment.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Get reference to the state space.
    pub fn space(&self) -> &P {
        &self.space
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::table::{fixtures, TableEnvironment};
    use crate::mdp::config::ConfigError;
    use crate::mdp::model::{IllegalAction, Outcome};

    type Env = TableEnvironment<&'static str, &'static str>;

    fn solver_for(
        mdp: fixtures::Mdp,
        start: &'static str,
        config: SolverConfig,
    ) -> QLearningSolver<fixtures::Mdp, Env> {
        let env = TableEnvironment::seeded(mdp.clone(), start, 99);
        QLearningSolver::new(mdp, env, config).unwrap()
    }

    #[test]
    fn test_one_step_scenario() {
        let config = SolverConfig::default()
            .with_exploration(0.0)
            .with_learning_rate(0.5)
            .with_episodes(100)
            .with_seed(1);
        let mut solver = solver_for(fixtures::one_step(), "S", config);
        let policy = solver.train().unwrap();

        assert!((solver.q_value(&"S", &"go").unwrap() - 10.0).abs() < 1e-2);
        assert_eq!(policy.action_for(&"S"), Some(&"go"));
        assert_eq!(policy.action_for(&"T"), None);
        assert_eq!(solver.stats().episodes, 100);
        assert_eq!(solver.stats().steps, 100);
    }

    #[test]
    fn test_converges_to_optimal_q_values() {
        let config = SolverConfig::default()
            .with_exploration(0.3)
            .with_learning_rate(0.1)
            .with_episodes(5_000)
            .with_seed(7);
        let mut solver = solver_for(fixtures::two_by_two(), "A", config);
        let policy = solver.train().unwrap();

        let expected = [
            ("A", "via_b", 4.5),
            ("A", "exit", 1.0),
            ("B", "big", 5.0),
            ("B", "small", 2.0),
        ];
        for (state, action, q) in expected {
            let learned = solver.q_value(&state, &action).unwrap();
            assert!((learned - q).abs() < 1e-2, "Q({}, {}) = {}", state, action, learned);
        }
        assert_eq!(policy.action_for(&"A"), Some(&"via_b"));
        assert_eq!(policy.action_for(&"B"), Some(&"big"));
    }

    #[test]
    fn test_terminal_states_have_no_pairs() {
        let solver = solver_for(fixtures::loop_with_exits(), "a", SolverConfig::default());
        assert_eq!(solver.q_table().len(), 6);
        assert!(solver.q_table().row(&"win").is_none());
        assert!(solver.q_table().row(&"lose").is_none());
    }

    #[test]
    fn test_greedy_tie_break_is_deterministic() {
        let config = SolverConfig::default().with_exploration(0.0).with_seed(3);
        let mut solver = solver_for(fixtures::loop_with_exits(), "a", config);

        for _ in 0..20 {
            assert_eq!(solver.select_action(&"a").unwrap(), "safe");
            assert_eq!(solver.select_action(&"c").unwrap(), "finish");
        }
        let first = solver.extract_policy().unwrap();
        let second = solver.extract_policy().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let config = SolverConfig::default().with_episodes(500).with_seed(11);
        let mut a = solver_for(fixtures::loop_with_exits(), "a", config.clone());
        let mut b = solver_for(fixtures::loop_with_exits(), "a", config);
        a.train().unwrap();
        b.train().unwrap();
        assert_eq!(a.q_table(), b.q_table());
    }

    #[test]
    fn test_exploration_decays_to_floor() {
        let config = SolverConfig::default()
            .with_exploration(1.0)
            .with_exploration_decay(0.5, 0.01)
            .with_episodes(10)
            .with_seed(2);
        let mut solver = solver_for(fixtures::one_step(), "S", config);
        solver.train().unwrap();
        assert_eq!(solver.exploration(), 0.01);
    }

    #[test]
    fn test_callback_interval() {
        let config = SolverConfig::default().with_episodes(100).with_seed(4);
        let mut solver = solver_for(fixtures::one_step(), "S", config);
        let mut seen = Vec::new();
        solver
            .train_with_callback(25, |stats| seen.push(stats.episodes))
            .unwrap();
        assert_eq!(seen, vec![25, 50, 75, 100]);
    }

    /// Rejects `run` actions in a row, then accepts one.
    struct Flaky {
        inner: Env,
        run: usize,
        pending: usize,
        rejected: usize,
    }

    impl Flaky {
        fn new(run: usize) -> Self {
            Self {
                inner: TableEnvironment::seeded(fixtures::one_step(), "S", 5),
                run,
                pending: run,
                rejected: 0,
            }
        }
    }

    impl Environment for Flaky {
        type State = &'static str;
        type Action = &'static str;

        fn reset(&mut self) -> &'static str {
            self.inner.reset()
        }

        fn step(
            &mut self,
            action: &&'static str,
        ) -> std::result::Result<Outcome<&'static str, &'static str>, IllegalAction> {
            if self.pending > 0 {
                self.pending -= 1;
                self.rejected += 1;
                return Err(IllegalAction {
                    state: self.inner.current_state().to_string(),
                    action: action.to_string(),
                });
            }
            self.pending = self.run;
            self.inner.step(action)
        }

        fn current_state(&self) -> &'static str {
            self.inner.current_state()
        }
    }

    #[test]
    fn test_rejected_actions_are_retried() {
        let env = Flaky::new(1);
        let config = SolverConfig::default()
            .with_exploration(0.0)
            .with_learning_rate(0.5)
            .with_episodes(100)
            .with_seed(5);
        let mut solver = QLearningSolver::new(fixtures::one_step(), env, config).unwrap();
        solver.train().unwrap();

        assert_eq!(solver.env().rejected, 100);
        assert_eq!(solver.stats().illegal_actions, 100);
        assert_eq!(solver.stats().steps, 100);
        assert_eq!(solver.q_table().len(), 1);
        assert!((solver.q_value(&"S", &"go").unwrap() - 10.0).abs() < 1e-2);
    }

    #[test]
    fn test_rejections_below_the_limit_are_retried() {
        let mut config = SolverConfig::default().with_episodes(20).with_seed(6);
        config.max_illegal_retries = 3;
        let mut solver = QLearningSolver::new(fixtures::one_step(), Flaky::new(2), config).unwrap();
        solver.train().unwrap();
        assert_eq!(solver.stats().illegal_actions, 40);

        let mut config = SolverConfig::default().with_seed(6);
        config.max_illegal_retries = 2;
        let mut solver = QLearningSolver::new(fixtures::one_step(), Flaky::new(2), config).unwrap();
        let err = solver.run_episode().unwrap_err();
        assert!(matches!(err, SolverError::IllegalActionLimit { attempts: 2, .. }));
    }

    #[test]
    fn test_undiscounted_learning_is_rejected() {
        let config = SolverConfig::default().with_discount(1.0);
        let env = TableEnvironment::seeded(fixtures::one_step(), "S", 1);
        let err = QLearningSolver::new(fixtures::one_step(), env, config).err();
        assert!(matches!(
            err,
            Some(SolverError::Config(ConfigError::UndiscountedLearning(_)))
        ));
    }

    struct Stubborn;

    impl Environment for Stubborn {
        type State = &'static str;
        type Action = &'static str;

        fn reset(&mut self) -> &'static str {
            "S"
        }

        fn step(
            &mut self,
            action: &&'static str,
        ) -> std::result::Result<Outcome<&'static str, &'static str>, IllegalAction> {
            Err(IllegalAction {
                state: "S".to_string(),
                action: action.to_string(),
            })
        }

        fn current_state(&self) -> &'static str {
            "S"
        }
    }

    #[test]
    fn test_endless_rejection_fails_the_episode() {
        let mut config = SolverConfig::default().with_seed(6);
        config.max_illegal_retries = 7;
        let mut solver = QLearningSolver::new(fixtures::one_step(), Stubborn, config).unwrap();

        let err = solver.run_episode().unwrap_err();
        assert!(matches!(err, SolverError::IllegalActionLimit { attempts: 7, .. }));
        assert_eq!(solver.q_value(&"S", &"go"), Some(0.0));
    }
}
