//! Configuration options for the solvers.
//!
//! One [`SolverConfig`] is passed to every solver. Each solver reads the
//! fields it needs and ignores the rest.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How value iteration decides when to stop sweeping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SweepMode {
    /// Sweep until the largest value change in a sweep is at most `delta`.
    UntilConverged,
    /// Run exactly this many sweeps regardless of the value changes.
    Fixed(usize),
}

/// Reward scheme for the bundled games.
///
/// The solvers themselves never read these; they only see the rewards the
/// model reports. The fields live here so one record configures a full run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Reward for a move that wins the game.
    pub win: f64,
    /// Reward when the opponent's reply wins the game.
    pub lose: f64,
    /// Reward when the game ends in a draw.
    pub draw: f64,
    /// Reward for a move after which the game goes on.
    pub living: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            win: 10.0,
            lose: -10.0,
            draw: 0.0,
            living: 0.0,
        }
    }
}

/// Configuration shared by all solvers.
///
/// # Example
/// ```
/// use mdp_solver::mdp::SolverConfig;
///
/// let config = SolverConfig::default().with_discount(0.95).with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Discount factor γ in `[0, 1]`.
    ///
    /// γ = 1 is only safe on episodic models, where every policy reaches a
    /// terminal state. On a model with cycles undiscounted policy evaluation
    /// can run forever. Q-learning rejects γ = 1 outright, see
    /// [`validate_for_learning`](Self::validate_for_learning).
    pub discount: f64,

    /// Convergence threshold δ.
    ///
    /// Policy evaluation, and value iteration in
    /// [`SweepMode::UntilConverged`], stop once the largest absolute value
    /// change in a sweep is at most this value. Pick it relative to the
    /// reward scale: a threshold below floating point noise never converges.
    pub delta: f64,

    /// Stopping rule for value iteration.
    pub sweep_mode: SweepMode,

    /// Optional cap on the number of sweeps in one evaluation or
    /// value-iteration run.
    ///
    /// `None` means no cap, so a run with an unreachable `delta` never
    /// returns.
    pub max_sweeps: Option<usize>,

    /// Q-learning step size α in `(0, 1]`.
    pub learning_rate: f64,

    /// Probability ε of exploring with a random action.
    pub exploration: f64,

    /// Multiplicative decay applied to ε after every episode.
    ///
    /// Set to `None` to keep ε constant.
    pub exploration_decay: Option<f64>,

    /// Lower bound for the decayed exploration rate.
    pub min_exploration: f64,

    /// Number of Q-learning episodes.
    pub episodes: u64,

    /// Number of rejected actions in a row that fails an episode.
    ///
    /// With a limit of `n`, up to `n - 1` consecutive rejections are retried
    /// and the `n`-th returns [`SolverError::IllegalActionLimit`](crate::mdp::SolverError::IllegalActionLimit).
    pub max_illegal_retries: usize,

    /// Rewards used by the bundled games.
    pub rewards: RewardConfig,

    /// Random seed for reproducibility.
    ///
    /// If set, the solver seeds its generator with this value. If `None`,
    /// a random seed is used.
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            discount: 0.9,
            delta: 0.1,
            sweep_mode: SweepMode::UntilConverged,
            max_sweeps: None,
            learning_rate: 0.1,
            exploration: 0.1,
            exploration_decay: None,
            min_exploration: 0.0,
            episodes: 100_000,
            max_illegal_retries: 100,
            rewards: RewardConfig::default(),
            seed: None,
        }
    }
}

impl SolverConfig {
    /// Create a new SolverConfig with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration that sweeps until values are exact to
    /// within `1e-9`.
    pub fn exact() -> Self {
        Self {
            delta: 1e-9,
            ..Default::default()
        }
    }

    /// Builder method: set the discount factor.
    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    /// Builder method: set the convergence threshold.
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Builder method: set the value-iteration stopping rule.
    pub fn with_sweep_mode(mut self, mode: SweepMode) -> Self {
        self.sweep_mode = mode;
        self
    }

    /// Builder method: cap the number of sweeps per run.
    pub fn with_max_sweeps(mut self, sweeps: usize) -> Self {
        self.max_sweeps = Some(sweeps);
        self
    }

    /// Builder method: set the learning rate.
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Builder method: set exploration probability.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Builder method: decay exploration towards `min` by `decay` per episode.
    pub fn with_exploration_decay(mut self, decay: f64, min: f64) -> Self {
        self.exploration_decay = Some(decay);
        self.min_exploration = min;
        self
    }

    /// Builder method: set the number of episodes.
    pub fn with_episodes(mut self, episodes: u64) -> Self {
        self.episodes = episodes;
        self
    }

    /// Builder method: set the reward scheme.
    pub fn with_rewards(mut self, rewards: RewardConfig) -> Self {
        self.rewards = rewards;
        self
    }

    /// Builder method: set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(ConfigError::InvalidDiscount(self.discount));
        }

        if !(self.delta > 0.0) {
            return Err(ConfigError::InvalidDelta(self.delta));
        }

        if let SweepMode::Fixed(0) = self.sweep_mode {
            return Err(ConfigError::ZeroSweeps);
        }

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }

        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(ConfigError::InvalidExploration(self.exploration));
        }

        if let Some(decay) = self.exploration_decay {
            if !(decay > 0.0 && decay <= 1.0) {
                return Err(ConfigError::InvalidExplorationDecay(decay));
            }
        }

        if !(0.0..=1.0).contains(&self.min_exploration) {
            return Err(ConfigError::InvalidExploration(self.min_exploration));
        }

        Ok(())
    }

    /// Validate for Q-learning, which also needs γ < 1.
    pub fn validate_for_learning(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.discount >= 1.0 {
            return Err(ConfigError::UndiscountedLearning(self.discount));
        }
        Ok(())
    }
}

/// Errors that can occur when validating a [`SolverConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Discount factor is out of range [0, 1].
    #[error("discount {0} is out of range [0, 1]")]
    InvalidDiscount(f64),
    /// Convergence threshold is not strictly positive.
    #[error("convergence threshold {0} must be positive")]
    InvalidDelta(f64),
    /// Fixed sweep mode with zero sweeps.
    #[error("fixed sweep mode needs at least one sweep")]
    ZeroSweeps,
    /// Learning rate is out of range (0, 1].
    #[error("learning rate {0} is out of range (0, 1]")]
    InvalidLearningRate(f64),
    /// Exploration probability is out of range [0, 1].
    #[error("exploration probability {0} is out of range [0, 1]")]
    InvalidExploration(f64),
    /// Exploration decay is out of range (0, 1].
    #[error("exploration decay {0} is out of range (0, 1]")]
    InvalidExplorationDecay(f64),
    /// Q-learning with a discount of 1.
    #[error("q-learning needs a discount below 1, got {0}")]
    UndiscountedLearning(f64),
    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(String),
    /// Configuration file is not valid JSON for this type.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Statistics tracked during training.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveStats {
    /// Total value sweeps performed (evaluation or optimality sweeps).
    pub sweeps: u64,

    /// Number of policy improvement steps run.
    pub improvements: u64,

    /// Number of completed episodes.
    pub episodes: u64,

    /// Number of accepted environment steps.
    pub steps: u64,

    /// Number of actions the environment rejected.
    pub illegal_actions: u64,

    /// Number of states in the solver's table.
    pub states: usize,

    /// Largest value change in the most recent sweep.
    pub last_delta: Option<f64>,

    /// Total time spent training (in seconds).
    pub elapsed_seconds: f64,

    /// Largest value change of every sweep, in order.
    pub delta_history: Vec<ConvergencePoint>,
}

/// The largest value change of one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergencePoint {
    /// Sweep number (1-based, counted across the whole run).
    pub sweep: u64,
    /// Largest absolute value change in that sweep.
    pub max_delta: f64,
}

impl SolveStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of one sweep.
    pub fn record_sweep(&mut self, max_delta: f64) {
        self.sweeps += 1;
        self.last_delta = Some(max_delta);
        self.delta_history.push(ConvergencePoint {
            sweep: self.sweeps,
            max_delta,
        });
    }
}
