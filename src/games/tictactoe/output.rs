//! Run reports for the command-line drivers.
//!
//! A report summarises one training run: the configuration, the solver's
//! statistics, how the trained policy opens and how it fared in test games.
//! The policy itself is not exported.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::board::{Board, Move, Player};
use super::env::MatchRecord;
use crate::mdp::config::{SolveStats, SolverConfig};
use crate::mdp::storage::Policy;

/// Summary of one solver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    /// Solver name
    pub solver: String,
    /// Configuration the run used
    pub config: SolverConfig,
    /// Statistics collected while training
    pub stats: SolveStats,
    /// Number of positions with a policy action
    pub policy_size: usize,
    /// Policy move on the empty board, as `(row, col)`
    pub opening_move: Option<String>,
    /// Results of playing the policy against the random opponent
    pub evaluation: Option<MatchRecord>,
    /// Timestamp
    pub timestamp: String,
}

impl SolveReport {
    /// Create a report for a finished run.
    pub fn new(
        solver: &str,
        config: &SolverConfig,
        stats: &SolveStats,
        policy: &Policy<Board, Move>,
    ) -> Self {
        Self {
            solver: solver.to_string(),
            config: config.clone(),
            stats: stats.clone(),
            policy_size: policy.len(),
            opening_move: policy
                .action_for(&Board::new(Player::X))
                .map(|mv| mv.to_string()),
            evaluation: None,
            timestamp: unix_timestamp(),
        }
    }

    /// Builder method: attach test-game results.
    pub fn with_evaluation(mut self, record: MatchRecord) -> Self {
        self.evaluation = Some(record);
        self
    }

    /// Save to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())
    }
}

/// Seconds since the Unix epoch.
fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    format!("{}", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_reads_opening_move() {
        let policy = Policy::new(vec![(Board::default(), Move(4))]);
        let report = SolveReport::new("value", &SolverConfig::default(), &SolveStats::new(), &policy)
            .with_evaluation(MatchRecord {
                wins: 3,
                draws: 1,
                losses: 0,
            });

        assert_eq!(report.opening_move.as_deref(), Some("(1, 1)"));
        assert_eq!(report.policy_size, 1);

        let json = serde_json::to_string(&report).unwrap();
        let back: SolveReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.evaluation, report.evaluation);
        assert_eq!(back.config, report.config);
    }
}
