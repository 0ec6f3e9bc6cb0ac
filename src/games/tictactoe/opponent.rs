//! Players for the O side.
//!
//! An opponent describes its play as a distribution over replies, so the
//! same opponent can be enumerated by [`TicTacToeMdp`](super::TicTacToeMdp)
//! and sampled by [`TicTacToeEnv`](super::TicTacToeEnv).

use std::fmt::Debug;

use super::board::{Board, Move};
use crate::mdp::storage::Policy;

/// Chooses O's moves.
pub trait Opponent: Debug {
    /// O's possible moves on `board`, each with its probability.
    ///
    /// Empty when the game is over. Otherwise the probabilities sum to 1.
    fn replies(&self, board: &Board) -> Vec<(f64, Move)>;
}

/// Picks uniformly among the empty cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RandomOpponent;

impl Opponent for RandomOpponent {
    fn replies(&self, board: &Board) -> Vec<(f64, Move)> {
        let moves = board.legal_moves();
        let p = 1.0 / moves.len() as f64;
        moves.into_iter().map(|mv| (p, mv)).collect()
    }
}

/// Plays a fixed policy for O.
///
/// Boards the policy does not cover, or where its move is illegal, get the
/// first empty cell. `PolicyOpponent::default()` therefore always takes the
/// lowest free square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyOpponent {
    policy: Policy<Board, Move>,
}

impl PolicyOpponent {
    /// Create an opponent that follows `policy`.
    pub fn new(policy: Policy<Board, Move>) -> Self {
        Self { policy }
    }

    /// The policy being followed.
    pub fn policy(&self) -> &Policy<Board, Move> {
        &self.policy
    }
}

impl Default for PolicyOpponent {
    fn default() -> Self {
        Self::new(Policy::new(Vec::new()))
    }
}

impl Opponent for PolicyOpponent {
    fn replies(&self, board: &Board) -> Vec<(f64, Move)> {
        if board.is_terminal() {
            return vec![];
        }
        let chosen = self
            .policy
            .action_for(board)
            .copied()
            .filter(|mv| board.is_legal(*mv))
            .or_else(|| board.legal_moves().first().copied());
        chosen.map(|mv| vec![(1.0, mv)]).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::board::Player;

    #[test]
    fn test_random_replies_are_uniform() {
        let board = Board::default().play(Move(4)).unwrap();
        let replies = RandomOpponent.replies(&board);
        assert_eq!(replies.len(), 8);
        assert!(replies.iter().all(|(p, _)| (p - 0.125).abs() < 1e-12));
        assert!(replies.iter().all(|(_, mv)| mv.0 != 4));
    }

    #[test]
    fn test_finished_game_has_no_replies() {
        let board = Board::parse("XXX|OO.|...", Player::O).unwrap();
        assert!(RandomOpponent.replies(&board).is_empty());
        assert!(PolicyOpponent::default().replies(&board).is_empty());
    }

    #[test]
    fn test_policy_opponent_follows_its_policy() {
        let board = Board::default().play(Move(0)).unwrap();
        let opponent = PolicyOpponent::new(Policy::new(vec![(board, Move(8))]));
        assert_eq!(opponent.replies(&board), vec![(1.0, Move(8))]);

        // uncovered board: lowest free square
        let other = Board::default().play(Move(4)).unwrap();
        assert_eq!(opponent.replies(&other), vec![(1.0, Move(0))]);
    }

    #[test]
    fn test_policy_opponent_skips_illegal_moves() {
        let board = Board::default().play(Move(0)).unwrap();
        let opponent = PolicyOpponent::new(Policy::new(vec![(board, Move(0))]));
        assert_eq!(opponent.replies(&board), vec![(1.0, Move(1))]);
    }
}
