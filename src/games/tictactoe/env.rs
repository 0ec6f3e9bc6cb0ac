//! Live tic-tac-toe against a sampled opponent.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::board::{Board, Move, Player};
use super::mdp::{reward_for, starting_boards};
use super::opponent::{Opponent, RandomOpponent};
use crate::mdp::config::RewardConfig;
use crate::mdp::model::{Environment, IllegalAction, Outcome};
use crate::mdp::storage::Policy;

/// Results of a series of games, from X's point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Games X won.
    pub wins: usize,
    /// Games that ended full with no line.
    pub draws: usize,
    /// Games O won.
    pub losses: usize,
}

impl MatchRecord {
    /// Number of games played.
    pub fn games(&self) -> usize {
        self.wins + self.draws + self.losses
    }

    /// Fraction of games not lost.
    pub fn non_loss_rate(&self) -> f64 {
        if self.games() == 0 {
            return 0.0;
        }
        (self.wins + self.draws) as f64 / self.games() as f64
    }
}

/// Plays X's moves and answers each with the opponent's reply.
///
/// Outcomes follow the same distribution and rewards as a
/// [`TicTacToeMdp`](super::TicTacToeMdp) built with the same opponent.
/// The opponent is uniformly random unless replaced with
/// [`with_opponent`](TicTacToeEnv::with_opponent).
#[derive(Debug, Clone)]
pub struct TicTacToeEnv<R = StdRng, O = RandomOpponent> {
    rewards: RewardConfig,
    opponent_starts: bool,
    opponent: O,
    board: Board,
    rng: R,
}

impl TicTacToeEnv<StdRng, RandomOpponent> {
    /// Create an environment with a seeded opponent.
    pub fn seeded(rewards: RewardConfig, seed: u64) -> Self {
        Self::new(rewards, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TicTacToeEnv<R, RandomOpponent> {
    /// Create an environment where X moves first.
    pub fn new(rewards: RewardConfig, rng: R) -> Self {
        Self {
            rewards,
            opponent_starts: false,
            opponent: RandomOpponent,
            board: Board::new(Player::X),
            rng,
        }
    }
}

impl<R: Rng, O: Opponent> TicTacToeEnv<R, O> {
    /// Builder method: let `opponent` play O.
    pub fn with_opponent<P: Opponent>(self, opponent: P) -> TicTacToeEnv<R, P> {
        TicTacToeEnv {
            rewards: self.rewards,
            opponent_starts: self.opponent_starts,
            opponent,
            board: self.board,
            rng: self.rng,
        }
    }

    /// Builder method: let O open every game.
    pub fn with_opponent_start(mut self, opponent_starts: bool) -> Self {
        self.opponent_starts = opponent_starts;
        self
    }

    /// The current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The player behind O.
    pub fn opponent(&self) -> &O {
        &self.opponent
    }

    fn reject(&self, action: &Move) -> IllegalAction {
        IllegalAction {
            state: self.board.encode(),
            action: action.to_string(),
        }
    }

    /// Play `games` games following `policy`.
    ///
    /// Positions the policy does not cover are played with the first legal
    /// move.
    pub fn play_policy(&mut self, policy: &Policy<Board, Move>, games: usize) -> MatchRecord {
        let mut record = MatchRecord::default();
        for _ in 0..games {
            let mut board = self.reset();
            while !board.is_terminal() {
                let mv = match policy.action_for(&board) {
                    Some(mv) => *mv,
                    None => match board.legal_moves().first() {
                        Some(mv) => *mv,
                        None => break,
                    },
                };
                match self.step(&mv) {
                    Ok(outcome) => board = outcome.next_state,
                    Err(illegal) => {
                        log::warn!("{}", illegal);
                        break;
                    }
                }
            }
            match board.winner() {
                Some(Player::X) => record.wins += 1,
                Some(Player::O) => record.losses += 1,
                None => record.draws += 1,
            }
        }
        record
    }
}

impl<R: Rng, O: Opponent> Environment for TicTacToeEnv<R, O> {
    type State = Board;
    type Action = Move;

    fn reset(&mut self) -> Board {
        let openings = starting_boards(&self.opponent, self.opponent_starts);
        self.board = openings
            .choose_weighted(&mut self.rng, |(p, _)| *p)
            .map(|(_, board)| *board)
            .unwrap_or_default();
        self.board
    }

    fn step(&mut self, action: &Move) -> Result<Outcome<Board, Move>, IllegalAction> {
        if self.board.to_move != Player::X {
            return Err(self.reject(action));
        }
        let after_agent = self.board.play(*action).ok_or_else(|| self.reject(action))?;

        let next = if after_agent.is_terminal() {
            after_agent
        } else {
            let replies = self.opponent.replies(&after_agent);
            replies
                .choose_weighted(&mut self.rng, |(p, _)| *p)
                .ok()
                .and_then(|(_, reply)| after_agent.play(*reply))
                .unwrap_or(after_agent)
        };

        let outcome = Outcome::new(self.board, *action, reward_for(&next, &self.rewards), next);
        self.board = next;
        Ok(outcome)
    }

    fn current_state(&self) -> Board {
        self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::opponent::PolicyOpponent;
    use crate::games::tictactoe::TicTacToeMdp;
    use crate::mdp::{StateSpace, TransitionModel};

    #[test]
    fn test_reset_gives_empty_board() {
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 1);
        assert_eq!(env.reset(), Board::default());
        assert_eq!(env.current_state(), Board::default());
    }

    #[test]
    fn test_step_plays_both_sides() {
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 2);
        env.reset();
        let outcome = env.step(&Move(4)).unwrap();

        assert_eq!(outcome.state, Board::default());
        assert_eq!(outcome.next_state.to_move, Player::X);
        assert_eq!(outcome.next_state.legal_moves().len(), 7);
        assert_eq!(outcome.reward, 0.0);
        assert_eq!(env.current_state(), outcome.next_state);
    }

    #[test]
    fn test_illegal_move_leaves_board_unchanged() {
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 3);
        env.reset();
        let before = env.step(&Move(0)).unwrap().next_state;

        let err = env.step(&Move(0)).unwrap_err();
        assert_eq!(err.action, "(0, 0)");
        assert_eq!(env.current_state(), before);
        assert!(env.step(&Move(42)).is_err());
    }

    #[test]
    fn test_games_end_and_match_the_model() {
        let rewards = RewardConfig::default();
        let mdp = TicTacToeMdp::new(rewards);
        let mut env = TicTacToeEnv::seeded(rewards, 4);

        for _ in 0..50 {
            let mut board = env.reset();
            while !board.is_terminal() {
                let mv = mdp.legal_actions(&board)[0];
                let outcome = env.step(&mv).unwrap();
                let possible = mdp.transitions(&board, &mv);
                assert!(possible.iter().any(|t| t.outcome == outcome));
                board = outcome.next_state;
            }
            assert!(env.step(&Move(0)).is_err());
        }
    }

    #[test]
    fn test_play_policy_counts_every_game() {
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 6);
        let record = env.play_policy(&Policy::new(Vec::new()), 40);
        assert_eq!(record.games(), 40);
        assert_eq!(record.wins + record.draws + record.losses, 40);
        assert!(record.non_loss_rate() > 0.0);
    }

    #[test]
    fn test_play_policy_follows_the_policy() {
        // Both sides take the lowest free square: X 0, O 1, X 2, O 3, X 4,
        // O 5, X 6 completes 2-4-6.
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 7)
            .with_opponent(PolicyOpponent::default());
        let fallback = env.play_policy(&Policy::new(Vec::new()), 5);
        assert_eq!(fallback.wins, 5);

        // X 8, O 0, X 7, O 1, X 6 wins the bottom row
        let policy = Policy::new(vec![
            (Board::default(), Move(8)),
            (Board::parse("O..|...|..X", Player::X).unwrap(), Move(7)),
            (Board::parse("OO.|...|.XX", Player::X).unwrap(), Move(6)),
        ]);
        let followed = env.play_policy(&policy, 5);
        assert_eq!(followed.wins, 5);

        // X 8, O 0, X 5, O 1, X 3, O 2 completes the top row
        let losing = Policy::new(vec![
            (Board::default(), Move(8)),
            (Board::parse("O..|...|..X", Player::X).unwrap(), Move(5)),
            (Board::parse("OO.|..X|..X", Player::X).unwrap(), Move(3)),
        ]);
        let record = env.play_policy(&losing, 5);
        assert_eq!(record.losses, 5);
    }

    #[test]
    fn test_deterministic_opponent_takes_the_lowest_square() {
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 8)
            .with_opponent(PolicyOpponent::default());
        env.reset();
        let outcome = env.step(&Move(4)).unwrap();
        assert_eq!(outcome.next_state, Board::parse("O..|.X.|...", Player::X).unwrap());

        let outcome = env.step(&Move(1)).unwrap();
        assert_eq!(outcome.next_state, Board::parse("OXO|.X.|...", Player::X).unwrap());
    }

    #[test]
    fn test_opponent_can_open_deterministically() {
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 9)
            .with_opponent(PolicyOpponent::default())
            .with_opponent_start(true);
        for _ in 0..5 {
            assert_eq!(env.reset(), Board::parse("O..|...|...", Player::X).unwrap());
        }
    }

    #[test]
    fn test_opponent_start() {
        let mut env = TicTacToeEnv::seeded(RewardConfig::default(), 5).with_opponent_start(true);
        let board = env.reset();
        assert_eq!(board.to_move, Player::X);
        assert_eq!(board.legal_moves().len(), 8);
    }
}
