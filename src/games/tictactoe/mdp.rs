//! Tic-tac-toe as an MDP against a fixed opponent.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use super::board::{Board, Move, Player};
use super::opponent::{Opponent, RandomOpponent};
use crate::mdp::config::RewardConfig;
use crate::mdp::model::{Outcome, StateSpace, TransitionModel, TransitionProb};

/// Reward for the step that produced `board`.
///
/// The agent plays X. A finished game pays the win, lose or draw reward;
/// any other position pays the living reward.
pub fn reward_for(board: &Board, rewards: &RewardConfig) -> f64 {
    match board.winner() {
        Some(Player::X) => rewards.win,
        Some(Player::O) => rewards.lose,
        None if board.is_full() => rewards.draw,
        None => rewards.living,
    }
}

/// The positions a new game can start from, with their probabilities.
///
/// When the opponent moves first there is one start per opening the
/// opponent may play.
pub fn starting_boards<O: Opponent>(opponent: &O, opponent_starts: bool) -> Vec<(f64, Board)> {
    if !opponent_starts {
        return vec![(1.0, Board::new(Player::X))];
    }
    let empty = Board::new(Player::O);
    opponent
        .replies(&empty)
        .into_iter()
        .filter_map(|(p, mv)| empty.play(mv).map(|board| (p, board)))
        .collect()
}

/// Tic-tac-toe from X's point of view.
///
/// States are every reachable board where X is to move, plus every
/// reachable finished board. Playing a move applies X's mark and then the
/// opponent's reply, so each transition lands on the agent's next decision
/// point or on the end of the game. The opponent is uniformly random
/// unless another one is given with [`TicTacToeMdp::with_opponent`].
///
/// # Example
/// ```
/// use mdp_solver::games::tictactoe::{Board, TicTacToeMdp};
/// use mdp_solver::mdp::StateSpace;
///
/// let mdp = TicTacToeMdp::new(Default::default());
/// assert_eq!(mdp.states()[0], Board::default());
/// assert_eq!(mdp.legal_actions(&Board::default()).len(), 9);
/// ```
#[derive(Debug, Clone)]
pub struct TicTacToeMdp<O = RandomOpponent> {
    rewards: RewardConfig,
    opponent_starts: bool,
    opponent: O,
    states: Vec<Board>,
}

impl TicTacToeMdp<RandomOpponent> {
    /// Create the MDP with X moving first against a random opponent.
    pub fn new(rewards: RewardConfig) -> Self {
        Self::with_opponent(rewards, RandomOpponent, false)
    }

    /// Create the MDP with a random opponent that opens the game.
    pub fn opponent_first(rewards: RewardConfig) -> Self {
        Self::with_opponent(rewards, RandomOpponent, true)
    }
}

impl<O: Opponent> TicTacToeMdp<O> {
    /// Create the MDP against `opponent`.
    pub fn with_opponent(rewards: RewardConfig, opponent: O, opponent_starts: bool) -> Self {
        let mut mdp = Self {
            rewards,
            opponent_starts,
            opponent,
            states: Vec::new(),
        };
        mdp.states = mdp.enumerate();
        log::debug!("{:<32}{:<16}", "tic-tac-toe states", mdp.states.len());
        mdp
    }

    /// Breadth-first search over X's decision points.
    fn enumerate(&self) -> Vec<Board> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        for (_, board) in starting_boards(&self.opponent, self.opponent_starts) {
            if seen.insert(board) {
                queue.push_back(board);
            }
        }

        while let Some(board) = queue.pop_front() {
            order.push(board);
            for mv in board.legal_moves() {
                for (_, next) in self.successors(&board, mv) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        order
    }

    /// Boards reachable by X playing `mv`, each with its probability.
    fn successors(&self, board: &Board, mv: Move) -> Vec<(f64, Board)> {
        let after_agent = match board.play(mv) {
            Some(next) => next,
            None => return vec![],
        };
        if after_agent.is_terminal() {
            return vec![(1.0, after_agent)];
        }

        self.opponent
            .replies(&after_agent)
            .into_iter()
            .filter_map(|(p, reply)| after_agent.play(reply).map(|next| (p, next)))
            .collect()
    }

    /// The reward scheme in use.
    pub fn rewards(&self) -> &RewardConfig {
        &self.rewards
    }

    /// Check if O opens the game.
    pub fn opponent_starts(&self) -> bool {
        self.opponent_starts
    }

    /// The player behind O.
    pub fn opponent(&self) -> &O {
        &self.opponent
    }
}

impl<O: Opponent> StateSpace for TicTacToeMdp<O> {
    type State = Board;
    type Action = Move;

    fn states(&self) -> Vec<Board> {
        self.states.clone()
    }

    fn legal_actions(&self, state: &Board) -> Vec<Move> {
        if state.to_move != Player::X {
            return vec![];
        }
        state.legal_moves()
    }

    fn is_terminal(&self, state: &Board) -> bool {
        state.is_terminal()
    }

    fn state_description(&self, state: &Board) -> String {
        state.encode()
    }
}

impl<O: Opponent> TransitionModel for TicTacToeMdp<O> {
    fn transitions(&self, state: &Board, action: &Move) -> Vec<TransitionProb<Board, Move>> {
        self.successors(state, *action)
            .into_iter()
            .map(|(p, next)| {
                let reward = reward_for(&next, &self.rewards);
                TransitionProb::new(p, Outcome::new(*state, *action, reward, next))
            })
            .collect()
    }
}
