//! Board representation and move rules.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Winning line indices on the 3x3 board
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Nobody has played here.
    Empty,
    /// Taken by X.
    X,
    /// Taken by O.
    O,
}

impl Cell {
    /// Single-character rendering, `.` for empty.
    pub fn to_char(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::X => 'X',
            Cell::O => 'O',
        }
    }

    /// Parse a cell from its character.
    pub fn from_char(c: char) -> Option<Cell> {
        match c {
            '.' | ' ' | '-' => Some(Cell::Empty),
            'X' | 'x' => Some(Cell::X),
            'O' | 'o' => Some(Cell::O),
            _ => None,
        }
    }
}

/// A player in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    /// The learning agent.
    X,
    /// The opponent.
    O,
}

impl Player {
    /// Get the opponent player
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    /// Convert player to cell
    pub fn to_cell(self) -> Cell {
        match self {
            Player::X => Cell::X,
            Player::O => Cell::O,
        }
    }
}

/// Placing a mark on cell `0..9`, numbered row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Move(pub usize);

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0 / 3, self.0 % 3)
    }
}

/// Cells plus whose turn it is.
///
/// Two boards with the same marks but different players to move are
/// different positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Cells, row by row.
    pub cells: [Cell; 9],
    /// Player whose turn it is.
    pub to_move: Player,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(Player::X)
    }
}

impl Board {
    /// Create an empty board with `first` to move.
    pub fn new(first: Player) -> Self {
        Self {
            cells: [Cell::Empty; 9],
            to_move: first,
        }
    }

    /// Parse nine cell characters, e.g. `"XX.OO...."`.
    ///
    /// Whitespace and `|` separators are ignored.
    pub fn parse(cells: &str, to_move: Player) -> Option<Self> {
        let parsed: Vec<Cell> = cells
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '|')
            .map(Cell::from_char)
            .collect::<Option<_>>()?;
        let cells: [Cell; 9] = parsed.try_into().ok()?;
        Some(Self { cells, to_move })
    }

    /// Empty cells in ascending order. Empty once the game is over.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_terminal() {
            return vec![];
        }
        (0..9)
            .filter(|&i| self.cells[i] == Cell::Empty)
            .map(Move)
            .collect()
    }

    /// Check whether the player to move may play `mv`.
    pub fn is_legal(&self, mv: Move) -> bool {
        mv.0 < 9 && self.cells[mv.0] == Cell::Empty && !self.is_terminal()
    }

    /// The board after the player to move plays `mv`, or `None` if the
    /// move is illegal.
    pub fn play(&self, mv: Move) -> Option<Self> {
        if !self.is_legal(mv) {
            return None;
        }
        let mut next = *self;
        next.cells[mv.0] = self.to_move.to_cell();
        next.to_move = self.to_move.opponent();
        Some(next)
    }

    /// Check if a player has three in a row
    pub fn has_won(&self, player: Player) -> bool {
        let target = player.to_cell();
        WINNING_LINES
            .iter()
            .any(|line| line.iter().all(|&idx| self.cells[idx] == target))
    }

    /// The player with three in a row, if any.
    pub fn winner(&self) -> Option<Player> {
        if self.has_won(Player::X) {
            Some(Player::X)
        } else if self.has_won(Player::O) {
            Some(Player::O)
        } else {
            None
        }
    }

    /// Check if every cell is taken.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|&c| c != Cell::Empty)
    }

    /// Check if the game is over.
    pub fn is_terminal(&self) -> bool {
        self.winner().is_some() || self.is_full()
    }

    /// Nine-character encoding, row by row.
    pub fn encode(&self) -> String {
        self.cells.iter().map(|c| c.to_char()).collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            if row > 0 {
                writeln!(f)?;
            }
            for col in 0..3 {
                write!(f, "{}", self.cells[row * 3 + col].to_char())?;
            }
        }
        Ok(())
    }
}
