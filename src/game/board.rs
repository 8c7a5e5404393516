use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Player symbol. player1 always plays X, player2 always plays O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

/// The 8 canonical winning lines: 3 rows, 3 columns, 2 diagonals.
pub const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won(Mark),
    Draw,
    InProgress,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [Option<Mark>; 9],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cells(&self) -> &[Option<Mark>; 9] {
        &self.cells
    }

    /// Marks a cell. Position must be in [0,8] and the cell empty; a cell,
    /// once occupied, never changes.
    pub fn place(&mut self, position: usize, mark: Mark) -> Result<()> {
        if position > 8 {
            return Err(AppError::InvalidPosition);
        }
        if self.cells[position].is_some() {
            return Err(AppError::CellOccupied);
        }
        self.cells[position] = Some(mark);
        Ok(())
    }

    /// Returns the symbol occupying a complete line, if any.
    pub fn winner(&self) -> Option<Mark> {
        for line in LINES {
            let [a, b, c] = line;
            if let Some(mark) = self.cells[a] {
                if self.cells[b] == Some(mark) && self.cells[c] == Some(mark) {
                    return Some(mark);
                }
            }
        }
        None
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| cell.is_some())
    }

    /// Win beats draw when the ninth move completes a line.
    pub fn evaluate(&self) -> Outcome {
        if let Some(mark) = self.winner() {
            Outcome::Won(mark)
        } else if self.is_full() {
            Outcome::Draw
        } else {
            Outcome::InProgress
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with(marks: &[(usize, Mark)]) -> Board {
        let mut board = Board::new();
        for &(position, mark) in marks {
            board.place(position, mark).unwrap();
        }
        board
    }

    #[test]
    fn empty_board_has_no_winner() {
        assert_eq!(Board::new().winner(), None);
        assert_eq!(Board::new().evaluate(), Outcome::InProgress);
    }

    #[test]
    fn every_canonical_line_wins() {
        for line in LINES {
            let marks: Vec<(usize, Mark)> = line.iter().map(|&p| (p, Mark::O)).collect();
            let board = board_with(&marks);
            assert_eq!(board.winner(), Some(Mark::O), "line {:?}", line);
        }
    }

    #[test]
    fn mixed_line_is_not_a_win() {
        let board = board_with(&[(0, Mark::X), (1, Mark::O), (2, Mark::X)]);
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn no_complete_line_means_no_winner() {
        // X O X / X O O / O X X - full board, no line
        let board = board_with(&[
            (0, Mark::X),
            (1, Mark::O),
            (2, Mark::X),
            (3, Mark::X),
            (4, Mark::O),
            (5, Mark::O),
            (6, Mark::O),
            (7, Mark::X),
            (8, Mark::X),
        ]);
        assert_eq!(board.winner(), None);
        assert!(board.is_full());
        assert_eq!(board.evaluate(), Outcome::Draw);
    }

    #[test]
    fn place_rejects_out_of_range_position() {
        let mut board = Board::new();
        assert!(matches!(
            board.place(9, Mark::X),
            Err(AppError::InvalidPosition)
        ));
        assert_eq!(board.cells().iter().filter(|c| c.is_some()).count(), 0);
    }

    #[test]
    fn place_rejects_occupied_cell() {
        let mut board = Board::new();
        board.place(4, Mark::X).unwrap();
        assert!(matches!(
            board.place(4, Mark::O),
            Err(AppError::CellOccupied)
        ));
        assert_eq!(board.cells()[4], Some(Mark::X));
    }

    #[test]
    fn win_on_final_cell_beats_draw() {
        // X X _ / O O X / X O O, then X completes the top row
        let mut board = board_with(&[
            (0, Mark::X),
            (1, Mark::X),
            (3, Mark::O),
            (4, Mark::O),
            (5, Mark::X),
            (6, Mark::X),
            (7, Mark::O),
            (8, Mark::O),
        ]);
        board.place(2, Mark::X).unwrap();
        assert_eq!(board.evaluate(), Outcome::Won(Mark::X));
    }
}
