//! Connect Four: seven columns, six rows, four in a row wins.

use dropline_protocol::Player;

use crate::{GameEngine, MoveError};

/// Number of columns on the board.
pub const COLUMNS: usize = 7;

/// Number of rows on the board. Row 0 is the bottom.
pub const ROWS: usize = 6;

/// Line directions checked for a win: horizontal, vertical, and both
/// diagonals. Each is walked both ways from the last disc.
const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// A Connect Four game.
///
/// Red moves first and players alternate. Once a player connects four
/// discs the game is over and every further move is refused.
#[derive(Debug, Clone)]
pub struct ConnectFour {
    /// `board[column][row]`, row 0 at the bottom.
    board: [[Option<Player>; ROWS]; COLUMNS],
    /// Next free row per column.
    heights: [usize; COLUMNS],
    /// Accepted moves as `(player, column, row)`.
    moves: Vec<(Player, usize, usize)>,
    winner: Option<Player>,
}

impl Default for ConnectFour {
    fn default() -> Self {
        Self {
            board: [[None; ROWS]; COLUMNS],
            heights: [0; COLUMNS],
            moves: Vec::new(),
            winner: None,
        }
    }
}

impl ConnectFour {
    /// The player expected to move next.
    pub fn next_player(&self) -> Player {
        match self.moves.last() {
            Some((player, _, _)) => player.other(),
            None => Player::Red,
        }
    }

    /// Accepted moves as `(player, column, row)`, oldest first.
    pub fn moves(&self) -> &[(Player, usize, usize)] {
        &self.moves
    }

    /// The disc at `(column, row)`, if any.
    pub fn disc(&self, column: usize, row: usize) -> Option<Player> {
        self.board.get(column)?.get(row).copied().flatten()
    }

    fn connects_four(&self, player: Player, column: usize, row: usize) -> bool {
        DIRECTIONS.iter().any(|&(dc, dr)| {
            1 + self.run_length(player, column, row, dc, dr)
                + self.run_length(player, column, row, -dc, -dr)
                >= 4
        })
    }

    /// Counts `player`'s consecutive discs from `(column, row)` in one
    /// direction, not including the starting cell.
    fn run_length(
        &self,
        player: Player,
        column: usize,
        row: usize,
        dc: isize,
        dr: isize,
    ) -> usize {
        let mut count = 0;
        let (mut c, mut r) = (column as isize, row as isize);
        loop {
            c += dc;
            r += dr;
            if c < 0 || r < 0 {
                return count;
            }
            match self.disc(c as usize, r as usize) {
                Some(p) if p == player => count += 1,
                _ => return count,
            }
        }
    }
}

impl GameEngine for ConnectFour {
    type Error = MoveError;

    fn play(&mut self, player: Player, column: i32) -> Result<usize, MoveError> {
        if self.winner.is_some() {
            return Err(MoveError::GameOver);
        }
        if player != self.next_player() {
            return Err(MoveError::NotYourTurn);
        }
        let col = usize::try_from(column)
            .ok()
            .filter(|c| *c < COLUMNS)
            .ok_or(MoveError::NoSuchColumn(column))?;

        let row = self.heights[col];
        if row == ROWS {
            return Err(MoveError::ColumnFull);
        }

        self.board[col][row] = Some(player);
        self.heights[col] += 1;
        self.moves.push((player, col, row));

        if self.connects_four(player, col, row) {
            self.winner = Some(player);
        }

        Ok(row)
    }

    fn winner(&self) -> Option<Player> {
        self.winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plays alternating moves starting with Red, panicking on rejection.
    fn play_all(game: &mut ConnectFour, columns: &[i32]) {
        for &column in columns {
            let player = game.next_player();
            game.play(player, column)
                .unwrap_or_else(|e| panic!("column {column}: {e}"));
        }
    }

    #[test]
    fn test_play_first_disc_lands_on_bottom_row() {
        let mut game = ConnectFour::default();
        assert_eq!(game.play(Player::Red, 3), Ok(0));
        assert_eq!(game.disc(3, 0), Some(Player::Red));
    }

    #[test]
    fn test_play_stacks_discs_in_a_column() {
        let mut game = ConnectFour::default();
        play_all(&mut game, &[2, 2, 2]);
        assert_eq!(game.play(Player::Yellow, 2), Ok(3));
        assert_eq!(game.moves().len(), 4);
    }

    #[test]
    fn test_play_out_of_turn_is_rejected() {
        let mut game = ConnectFour::default();
        assert_eq!(game.play(Player::Yellow, 0), Err(MoveError::NotYourTurn));
        game.play(Player::Red, 0).unwrap();
        assert_eq!(game.play(Player::Red, 1), Err(MoveError::NotYourTurn));
        assert_eq!(game.moves().len(), 1);
    }

    #[test]
    fn test_play_out_of_range_column_is_rejected() {
        let mut game = ConnectFour::default();
        assert_eq!(game.play(Player::Red, 7), Err(MoveError::NoSuchColumn(7)));
        assert_eq!(
            game.play(Player::Red, -1),
            Err(MoveError::NoSuchColumn(-1))
        );
        assert!(game.moves().is_empty());
    }

    #[test]
    fn test_play_full_column_is_rejected_without_state_change() {
        let mut game = ConnectFour::default();
        play_all(&mut game, &[0, 0, 0, 0, 0, 0]);

        let before = game.moves().len();
        let err = game.play(Player::Red, 0).unwrap_err();
        assert_eq!(err, MoveError::ColumnFull);
        assert_eq!(err.to_string(), "This slot is full.");
        assert_eq!(game.moves().len(), before);
        assert_eq!(game.next_player(), Player::Red);
    }

    #[test]
    fn test_winner_horizontal() {
        let mut game = ConnectFour::default();
        // Red 0..=3 on the bottom row, Yellow stacks on top.
        play_all(&mut game, &[0, 0, 1, 1, 2, 2, 3]);
        assert_eq!(game.winner(), Some(Player::Red));
    }

    #[test]
    fn test_winner_vertical() {
        let mut game = ConnectFour::default();
        play_all(&mut game, &[0, 1, 0, 1, 0, 1, 6, 1]);
        assert_eq!(game.winner(), Some(Player::Yellow));
    }

    #[test]
    fn test_winner_rising_diagonal() {
        let mut game = ConnectFour::default();
        //  . . . R
        //  . . R R
        //  . R R Y
        //  R Y Y Y
        play_all(&mut game, &[0, 1, 1, 2, 2, 3, 2, 3, 3, 6, 3]);
        assert_eq!(game.winner(), Some(Player::Red));
    }

    #[test]
    fn test_winner_falling_diagonal() {
        let mut game = ConnectFour::default();
        //  R . . .
        //  R R . .
        //  Y Y R .
        //  Y R Y R
        play_all(&mut game, &[3, 2, 1, 0, 2, 1, 1, 0, 0, 5, 0]);
        assert_eq!(game.winner(), Some(Player::Red));
    }

    #[test]
    fn test_three_in_a_row_is_not_a_win() {
        let mut game = ConnectFour::default();
        play_all(&mut game, &[0, 0, 1, 1, 2, 2]);
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_play_after_win_is_rejected() {
        let mut game = ConnectFour::default();
        play_all(&mut game, &[0, 0, 1, 1, 2, 2, 3]);
        assert_eq!(game.play(Player::Yellow, 4), Err(MoveError::GameOver));
        assert_eq!(game.winner(), Some(Player::Red));
    }
}
