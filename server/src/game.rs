//! Nim rules engine
//!
//! A pure state machine for one match: the randomly drawn piles, the two
//! players, the turn holder/waiting pair, and the observers watching. No
//! I/O happens here; the handlers turn move outcomes into responses and
//! notifications.

use rand::Rng;
use std::collections::HashSet;

pub const MIN_PILES: usize = 3;
pub const MAX_PILES: usize = 5;
pub const MIN_PILE_SIZE: u32 = 1;
pub const MAX_PILE_SIZE: u32 = 7;

/// Why a move was rejected, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// The mover is not the current turn holder.
    NotYourTurn,
    /// The set index is outside this game's piles.
    NoSuchSet,
    /// The object count is below 1 or above the targeted pile's size.
    IllegalCount,
}

/// An accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// True when the move emptied the last pile; the mover has won.
    pub finished: bool,
}

/// One ongoing match between two users, identified by connection id.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: u64,
    pub player1: u64,
    pub player2: u64,
    /// The player whose move it is. Always one of the two players, and
    /// never equal to `waiting`.
    pub turn: u64,
    pub waiting: u64,
    pub observers: HashSet<u64>,
    piles: Vec<u32>,
}

impl Game {
    /// Creates a game with 3 to 5 piles of 1 to 7 objects each, drawn
    /// uniformly at random. The challenger (`player1`) moves first.
    pub fn new(id: u64, player1: u64, player2: u64) -> Self {
        let mut rng = rand::thread_rng();
        let count = rng.gen_range(MIN_PILES..=MAX_PILES);
        let piles = (0..count)
            .map(|_| rng.gen_range(MIN_PILE_SIZE..=MAX_PILE_SIZE))
            .collect();
        Game::with_piles(id, player1, player2, piles)
    }

    /// Creates a game over known piles, so the rules can be exercised
    /// deterministically.
    pub fn with_piles(id: u64, player1: u64, player2: u64, piles: Vec<u32>) -> Self {
        Game {
            id,
            player1,
            player2,
            turn: player1,
            waiting: player2,
            observers: HashSet::new(),
            piles,
        }
    }

    pub fn piles(&self) -> &[u32] {
        &self.piles
    }

    pub fn is_player(&self, user: u64) -> bool {
        user == self.player1 || user == self.player2
    }

    pub fn opponent_of(&self, user: u64) -> u64 {
        if user == self.player1 {
            self.player2
        } else {
            self.player1
        }
    }

    /// Applies "remove `n` objects from set `s`" for `player`.
    ///
    /// On success pile `s` shrinks by exactly `n` and the turn holder and
    /// waiting player swap. On any error the piles and turn are untouched.
    pub fn remove(&mut self, player: u64, n: i64, s: i64) -> Result<MoveOutcome, MoveError> {
        if player != self.turn {
            return Err(MoveError::NotYourTurn);
        }
        if s < 1 || s as usize > self.piles.len() {
            return Err(MoveError::NoSuchSet);
        }
        let index = (s - 1) as usize;
        if n < 1 || n > i64::from(self.piles[index]) {
            return Err(MoveError::IllegalCount);
        }

        self.piles[index] -= n as u32;
        std::mem::swap(&mut self.turn, &mut self.waiting);

        Ok(MoveOutcome {
            finished: self.piles.iter().all(|&pile| pile == 0),
        })
    }

    /// Renders the two-row pile table sent in game bodies:
    /// set numbers on the first row, object counts on the second.
    pub fn pile_table(&self) -> String {
        let mut sets = String::from("Set:    ");
        let mut objects = String::from("Objects:");
        for (index, pile) in self.piles.iter().enumerate() {
            sets.push_str(&format!(" {:>2}", index + 1));
            objects.push_str(&format!(" {:>2}", pile));
        }
        format!("{sets}\n{objects}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_move_decrements_and_swaps_turn() {
        let mut game = Game::with_piles(1, 10, 20, vec![3, 5, 2]);

        let outcome = game.remove(10, 2, 2).unwrap();

        assert_eq!(game.piles(), &[3, 3, 2]);
        assert_eq!(game.turn, 20);
        assert_eq!(game.waiting, 10);
        assert!(!outcome.finished);
    }

    #[test]
    fn test_move_out_of_turn_changes_nothing() {
        let mut game = Game::with_piles(1, 10, 20, vec![3, 5, 2]);

        assert_eq!(game.remove(20, 1, 1), Err(MoveError::NotYourTurn));
        assert_eq!(game.piles(), &[3, 5, 2]);
        assert_eq!(game.turn, 10);
    }

    #[test]
    fn test_set_out_of_range_changes_nothing() {
        let mut game = Game::with_piles(1, 10, 20, vec![3, 5, 2]);

        assert_eq!(game.remove(10, 1, 0), Err(MoveError::NoSuchSet));
        assert_eq!(game.remove(10, 1, 4), Err(MoveError::NoSuchSet));
        assert_eq!(game.remove(10, 1, -2), Err(MoveError::NoSuchSet));
        assert_eq!(game.piles(), &[3, 5, 2]);
        assert_eq!(game.turn, 10);
    }

    #[test]
    fn test_count_out_of_range_changes_nothing() {
        let mut game = Game::with_piles(1, 10, 20, vec![3, 5, 2]);

        assert_eq!(game.remove(10, 0, 1), Err(MoveError::IllegalCount));
        assert_eq!(game.remove(10, -1, 1), Err(MoveError::IllegalCount));
        assert_eq!(game.remove(10, 4, 1), Err(MoveError::IllegalCount));
        assert_eq!(game.remove(10, 100, 1), Err(MoveError::IllegalCount));
        assert_eq!(game.piles(), &[3, 5, 2]);
        assert_eq!(game.turn, 10);
    }

    #[test]
    fn test_taking_the_last_object_wins() {
        let mut game = Game::with_piles(1, 10, 20, vec![1, 2]);

        let first = game.remove(10, 2, 2).unwrap();
        assert!(!first.finished);

        let last = game.remove(20, 1, 1).unwrap();
        assert!(last.finished);
        assert_eq!(game.piles(), &[0, 0]);
    }

    #[test]
    fn test_pile_sum_strictly_decreases() {
        let mut game = Game::with_piles(1, 10, 20, vec![4, 4]);
        let moves = [(10, 2, 1), (20, 2, 2), (10, 2, 1), (20, 2, 2)];
        let mut previous: u32 = game.piles().iter().sum();

        for (mover, n, s) in moves {
            game.remove(mover, n, s).unwrap();
            let sum: u32 = game.piles().iter().sum();
            assert_eq!(sum, previous - n as u32);
            previous = sum;
        }
        assert!(game.piles().iter().all(|&pile| pile == 0));
    }

    #[test]
    fn test_random_init_respects_bounds() {
        for id in 0..50 {
            let game = Game::new(id, 1, 2);
            let count = game.piles().len();
            assert!((MIN_PILES..=MAX_PILES).contains(&count));
            for &pile in game.piles() {
                assert!((MIN_PILE_SIZE..=MAX_PILE_SIZE).contains(&pile));
            }
            assert_eq!(game.turn, 1);
            assert_eq!(game.waiting, 2);
        }
    }

    #[test]
    fn test_pile_table_has_two_rows() {
        let game = Game::with_piles(1, 10, 20, vec![3, 7, 1]);
        let table = game.pile_table();

        assert_eq!(table, "Set:      1  2  3\nObjects:  3  7  1");
    }

    #[test]
    fn test_opponent_and_membership() {
        let game = Game::with_piles(1, 10, 20, vec![1, 1, 1]);

        assert_eq!(game.opponent_of(10), 20);
        assert_eq!(game.opponent_of(20), 10);
        assert!(game.is_player(10));
        assert!(game.is_player(20));
        assert!(!game.is_player(30));
    }
}
