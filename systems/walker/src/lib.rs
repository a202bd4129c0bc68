#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Random-walk solver used to attach step counts and solutions to generated boards.

use rand::{seq::SliceRandom, Rng};
use sortwater_core::{Move, PuzzleState};
use sortwater_world::{is_solved, legal_moves, pour};
use tracing::debug;

/// Default step budget of a single walk.
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Default number of walks attempted per board.
pub const DEFAULT_WALKS_PER_BOARD: usize = 8;

/// Limits applied to the walks performed for one board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkConfig {
    max_steps: usize,
    walks_per_board: usize,
}

impl WalkConfig {
    /// Creates a configuration with the provided step budget and walk count.
    #[must_use]
    pub const fn new(max_steps: usize, walks_per_board: usize) -> Self {
        Self {
            max_steps,
            walks_per_board,
        }
    }

    /// Moves allowed before a walk is truncated.
    #[must_use]
    pub const fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Walks attempted before giving up on a board.
    #[must_use]
    pub const fn walks_per_board(&self) -> usize {
        self.walks_per_board
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS, DEFAULT_WALKS_PER_BOARD)
    }
}

/// Pure system searching for solutions with uniformly random legal moves.
///
/// Each step excludes the reverse of the previous move so a walk does not pour
/// the same layers back and forth. A walk ends when the board is solved, when no
/// legal move remains, or when the step budget runs out.
#[derive(Debug)]
pub struct Walker<R> {
    config: WalkConfig,
    rng: R,
}

impl<R: Rng> Walker<R> {
    /// Creates a walker drawing moves from `rng`.
    pub fn new(config: WalkConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> WalkConfig {
        self.config
    }

    /// Random source, shared with board generation by callers.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Runs up to `walks_per_board` walks and returns the shortest solving one.
    ///
    /// An already solved board yields an empty solution.
    pub fn solve(&mut self, state: &PuzzleState) -> Option<Vec<Move>> {
        if is_solved(state) {
            return Some(Vec::new());
        }

        let mut best: Option<Vec<Move>> = None;
        for walk in 0..self.config.walks_per_board {
            let Some(path) = self.walk(state) else {
                continue;
            };
            debug!(walk, steps = path.len(), "walk solved board");
            if best.as_ref().map_or(true, |current| path.len() < current.len()) {
                best = Some(path);
            }
        }
        best
    }

    fn walk(&mut self, state: &PuzzleState) -> Option<Vec<Move>> {
        let mut board = state.clone();
        let mut path = Vec::new();
        let mut previous: Option<Move> = None;

        for _ in 0..self.config.max_steps {
            let moves = legal_moves(&board, previous.map(|mv| mv.reversed()));
            let mv = *moves.choose(&mut self.rng)?;
            let _ = pour(&mut board, mv.source(), mv.destination());
            path.push(mv);
            if is_solved(&board) {
                return Some(path);
            }
            previous = Some(mv);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sortwater_world::{generate_unsolved_state, verify_solution, BoardShape};

    fn board(rows: &[&[i32]]) -> PuzzleState {
        let rows: Vec<Vec<i32>> = rows.iter().map(|row| row.to_vec()).collect();
        PuzzleState::from_matrix(&rows).expect("valid board")
    }

    #[test]
    fn solved_board_needs_no_moves() {
        let mut walker = Walker::new(WalkConfig::default(), ChaCha8Rng::seed_from_u64(3));
        assert_eq!(walker.solve(&board(&[&[0, 0], &[-1, -1]])), Some(Vec::new()));
    }

    #[test]
    fn one_move_board_is_solved_in_one_step() {
        let mut walker = Walker::new(WalkConfig::new(10, 4), ChaCha8Rng::seed_from_u64(3));
        let state = board(&[&[-1, 0], &[-1, 0]]);
        let solution = walker.solve(&state).expect("solvable");
        assert_eq!(solution.len(), 1);
        assert_eq!(verify_solution(&state, &solution), Ok(()));
    }

    #[test]
    fn dead_end_board_has_no_solution() {
        let mut walker = Walker::new(WalkConfig::new(50, 3), ChaCha8Rng::seed_from_u64(9));
        assert_eq!(walker.solve(&board(&[&[0, 1], &[1, 0]])), None);
    }

    #[test]
    fn zero_budget_never_solves() {
        let mut walker = Walker::new(WalkConfig::new(0, 5), ChaCha8Rng::seed_from_u64(1));
        assert_eq!(walker.solve(&board(&[&[-1, 0], &[-1, 0]])), None);
    }

    #[test]
    fn found_solutions_replay_on_generated_boards() {
        let mut walker = Walker::new(WalkConfig::new(200, 16), ChaCha8Rng::seed_from_u64(11));
        let shape = BoardShape::new(5, 2, 3).expect("shape");
        for _ in 0..10 {
            let state = generate_unsolved_state(shape, walker.rng_mut())
                .expect("generated")
                .state;
            if let Some(solution) = walker.solve(&state) {
                assert!(solution.len() <= 200);
                assert_eq!(verify_solution(&state, &solution), Ok(()));
            }
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_solution() {
        let state = board(&[&[0, 1, 1], &[1, 0, 0], &[-1, -1, -1], &[-1, -1, -1]]);
        let mut first = Walker::new(WalkConfig::default(), ChaCha8Rng::seed_from_u64(42));
        let mut second = Walker::new(WalkConfig::default(), ChaCha8Rng::seed_from_u64(42));
        assert_eq!(first.solve(&state), second.solve(&state));
    }
}
