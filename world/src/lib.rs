#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative transition rules for sort-water boards.
//!
//! Every proposer and validator must agree on these rules. Slot `0` is the top
//! of a tube and higher indices are deeper; a tube counts as full for pouring
//! once slot `0` is occupied. [`pour`] mutates a board in place and must be
//! guarded by [`query::can_pour`]; read-only checks live in [`query`].

use rand::{seq::SliceRandom, Rng};
use sortwater_core::{Color, Move, PuzzleState, StateFormatError, Tube};
use thiserror::Error;
use tracing::warn;

pub use query::{can_pour, is_solved, legal_moves};

/// Boards generated per call before a solved layout is accepted as-is.
pub const MAX_GENERATION_ATTEMPTS: usize = 100;

/// Moves `min(run, room)` layers of the source's top color into the destination.
///
/// Layers are transferred one at a time from the source top downward, filling the
/// destination from the slot just above its current top upward. Transfer stops
/// early if a destination slot is unexpectedly occupied. Returns the number of
/// layers moved. The caller must check [`query::can_pour`] first; out-of-range
/// or identical indices move nothing.
pub fn pour(state: &mut PuzzleState, source: usize, destination: usize) -> usize {
    let tube_count = state.tube_count();
    if source == destination || source >= tube_count || destination >= tube_count {
        return 0;
    }

    let tubes = state.tubes_mut();
    let (Some(mut from_index), Some(color)) =
        (tubes[source].top_index(), tubes[source].top_color())
    else {
        return 0;
    };

    let run = tubes[source].top_run();
    let mut to_index = tubes[destination].headroom();
    let mut remaining = run.min(to_index);
    let mut moved = 0;

    while remaining > 0 && to_index > 0 {
        to_index -= 1;
        if tubes[destination].slots()[to_index].is_some() {
            break;
        }
        tubes[destination].slots_mut()[to_index] = Some(color);
        tubes[source].slots_mut()[from_index] = None;
        from_index += 1;
        remaining -= 1;
        moved += 1;
    }

    moved
}

/// Applies `mv` when it is legal, returning the number of layers moved.
pub fn try_pour(state: &mut PuzzleState, mv: Move) -> Option<usize> {
    if !can_pour(state, mv.source(), mv.destination()) {
        return None;
    }
    Some(pour(state, mv.source(), mv.destination()))
}

/// Applies a move sequence to a copy of `state`, stopping at the first illegal move.
pub fn replay(state: &PuzzleState, moves: &[Move]) -> Result<PuzzleState, ReplayError> {
    let mut board = state.clone();
    for (index, mv) in moves.iter().enumerate() {
        if try_pour(&mut board, *mv).is_none() {
            return Err(ReplayError::IllegalMove { index, mv: *mv });
        }
    }
    Ok(board)
}

/// Checks that `moves` is a legal sequence ending in a solved board.
pub fn verify_solution(state: &PuzzleState, moves: &[Move]) -> Result<(), ReplayError> {
    let board = replay(state, moves)?;
    if is_solved(&board) {
        Ok(())
    } else {
        Err(ReplayError::Unsolved { moves: moves.len() })
    }
}

/// Reasons a move sequence fails to solve a board.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// A move was not legal in the board reached so far.
    #[error("move #{index} ({mv}) is not legal")]
    IllegalMove {
        /// Zero-based position of the offending move.
        index: usize,
        /// Offending move.
        mv: Move,
    },
    /// Every move applied but the final board is not solved.
    #[error("board is not solved after {moves} moves")]
    Unsolved {
        /// Number of moves applied.
        moves: usize,
    },
}

impl ReplayError {
    /// Index of the move that could not be applied, if any.
    #[must_use]
    pub fn failed_move(&self) -> Option<usize> {
        match self {
            Self::IllegalMove { index, .. } => Some(*index),
            Self::Unsolved { .. } => None,
        }
    }
}

/// Dimensions of a generated board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoardShape {
    tubes: usize,
    empty: usize,
    capacity: usize,
}

impl BoardShape {
    /// Describes a board of `tubes` tubes, `empty` of them empty, `capacity` slots each.
    pub fn new(tubes: usize, empty: usize, capacity: usize) -> Result<Self, ShapeError> {
        if tubes == 0 {
            return Err(ShapeError::NoTubes);
        }
        if capacity == 0 {
            return Err(ShapeError::ZeroCapacity);
        }
        if empty > tubes {
            return Err(ShapeError::TooManyEmpty { tubes, empty });
        }
        let colors = tubes - empty;
        if colors > usize::from(u8::MAX) + 1 {
            return Err(ShapeError::TooManyColors { colors });
        }
        Ok(Self {
            tubes,
            empty,
            capacity,
        })
    }

    /// Total number of tubes.
    #[must_use]
    pub const fn tubes(&self) -> usize {
        self.tubes
    }

    /// Number of tubes that start empty.
    #[must_use]
    pub const fn empty(&self) -> usize {
        self.empty
    }

    /// Slots per tube, which is also how often each color appears.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of distinct colors, equal to the number of filled tubes.
    #[must_use]
    pub const fn colors(&self) -> usize {
        self.tubes - self.empty
    }
}

/// Reasons a [`BoardShape`] is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// The board would contain no tubes.
    #[error("a board needs at least one tube")]
    NoTubes,
    /// Tubes would have no slots.
    #[error("tube capacity must be positive")]
    ZeroCapacity,
    /// More empty tubes than tubes were requested.
    #[error("{empty} empty tubes requested for a board of {tubes}")]
    TooManyEmpty {
        /// Requested tube count.
        tubes: usize,
        /// Requested empty tube count.
        empty: usize,
    },
    /// More colors than a slot can encode.
    #[error("{colors} colors exceed the slot color limit")]
    TooManyColors {
        /// Requested color count.
        colors: usize,
    },
    /// The assembled board was rejected by the core model.
    #[error(transparent)]
    State(#[from] StateFormatError),
}

/// Result of [`generate_unsolved_state`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedBoard {
    /// Generated board.
    pub state: PuzzleState,
    /// Set when no unsolved layout was found and a solved board was accepted.
    pub degenerate: bool,
}

/// Builds a randomly filled board that is not already solved.
///
/// The first `shape.colors()` tubes are filled, the rest stay empty, and each color
/// appears exactly `shape.capacity()` times with placement shuffled uniformly. After
/// [`MAX_GENERATION_ATTEMPTS`] solved layouts the last one is accepted and flagged
/// as degenerate.
pub fn generate_unsolved_state<R: Rng + ?Sized>(
    shape: BoardShape,
    rng: &mut R,
) -> Result<GeneratedBoard, ShapeError> {
    let mut layers: Vec<Color> = (0..shape.colors())
        .flat_map(|color| std::iter::repeat(Color::new(color as u8)).take(shape.capacity()))
        .collect();

    let mut attempts = 0;
    loop {
        layers.shuffle(rng);
        let state = assemble(shape, &layers)?;
        attempts += 1;

        if !is_solved(&state) {
            return Ok(GeneratedBoard {
                state,
                degenerate: false,
            });
        }

        if attempts >= MAX_GENERATION_ATTEMPTS {
            warn!(
                tubes = shape.tubes(),
                empty = shape.empty(),
                capacity = shape.capacity(),
                attempts,
                "could not generate an unsolved board, accepting a solved one"
            );
            return Ok(GeneratedBoard {
                state,
                degenerate: true,
            });
        }
    }
}

fn assemble(shape: BoardShape, layers: &[Color]) -> Result<PuzzleState, ShapeError> {
    let mut tubes: Vec<Tube> = layers
        .chunks(shape.capacity())
        .map(|chunk| Tube::new(chunk.iter().copied().map(Some).collect()))
        .collect();
    tubes.extend((0..shape.empty()).map(|_| Tube::empty(shape.capacity())));
    Ok(PuzzleState::new(tubes)?)
}

/// Read-only queries over a board.
pub mod query {
    use sortwater_core::{Move, PuzzleState};

    /// Returns `true` when pouring from `source` into `destination` is legal.
    ///
    /// Illegal when the indices match or are out of range, when the source is
    /// empty, or when the destination is full. Legal into an empty destination;
    /// otherwise the two top colors must match.
    #[must_use]
    pub fn can_pour(state: &PuzzleState, source: usize, destination: usize) -> bool {
        if source == destination {
            return false;
        }
        let (Some(from), Some(to)) = (state.tube(source), state.tube(destination)) else {
            return false;
        };
        let Some(color) = from.top_color() else {
            return false;
        };
        if to.is_full() {
            return false;
        }
        match to.top_color() {
            None => true,
            Some(top) => top == color,
        }
    }

    /// Returns `true` when every tube is either empty or filled with one color.
    #[must_use]
    pub fn is_solved(state: &PuzzleState) -> bool {
        state
            .tubes()
            .iter()
            .all(|tube| tube.is_empty() || tube.is_complete())
    }

    /// Enumerates every legal move in source-major order.
    ///
    /// `exclude` suppresses one caller-chosen move; walk generation passes the
    /// reverse of its previous move to avoid immediate oscillation. Validity
    /// checks pass `None`.
    #[must_use]
    pub fn legal_moves(state: &PuzzleState, exclude: Option<Move>) -> Vec<Move> {
        let count = state.tube_count();
        let mut moves = Vec::new();
        for source in 0..count {
            for destination in 0..count {
                let mv = Move::new(source, destination);
                if Some(mv) == exclude {
                    continue;
                }
                if can_pour(state, source, destination) {
                    moves.push(mv);
                }
            }
        }
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn board(matrix: &[&[i32]]) -> PuzzleState {
        let rows: Vec<Vec<i32>> = matrix.iter().map(|row| row.to_vec()).collect();
        PuzzleState::from_matrix(&rows).expect("valid test board")
    }

    #[test]
    fn cannot_pour_into_self_or_from_empty() {
        let state = board(&[&[0, 0], &[-1, -1]]);
        assert!(!can_pour(&state, 0, 0));
        assert!(!can_pour(&state, 1, 0));
        assert!(can_pour(&state, 0, 1));
        assert!(!can_pour(&state, 0, 7));
    }

    #[test]
    fn cannot_pour_into_full_tube() {
        let state = board(&[&[-1, 1, 0], &[1, 1, 0]]);
        assert!(!can_pour(&state, 0, 1));
        assert!(can_pour(&state, 1, 0));
    }

    #[test]
    fn top_colors_must_match() {
        let state = board(&[&[-1, 1, 0], &[-1, 0, 0], &[-1, -1, 1]]);
        assert!(!can_pour(&state, 0, 1));
        assert!(can_pour(&state, 0, 2));
        assert!(can_pour(&state, 2, 0));
    }

    #[test]
    fn pour_moves_whole_run_when_room_allows() {
        let mut state = board(&[&[1, 1, 0], &[-1, -1, -1]]);
        assert_eq!(pour(&mut state, 0, 1), 2);
        assert_eq!(state, board(&[&[-1, -1, 0], &[-1, 1, 1]]));
    }

    #[test]
    fn pour_is_limited_by_destination_room() {
        let mut state = board(&[&[2, 2, 2, 0], &[-1, 2, 1, 1]]);
        assert_eq!(pour(&mut state, 0, 1), 1);
        assert_eq!(state, board(&[&[-1, 2, 2, 0], &[2, 2, 1, 1]]));
    }

    #[test]
    fn try_pour_refuses_illegal_moves() {
        let mut state = board(&[&[0, 0], &[1, 1]]);
        let before = state.clone();
        assert_eq!(try_pour(&mut state, Move::new(0, 1)), None);
        assert_eq!(state, before);
    }

    #[test]
    fn solved_requires_uniform_full_or_empty_tubes() {
        assert!(is_solved(&board(&[&[0, 0], &[1, 1], &[-1, -1]])));
        assert!(!is_solved(&board(&[&[-1, 0], &[0, 1], &[1, -1]])));
        assert!(!is_solved(&board(&[&[-1, 0], &[0, 0]])));
        assert!(!is_solved(&board(&[&[0, 1], &[1, 0]])));
    }

    #[test]
    fn legal_moves_honour_exclusion() {
        let state = board(&[&[-1, 0], &[-1, 0], &[-1, -1]]);
        let all = legal_moves(&state, None);
        assert_eq!(
            all,
            vec![
                Move::new(0, 1),
                Move::new(0, 2),
                Move::new(1, 0),
                Move::new(1, 2)
            ]
        );

        let filtered = legal_moves(&state, Some(Move::new(1, 0)));
        assert_eq!(filtered.len(), 3);
        assert!(!filtered.contains(&Move::new(1, 0)));
    }

    #[test]
    fn replay_reports_first_illegal_move() {
        let state = board(&[&[0, 1], &[-1, 0], &[-1, 1]]);
        let error = replay(&state, &[Move::new(0, 1), Move::new(1, 0)]).expect_err("illegal");
        assert_eq!(
            error,
            ReplayError::IllegalMove {
                index: 1,
                mv: Move::new(1, 0)
            }
        );
        assert_eq!(error.failed_move(), Some(1));
    }

    #[test]
    fn verify_solution_accepts_solving_sequence() {
        let state = board(&[&[0, 1], &[-1, 0], &[-1, 1]]);
        assert_eq!(verify_solution(&state, &[Move::new(0, 1), Move::new(0, 2)]), Ok(()));
        assert_eq!(
            verify_solution(&state, &[Move::new(0, 1)]),
            Err(ReplayError::Unsolved { moves: 1 })
        );
    }

    #[test]
    fn generated_board_respects_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let shape = BoardShape::new(6, 2, 4).expect("valid shape");
        let generated = generate_unsolved_state(shape, &mut rng).expect("generated board");

        assert!(!generated.degenerate);
        assert!(!is_solved(&generated.state));
        assert_eq!(generated.state.tube_count(), 6);
        assert_eq!(generated.state.capacity(), 4);

        let tubes = generated.state.tubes();
        assert!(tubes[..4].iter().all(|tube| tube.headroom() == 0));
        assert!(tubes[4..].iter().all(Tube::is_empty));

        let counts = generated.state.color_counts();
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|count| *count == 4));
    }

    #[test]
    fn single_color_board_is_flagged_degenerate() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let shape = BoardShape::new(2, 1, 3).expect("valid shape");
        let generated = generate_unsolved_state(shape, &mut rng).expect("generated board");
        assert!(generated.degenerate);
        assert!(is_solved(&generated.state));
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        assert_eq!(BoardShape::new(0, 0, 4), Err(ShapeError::NoTubes));
        assert_eq!(BoardShape::new(3, 1, 0), Err(ShapeError::ZeroCapacity));
        assert_eq!(
            BoardShape::new(3, 4, 2),
            Err(ShapeError::TooManyEmpty { tubes: 3, empty: 4 })
        );
    }
}
