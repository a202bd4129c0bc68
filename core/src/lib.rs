#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the sort-water curation workspace.
//!
//! This crate defines the board model that every proposer, validator and
//! store agrees on. A [`PuzzleState`] is an ordered row of [`Tube`] values;
//! each tube is a fixed-capacity column of slots where slot `0` is the top
//! (pourable end) and higher indices sit deeper in the tube. The transition
//! rules that operate on these types live in `sortwater-world`; the pipeline
//! types that flow between the ingestion systems live in the [`difficulty`],
//! [`level`] and [`event`] modules.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod difficulty;
pub mod event;
pub mod level;

pub use difficulty::{
    DifficultyBucket, DistributionStats, StepsRange, StepsThresholds, TargetDistribution,
    UNKNOWN_BUCKET,
};
pub use event::{IngestEvent, RejectionReason, SelectionMode};
pub use level::{Candidate, ContentId, Level, LevelId, NewLevel, ProposedLevel};

/// Matrix value used to encode an empty slot.
pub const EMPTY_SLOT: i32 = -1;

/// Largest color index representable in a slot.
pub const MAX_COLOR: i32 = u8::MAX as i32;

/// Color index stored inside an occupied slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(u8);

impl Color {
    /// Creates a new color from its zero-based index.
    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    /// Zero-based index of the color.
    #[must_use]
    pub const fn index(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contents of a single layer slot: either a color or empty.
pub type Slot = Option<Color>;

/// Fixed-capacity column of layer slots. Slot `0` is the top of the tube.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tube {
    slots: Vec<Slot>,
}

impl Tube {
    /// Creates a tube from explicit slot contents ordered top to bottom.
    #[must_use]
    pub fn new(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    /// Creates a tube with every slot empty.
    #[must_use]
    pub fn empty(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Creates a tube where every slot holds the same color.
    #[must_use]
    pub fn filled(color: Color, capacity: usize) -> Self {
        Self {
            slots: vec![Some(color); capacity],
        }
    }

    /// Number of slots in the tube.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot contents ordered top to bottom.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Mutable access to the slots. The slot count cannot change through this view.
    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// Index of the topmost occupied slot, or `None` when the tube is empty.
    #[must_use]
    pub fn top_index(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_some)
    }

    /// Color of the topmost occupied slot.
    #[must_use]
    pub fn top_color(&self) -> Option<Color> {
        self.top_index().and_then(|index| self.slots[index])
    }

    /// Number of consecutive occupied slots at the top sharing the top color.
    #[must_use]
    pub fn top_run(&self) -> usize {
        let Some(start) = self.top_index() else {
            return 0;
        };
        let color = self.slots[start];
        self.slots[start..]
            .iter()
            .take_while(|slot| **slot == color)
            .count()
    }

    /// Number of empty slots above the topmost occupied slot.
    ///
    /// Equals the capacity for an empty tube and zero when slot `0` is occupied.
    #[must_use]
    pub fn headroom(&self) -> usize {
        self.top_index().unwrap_or(self.slots.len())
    }

    /// Returns `true` when no slot is occupied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Returns `true` when the tube has no headroom left to receive a pour.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.headroom() == 0
    }

    /// Returns `true` when every slot is occupied by one and the same color.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self.slots.first() {
            Some(Some(color)) => self.slots.iter().all(|slot| *slot == Some(*color)),
            _ => false,
        }
    }

    /// Number of slots holding the provided color.
    #[must_use]
    pub fn count_of(&self, color: Color) -> usize {
        self.slots.iter().filter(|slot| **slot == Some(color)).count()
    }
}

/// Ordered row of tubes sharing one capacity. Tube order is significant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i32>>", into = "Vec<Vec<i32>>")]
pub struct PuzzleState {
    tubes: Vec<Tube>,
}

impl PuzzleState {
    /// Creates a board from tubes, rejecting empty boards and mixed capacities.
    pub fn new(tubes: Vec<Tube>) -> Result<Self, StateFormatError> {
        let Some(first) = tubes.first() else {
            return Err(StateFormatError::NoTubes);
        };
        let capacity = first.capacity();
        if capacity == 0 {
            return Err(StateFormatError::ZeroCapacity);
        }
        if let Some((tube, mismatch)) = tubes
            .iter()
            .enumerate()
            .find(|(_, tube)| tube.capacity() != capacity)
        {
            return Err(StateFormatError::RaggedTube {
                tube,
                expected: capacity,
                found: mismatch.capacity(),
            });
        }
        Ok(Self { tubes })
    }

    /// Parses an `N x K` integer matrix using [`EMPTY_SLOT`] for empty slots.
    pub fn from_matrix(matrix: &[Vec<i32>]) -> Result<Self, StateFormatError> {
        let mut tubes = Vec::with_capacity(matrix.len());
        for (tube_index, row) in matrix.iter().enumerate() {
            let mut slots = Vec::with_capacity(row.len());
            for (slot_index, value) in row.iter().copied().enumerate() {
                let slot = match value {
                    EMPTY_SLOT => None,
                    0..=MAX_COLOR => Some(Color::new(value as u8)),
                    _ => {
                        return Err(StateFormatError::InvalidSlot {
                            tube: tube_index,
                            slot: slot_index,
                            value,
                        })
                    }
                };
                slots.push(slot);
            }
            tubes.push(Tube::new(slots));
        }
        Self::new(tubes)
    }

    /// Encodes the board as an `N x K` integer matrix using [`EMPTY_SLOT`] for empty slots.
    #[must_use]
    pub fn to_matrix(&self) -> Vec<Vec<i32>> {
        self.tubes
            .iter()
            .map(|tube| {
                tube.slots()
                    .iter()
                    .map(|slot| slot.map_or(EMPTY_SLOT, |color| i32::from(color.index())))
                    .collect()
            })
            .collect()
    }

    /// Tubes composing the board in their significant order.
    #[must_use]
    pub fn tubes(&self) -> &[Tube] {
        &self.tubes
    }

    /// Mutable access to the tubes. Tube count and order cannot change through this view.
    pub fn tubes_mut(&mut self) -> &mut [Tube] {
        &mut self.tubes
    }

    /// Retrieves the tube stored at the provided index.
    #[must_use]
    pub fn tube(&self, index: usize) -> Option<&Tube> {
        self.tubes.get(index)
    }

    /// Number of tubes on the board.
    #[must_use]
    pub fn tube_count(&self) -> usize {
        self.tubes.len()
    }

    /// Slot capacity shared by every tube.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tubes.first().map_or(0, Tube::capacity)
    }

    /// Counts occupied slots per color across the whole board.
    #[must_use]
    pub fn color_counts(&self) -> BTreeMap<Color, usize> {
        let mut counts = BTreeMap::new();
        for color in self.tubes.iter().flat_map(|tube| tube.slots().iter().flatten()) {
            *counts.entry(*color).or_insert(0) += 1;
        }
        counts
    }
}

impl TryFrom<Vec<Vec<i32>>> for PuzzleState {
    type Error = StateFormatError;

    fn try_from(matrix: Vec<Vec<i32>>) -> Result<Self, Self::Error> {
        Self::from_matrix(&matrix)
    }
}

impl From<PuzzleState> for Vec<Vec<i32>> {
    fn from(state: PuzzleState) -> Self {
        state.to_matrix()
    }
}

/// Reasons a slot matrix cannot be interpreted as a [`PuzzleState`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StateFormatError {
    /// The matrix contained no tubes.
    #[error("board contains no tubes")]
    NoTubes,
    /// The tubes have no slots.
    #[error("tubes must hold at least one slot")]
    ZeroCapacity,
    /// A tube's slot count differed from the first tube's.
    #[error("tube {tube} holds {found} slots, expected {expected}")]
    RaggedTube {
        /// Index of the offending tube.
        tube: usize,
        /// Capacity of the first tube.
        expected: usize,
        /// Capacity of the offending tube.
        found: usize,
    },
    /// A slot held a value that is neither empty nor a color index.
    #[error("tube {tube} slot {slot} holds invalid value {value}")]
    InvalidSlot {
        /// Index of the offending tube.
        tube: usize,
        /// Index of the offending slot inside the tube.
        slot: usize,
        /// Raw value found in the matrix.
        value: i32,
    },
}

/// Pour from one tube into another, serialized as a `[from, to]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Move {
    source: usize,
    destination: usize,
}

impl Move {
    /// Creates a move pouring from `source` into `destination`.
    #[must_use]
    pub const fn new(source: usize, destination: usize) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Index of the tube poured from.
    #[must_use]
    pub const fn source(&self) -> usize {
        self.source
    }

    /// Index of the tube poured into.
    #[must_use]
    pub const fn destination(&self) -> usize {
        self.destination
    }

    /// Move pouring in the opposite direction.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self::new(self.destination, self.source)
    }
}

impl From<[usize; 2]> for Move {
    fn from([source, destination]: [usize; 2]) -> Self {
        Self::new(source, destination)
    }
}

impl From<Move> for [usize; 2] {
    fn from(mv: Move) -> Self {
        [mv.source, mv.destination]
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.destination)
    }
}
