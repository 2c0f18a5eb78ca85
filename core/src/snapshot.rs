use rkyv::{Archive, Deserialize, Serialize};

use crate::grid::{GridSpec, Shape};
use crate::protocol::ParticipantId;

/// Append-only record of shapes, one per committed move. The first entry is the starting shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveHistory {
    snapshots: Vec<Shape>,
}

impl MoveHistory {
    pub fn new(initial: Shape) -> Self {
        Self {
            snapshots: vec![initial],
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.snapshots.push(shape);
    }

    pub fn initial(&self) -> &Shape {
        &self.snapshots[0]
    }

    pub fn latest(&self) -> &Shape {
        &self.snapshots[self.snapshots.len() - 1]
    }

    pub fn move_count(&self) -> usize {
        self.snapshots.len() - 1
    }

    pub fn snapshots(&self) -> &[Shape] {
        &self.snapshots
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ShapeGuess {
    pub participant: ParticipantId,
    pub label: String,
}

/// End-of-game summary broadcast by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct GameSummary {
    pub room_id: String,
    pub total_moves: u32,
    pub final_shape: Shape,
    pub participants: Vec<ParticipantId>,
    pub guesses: Vec<ShapeGuess>,
}

/// One finished game as kept in the local gallery.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub room_id: String,
    pub grid: Vec<Vec<u8>>,
    pub timestamp_ms: i64,
    pub move_count: u32,
    pub participants: Vec<ParticipantId>,
    pub guesses: Option<Vec<ShapeGuess>>,
}

impl SummaryRecord {
    pub fn from_summary(summary: &GameSummary, grid: GridSpec, timestamp_ms: i64) -> Self {
        let guesses = if summary.guesses.is_empty() {
            None
        } else {
            Some(summary.guesses.clone())
        };
        Self {
            room_id: summary.room_id.clone(),
            grid: summary.final_shape.to_matrix(grid),
            timestamp_ms,
            move_count: summary.total_moves,
            participants: summary.participants.clone(),
            guesses,
        }
    }

    pub fn occupied_cells(&self) -> usize {
        self.grid
            .iter()
            .map(|row| row.iter().filter(|value| **value != 0).count())
            .sum()
    }
}
