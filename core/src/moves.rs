use std::collections::{BTreeSet, HashSet};

use rkyv::{Archive, Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{is_connected, Cell, GridSpec, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct Move {
    pub piece: u32,
    pub destination: Cell,
}

impl Move {
    pub fn new(piece: u32, destination: Cell) -> Self {
        Self { piece, destination }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("piece {piece} does not exist (shape has {len} pieces)")]
    NoSuchPiece { piece: u32, len: usize },
    #[error("piece {piece} holds the shape together and cannot move")]
    Articulation { piece: u32 },
    #[error("piece {piece} cannot move to {destination}")]
    NotAllowed { piece: u32, destination: Cell },
    #[error("piece {piece} has no free cell to move to")]
    NoDestination { piece: u32 },
}

/// Legal destinations for `piece`: empty in-bounds cells bordering the rest of the shape.
///
/// Returns nothing when lifting the piece would split the shape. A single-piece
/// shape has no remainder to stay attached to, so every other in-bounds cell is
/// allowed.
pub fn allowed_moves(shape: &Shape, piece: usize, grid: GridSpec) -> BTreeSet<Cell> {
    let Some(current) = shape.get(piece) else {
        return BTreeSet::new();
    };
    let remaining = shape.without_piece(piece);
    if remaining.is_empty() {
        return grid.cells().filter(|cell| *cell != current).collect();
    }
    if !is_connected(&remaining) {
        return BTreeSet::new();
    }
    let occupied: HashSet<Cell> = shape.cells().iter().copied().collect();
    remaining
        .iter()
        .flat_map(|cell| cell.neighbors())
        .filter(|cell| grid.contains(*cell) && !occupied.contains(cell))
        .collect()
}

pub fn is_movable(shape: &Shape, piece: usize) -> bool {
    if piece >= shape.len() {
        return false;
    }
    is_connected(&shape.without_piece(piece))
}

pub fn check_move(shape: &Shape, mv: Move, grid: GridSpec) -> Result<(), MoveError> {
    let piece = mv.piece as usize;
    if piece >= shape.len() {
        return Err(MoveError::NoSuchPiece {
            piece: mv.piece,
            len: shape.len(),
        });
    }
    if !is_movable(shape, piece) {
        return Err(MoveError::Articulation { piece: mv.piece });
    }
    if !allowed_moves(shape, piece, grid).contains(&mv.destination) {
        return Err(MoveError::NotAllowed {
            piece: mv.piece,
            destination: mv.destination,
        });
    }
    Ok(())
}

pub fn apply_move(shape: &Shape, mv: Move, grid: GridSpec) -> Result<Shape, MoveError> {
    check_move(shape, mv, grid)?;
    Ok(shape.with_piece_at(mv.piece as usize, mv.destination))
}

/// Candidate whose center is closest to `point` (board units, y up).
///
/// Equidistant candidates resolve to the lowest `x`, then lowest `y`.
pub fn nearest_candidate<'a, I>(candidates: I, point: (f32, f32)) -> Option<Cell>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut best: Option<(Cell, f32)> = None;
    for cell in candidates {
        let (cx, cy) = cell.center();
        let dist_sq = (point.0 - cx).powi(2) + (point.1 - cy).powi(2);
        match &best {
            Some((best_cell, best_dist))
                if dist_sq > *best_dist || (dist_sq == *best_dist && *cell >= *best_cell) => {}
            _ => best = Some((*cell, dist_sq)),
        }
    }
    best.map(|(cell, _)| cell)
}
