use std::collections::{HashSet, VecDeque};

use rkyv::{Archive, Deserialize, Serialize};
use thiserror::Error;

pub const GRID_SIZE_DEFAULT: i32 = 10;
pub const SHAPE_SIZE_DEFAULT: u32 = 10;

pub const DIR_UP: usize = 0;
pub const DIR_RIGHT: usize = 1;
pub const DIR_DOWN: usize = 2;
pub const DIR_LEFT: usize = 3;

const DIR_OFFSETS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct GridSpec {
    pub size: i32,
    pub pieces: u32,
}

pub const DEFAULT_GRID: GridSpec = GridSpec {
    size: GRID_SIZE_DEFAULT,
    pieces: SHAPE_SIZE_DEFAULT,
};

impl GridSpec {
    pub fn new(size: i32, pieces: u32) -> Self {
        Self { size, pieces }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.size && cell.y < self.size
    }

    pub fn cell_count(&self) -> usize {
        let side = self.size.max(0) as usize;
        side * side
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> {
        let size = self.size;
        (0..size).flat_map(move |x| (0..size).map(move |y| Cell::new(x, y)))
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        DEFAULT_GRID
    }
}

/// A board coordinate. `y` grows upwards; row 0 of a rendered grid is `y = size - 1`.
///
/// Ordering is by `x`, then `y`, which is also the tie-break order for
/// equidistant move candidates.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn neighbor(self, dir: usize) -> Cell {
        let (dx, dy) = DIR_OFFSETS[dir % 4];
        Cell::new(self.x + dx, self.y + dy)
    }

    pub fn neighbors(self) -> [Cell; 4] {
        [
            self.neighbor(DIR_UP),
            self.neighbor(DIR_RIGHT),
            self.neighbor(DIR_DOWN),
            self.neighbor(DIR_LEFT),
        ]
    }

    pub fn center(self) -> (f32, f32) {
        (self.x as f32 + 0.5, self.y as f32 + 0.5)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("shape must have {expected} cells, got {found}")]
    WrongSize { expected: usize, found: usize },
    #[error("cell {cell} at index {index} is outside the grid")]
    OutOfBounds { index: usize, cell: Cell },
    #[error("cell {cell} at index {index} is occupied twice")]
    Duplicate { index: usize, cell: Cell },
    #[error("shape is not a single connected region")]
    Disconnected,
}

/// The occupied cells of a room. Indexes address pieces; spatial meaning is order independent.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Shape {
    cells: Vec<Cell>,
}

impl Shape {
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Horizontal line through the middle row, the starting shape of every room.
    pub fn line(grid: GridSpec) -> Self {
        let y = grid.size / 2;
        let cells = (0..grid.pieces as i32).map(|x| Cell::new(x, y)).collect();
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, piece: usize) -> Option<Cell> {
        self.cells.get(piece).copied()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn piece_at(&self, cell: Cell) -> Option<usize> {
        self.cells.iter().position(|c| *c == cell)
    }

    /// Copy of the shape with `piece` relocated. Out-of-range pieces leave it unchanged.
    pub fn with_piece_at(&self, piece: usize, destination: Cell) -> Shape {
        let mut cells = self.cells.clone();
        if let Some(slot) = cells.get_mut(piece) {
            *slot = destination;
        }
        Shape { cells }
    }

    pub fn without_piece(&self, piece: usize) -> Vec<Cell> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != piece)
            .map(|(_, cell)| *cell)
            .collect()
    }

    pub fn validate(&self, grid: GridSpec) -> Result<(), ShapeError> {
        let expected = grid.pieces as usize;
        if self.cells.len() != expected {
            return Err(ShapeError::WrongSize {
                expected,
                found: self.cells.len(),
            });
        }
        let mut seen = HashSet::with_capacity(self.cells.len());
        for (index, cell) in self.cells.iter().enumerate() {
            if !grid.contains(*cell) {
                return Err(ShapeError::OutOfBounds { index, cell: *cell });
            }
            if !seen.insert(*cell) {
                return Err(ShapeError::Duplicate { index, cell: *cell });
            }
        }
        Ok(())
    }

    pub fn validate_connected(&self, grid: GridSpec) -> Result<(), ShapeError> {
        self.validate(grid)?;
        if !is_connected(&self.cells) {
            return Err(ShapeError::Disconnected);
        }
        Ok(())
    }

    /// Binary occupancy matrix, row 0 at the top of the board.
    pub fn to_matrix(&self, grid: GridSpec) -> Vec<Vec<u8>> {
        let side = grid.size.max(0) as usize;
        let mut matrix = vec![vec![0u8; side]; side];
        for cell in &self.cells {
            if !grid.contains(*cell) {
                continue;
            }
            let row = (grid.size - 1 - cell.y) as usize;
            matrix[row][cell.x as usize] = 1;
        }
        matrix
    }
}

/// Whether `cells`, taken as a set, form one 4-connected region. The empty set is connected.
pub fn is_connected(cells: &[Cell]) -> bool {
    let members: HashSet<Cell> = cells.iter().copied().collect();
    let Some(start) = cells.first().copied() else {
        return true;
    };
    let mut visited = HashSet::with_capacity(members.len());
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        for neighbor in cell.neighbors() {
            if members.contains(&neighbor) && visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }
    visited.len() == members.len()
}
