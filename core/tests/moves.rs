use std::collections::BTreeSet;

use foraging_core::{
    allowed_moves, apply_move, check_move, is_connected, nearest_candidate, Cell, GridSpec, Move,
    MoveError, Shape, DEFAULT_GRID,
};
use proptest::prelude::*;

fn line_shape() -> Shape {
    Shape::line(DEFAULT_GRID)
}

fn cells(list: &[(i32, i32)]) -> Vec<Cell> {
    list.iter().map(|(x, y)| Cell::new(*x, *y)).collect()
}

#[test]
fn line_shape_starts_on_middle_row() {
    let shape = line_shape();
    assert_eq!(shape.len(), 10);
    assert!(shape.cells().iter().all(|cell| cell.y == 5));
    assert_eq!(shape.get(0), Some(Cell::new(0, 5)));
    assert_eq!(shape.get(9), Some(Cell::new(9, 5)));
    assert!(shape.validate_connected(DEFAULT_GRID).is_ok());
}

#[test]
fn empty_and_single_cell_sets_are_connected() {
    assert!(is_connected(&[]));
    assert!(is_connected(&cells(&[(3, 3)])));
}

#[test]
fn diagonal_cells_are_not_connected() {
    assert!(!is_connected(&cells(&[(0, 0), (1, 1)])));
    assert!(is_connected(&cells(&[(0, 0), (1, 0), (1, 1)])));
}

#[test]
fn duplicate_cells_count_once() {
    assert!(is_connected(&cells(&[(2, 2), (2, 2), (2, 3)])));
}

#[test]
fn leftmost_end_of_line_can_move_along_the_line() {
    let shape = line_shape();
    let allowed = allowed_moves(&shape, 0, DEFAULT_GRID);
    assert!(allowed.contains(&Cell::new(1, 4)));
    assert!(allowed.contains(&Cell::new(1, 6)));
    assert!(allowed.contains(&Cell::new(9, 4)));
    assert!(!allowed.contains(&Cell::new(0, 5)));
    assert!(!allowed.contains(&Cell::new(0, 4)));
    assert!(!allowed.contains(&Cell::new(0, 6)));
    assert!(allowed.iter().all(|cell| cell.x >= 0 && cell.x < 10));
    assert!(allowed.iter().all(|cell| !shape.contains(*cell)));
    // cells 1..=9 above and below the remaining line
    assert_eq!(allowed.len(), 18);
}

#[test]
fn rightmost_end_cannot_leave_the_board() {
    let shape = line_shape();
    let allowed = allowed_moves(&shape, 9, DEFAULT_GRID);
    assert!(allowed.contains(&Cell::new(0, 4)));
    assert!(allowed.contains(&Cell::new(0, 6)));
    assert!(!allowed.iter().any(|cell| cell.x >= 10 || cell.x < 0));
}

#[test]
fn interior_piece_of_a_line_cannot_move() {
    let shape = line_shape();
    assert!(allowed_moves(&shape, 4, DEFAULT_GRID).is_empty());
    assert_eq!(
        check_move(&shape, Move::new(4, Cell::new(4, 6)), DEFAULT_GRID),
        Err(MoveError::Articulation { piece: 4 })
    );
}

#[test]
fn unknown_piece_has_no_moves() {
    let shape = line_shape();
    assert!(allowed_moves(&shape, 10, DEFAULT_GRID).is_empty());
    assert_eq!(
        check_move(&shape, Move::new(10, Cell::new(0, 0)), DEFAULT_GRID),
        Err(MoveError::NoSuchPiece { piece: 10, len: 10 })
    );
}

#[test]
fn move_must_land_on_an_allowed_cell() {
    let shape = line_shape();
    let far = Move::new(0, Cell::new(0, 0));
    assert_eq!(
        check_move(&shape, far, DEFAULT_GRID),
        Err(MoveError::NotAllowed {
            piece: 0,
            destination: Cell::new(0, 0)
        })
    );
    let next = apply_move(&shape, Move::new(0, Cell::new(1, 6)), DEFAULT_GRID)
        .expect("legal move");
    assert_eq!(next.get(0), Some(Cell::new(1, 6)));
    assert!(next.validate_connected(DEFAULT_GRID).is_ok());
}

#[test]
fn corner_shape_keeps_candidates_in_bounds() {
    let grid = GridSpec::new(10, 3);
    let shape = Shape::from_cells(cells(&[(0, 0), (1, 0), (0, 1)]));
    let allowed = allowed_moves(&shape, 2, grid);
    let expected: BTreeSet<Cell> = cells(&[(1, 1), (2, 0)]).into_iter().collect();
    assert_eq!(allowed, expected);
}

#[test]
fn single_piece_may_go_anywhere_else() {
    let grid = GridSpec::new(3, 1);
    let shape = Shape::from_cells(cells(&[(1, 1)]));
    let allowed = allowed_moves(&shape, 0, grid);
    assert_eq!(allowed.len(), 8);
    assert!(!allowed.contains(&Cell::new(1, 1)));
}

#[test]
fn nearest_candidate_prefers_closest_center() {
    let candidates: BTreeSet<Cell> = cells(&[(1, 4), (1, 6), (5, 6)]).into_iter().collect();
    assert_eq!(nearest_candidate(&candidates, (1.4, 6.9)), Some(Cell::new(1, 6)));
    assert_eq!(nearest_candidate(&candidates, (5.0, 5.0)), Some(Cell::new(5, 6)));
    assert_eq!(nearest_candidate(&BTreeSet::new(), (0.0, 0.0)), None);
}

#[test]
fn nearest_candidate_breaks_ties_by_lowest_x_then_y() {
    let candidates = cells(&[(2, 1), (1, 2), (1, 0)]);
    // all three centers lie exactly 1.0 from the release point
    assert_eq!(nearest_candidate(&candidates, (1.5, 1.5)), Some(Cell::new(1, 0)));
    let reversed: Vec<Cell> = candidates.iter().rev().copied().collect();
    assert_eq!(nearest_candidate(&reversed, (1.5, 1.5)), Some(Cell::new(1, 0)));
}

#[test]
fn matrix_puts_top_row_first() {
    let shape = line_shape();
    let matrix = shape.to_matrix(DEFAULT_GRID);
    assert_eq!(matrix.len(), 10);
    assert_eq!(matrix[4], vec![1u8; 10]);
    assert_eq!(matrix[5], vec![0u8; 10]);
}

fn shape_after_moves(choices: &[(usize, usize)]) -> Shape {
    let mut shape = line_shape();
    for (piece_seed, dest_seed) in choices {
        let movable: Vec<usize> = (0..shape.len())
            .filter(|piece| !allowed_moves(&shape, *piece, DEFAULT_GRID).is_empty())
            .collect();
        let piece = movable[piece_seed % movable.len()];
        let allowed: Vec<Cell> = allowed_moves(&shape, piece, DEFAULT_GRID).into_iter().collect();
        let destination = allowed[dest_seed % allowed.len()];
        shape = apply_move(&shape, Move::new(piece as u32, destination), DEFAULT_GRID)
            .expect("chosen from allowed set");
    }
    shape
}

proptest! {
    #[test]
    fn legal_moves_keep_shape_connected(
        choices in prop::collection::vec((0usize..64, 0usize..64), 0..40)
    ) {
        let shape = shape_after_moves(&choices);
        prop_assert!(shape.validate_connected(DEFAULT_GRID).is_ok());
    }

    #[test]
    fn no_moves_iff_removal_disconnects(
        choices in prop::collection::vec((0usize..64, 0usize..64), 0..25)
    ) {
        let shape = shape_after_moves(&choices);
        for piece in 0..shape.len() {
            let disconnects = !is_connected(&shape.without_piece(piece));
            let allowed = allowed_moves(&shape, piece, DEFAULT_GRID);
            prop_assert_eq!(allowed.is_empty(), disconnects);
        }
    }

    #[test]
    fn moved_piece_can_be_queried_again(
        choices in prop::collection::vec((0usize..64, 0usize..64), 1..25)
    ) {
        let shape = shape_after_moves(&choices);
        for piece in 0..shape.len() {
            let again = allowed_moves(&shape, piece, DEFAULT_GRID);
            prop_assert!(again.iter().all(|cell| !shape.contains(*cell)));
            prop_assert!(again.iter().all(|cell| DEFAULT_GRID.contains(*cell)));
        }
    }
}
