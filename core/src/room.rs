use crate::grid::{GridSpec, Shape, ShapeError};

/// How a shape received from the authority should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeVerdict {
    Valid,
    /// Structurally sound but not one region. The authority still wins.
    Disconnected,
    Malformed(ShapeError),
}

pub fn classify_authoritative_shape(shape: &Shape, grid: GridSpec) -> ShapeVerdict {
    match shape.validate_connected(grid) {
        Ok(()) => ShapeVerdict::Valid,
        Err(ShapeError::Disconnected) => ShapeVerdict::Disconnected,
        Err(err) => ShapeVerdict::Malformed(err),
    }
}

/// An update is stale when it carries a lower move count than one already adopted.
pub fn is_stale_move_count(adopted: Option<u32>, incoming: u32) -> bool {
    matches!(adopted, Some(adopted) if incoming < adopted)
}
