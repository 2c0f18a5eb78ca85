use foraging_core::{
    check_move, classify_authoritative_shape, is_stale_move_count, Cell, GridSpec, Move,
    MoveHistory, Shape, ShapeError, ShapeVerdict,
};
use tracing::{debug, info, warn};

use crate::error::ReconcileError;

/// A move applied locally and not yet confirmed by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub piece: u32,
    pub destination: Cell,
    pub issued_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The update carried our pending destination; only the move count was adopted.
    Confirmed { move_count: u32, pending: PendingMove },
    /// Local shape overwritten by the authority's.
    Replaced {
        move_count: u32,
        discarded: Option<PendingMove>,
    },
    /// Nothing pending and the shape already matched.
    Unchanged { move_count: u32 },
    /// Lower move count than one already adopted.
    Stale { incoming: u32, adopted: u32 },
    Malformed(ShapeError),
}

impl Reconciliation {
    pub fn kind(&self) -> &'static str {
        match self {
            Reconciliation::Confirmed { .. } => "confirmed",
            Reconciliation::Replaced { .. } => "replaced",
            Reconciliation::Unchanged { .. } => "unchanged",
            Reconciliation::Stale { .. } => "stale",
            Reconciliation::Malformed(_) => "malformed",
        }
    }
}

/// Keeps the locally predicted shape in step with authoritative broadcasts.
///
/// Holds at most one [`PendingMove`]. `confirmed` is the last shape known to
/// match the authority; rejections and disconnects fall back to it.
#[derive(Debug, Clone)]
pub struct OptimisticReconciler {
    grid: GridSpec,
    shape: Shape,
    confirmed: Shape,
    move_count: u32,
    adopted: Option<u32>,
    pending: Option<PendingMove>,
    history: MoveHistory,
}

impl OptimisticReconciler {
    pub fn new(grid: GridSpec, initial: Shape) -> Self {
        Self {
            grid,
            confirmed: initial.clone(),
            history: MoveHistory::new(initial.clone()),
            shape: initial,
            move_count: 0,
            adopted: None,
            pending: None,
        }
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn confirmed(&self) -> &Shape {
        &self.confirmed
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn pending(&self) -> Option<PendingMove> {
        self.pending
    }

    pub fn history(&self) -> &MoveHistory {
        &self.history
    }

    /// Applies `mv` ahead of confirmation and records it as pending.
    pub fn apply_local(&mut self, mv: Move, now_ms: u64) -> Result<PendingMove, ReconcileError> {
        if let Some(pending) = self.pending {
            return Err(ReconcileError::PendingOccupied {
                piece: pending.piece,
            });
        }
        check_move(&self.shape, mv, self.grid)?;
        self.shape = self.shape.with_piece_at(mv.piece as usize, mv.destination);
        let pending = PendingMove {
            piece: mv.piece,
            destination: mv.destination,
            issued_at_ms: now_ms,
        };
        self.pending = Some(pending);
        debug!(piece = mv.piece, destination = %mv.destination, "applied move locally");
        Ok(pending)
    }

    /// Applies `mv` as final, with no authority to confirm it.
    pub fn commit_direct(&mut self, mv: Move) -> Result<u32, ReconcileError> {
        if let Some(pending) = self.pending {
            return Err(ReconcileError::PendingOccupied {
                piece: pending.piece,
            });
        }
        check_move(&self.shape, mv, self.grid)?;
        self.shape = self.shape.with_piece_at(mv.piece as usize, mv.destination);
        self.confirmed = self.shape.clone();
        self.move_count = self.move_count.saturating_add(1);
        self.history.push(self.shape.clone());
        Ok(self.move_count)
    }

    pub fn on_authoritative_update(&mut self, shape: &Shape, move_count: u32) -> Reconciliation {
        if is_stale_move_count(self.adopted, move_count) {
            let adopted = self.adopted.unwrap_or_default();
            debug!(incoming = move_count, adopted, "dropping stale authoritative update");
            return Reconciliation::Stale {
                incoming: move_count,
                adopted,
            };
        }
        match classify_authoritative_shape(shape, self.grid) {
            ShapeVerdict::Valid => {}
            ShapeVerdict::Disconnected => {
                warn!(move_count, "authority sent a disconnected shape, adopting it");
            }
            ShapeVerdict::Malformed(err) => {
                warn!(%err, move_count, "ignoring malformed authoritative shape");
                return Reconciliation::Malformed(err);
            }
        }
        self.adopted = Some(move_count);
        self.move_count = move_count;

        if let Some(pending) = self.pending {
            if shape.get(pending.piece as usize) == Some(pending.destination) {
                self.pending = None;
                self.confirmed = self.shape.clone();
                self.record_history();
                debug!(piece = pending.piece, move_count, "pending move confirmed");
                return Reconciliation::Confirmed {
                    move_count,
                    pending,
                };
            }
        }

        let discarded = self.pending.take();
        if discarded.is_none() && self.shape == *shape {
            self.confirmed = self.shape.clone();
            return Reconciliation::Unchanged { move_count };
        }
        if let Some(pending) = discarded {
            info!(piece = pending.piece, move_count, "pending move overridden by authority");
        }
        self.shape = shape.clone();
        self.confirmed = shape.clone();
        self.record_history();
        Reconciliation::Replaced {
            move_count,
            discarded,
        }
    }

    /// Authority refused our move: drop the prediction and fall back to the confirmed shape.
    pub fn on_rejected(&mut self) -> Option<PendingMove> {
        let discarded = self.pending.take();
        if discarded.is_some() {
            self.shape = self.confirmed.clone();
        }
        discarded
    }

    /// Same as a rejection, used when the connection drops.
    pub fn discard_pending(&mut self) -> Option<PendingMove> {
        self.on_rejected()
    }

    /// Starts over from `shape`, forgetting history and the stale-update watermark.
    pub fn reset(&mut self, shape: Shape) {
        self.history = MoveHistory::new(shape.clone());
        self.confirmed = shape.clone();
        self.shape = shape;
        self.move_count = 0;
        self.adopted = None;
        self.pending = None;
    }

    fn record_history(&mut self) {
        if self.history.latest() != &self.shape {
            self.history.push(self.shape.clone());
        }
    }
}
