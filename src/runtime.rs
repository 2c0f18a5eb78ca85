use std::rc::Rc;

use foraging_core::{Cell, ParticipantId, RoomId, Shape, SummaryRecord};

use crate::gesture::{BoardView, PeerGesture, SettleState};
use crate::lock::{LockExpiry, LockState};
use crate::reconcile::{PendingMove, Reconciliation};
use crate::status::Advisory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// No authority: locks are granted locally and commits are final.
    #[default]
    Solo,
    Online,
}

#[derive(Clone)]
pub struct SessionHooks {
    pub on_event: Rc<dyn Fn(&SessionEvent, &SessionView)>,
}

impl SessionHooks {
    pub fn empty() -> Self {
        Self {
            on_event: Rc::new(|_: &SessionEvent, _: &SessionView| {}),
        }
    }
}

impl Default for SessionHooks {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Connected {
        room_id: RoomId,
    },
    Welcomed {
        participant: ParticipantId,
    },
    Disconnected,
    Selected {
        piece: u32,
    },
    Deselected {
        piece: u32,
    },
    Lock(LockState),
    LockExpired(LockExpiry),
    Committed {
        piece: u32,
        destination: Cell,
    },
    Reconciled(Reconciliation),
    Rejected {
        reason: String,
        discarded: Option<PendingMove>,
    },
    PeerGesture(Option<PeerGesture>),
    SettleStarted(SettleState),
    Advisory(Advisory),
    Completed {
        final_shape: Shape,
    },
    SummaryReady(SummaryRecord),
    Reset,
    ShapeSaved {
        name: String,
    },
    ServerError {
        code: String,
        message: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionView {
    pub piece: u32,
    pub allowed: Vec<Cell>,
}

/// Immutable picture of a session, taken when an event fires or an input arrives.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub(crate) mode: SessionMode,
    pub(crate) connected: bool,
    pub(crate) room_id: Option<RoomId>,
    pub(crate) participant: Option<ParticipantId>,
    pub(crate) shape: Shape,
    pub(crate) move_count: u32,
    pub(crate) lock: LockState,
    pub(crate) selection: Option<SelectionView>,
    pub(crate) pending: Option<PendingMove>,
    pub(crate) peer_gesture: Option<PeerGesture>,
    pub(crate) settle: Option<SettleState>,
    pub(crate) dragging: bool,
    pub(crate) advisory: Option<Advisory>,
    pub(crate) completed: bool,
    pub(crate) board: BoardView,
}

impl SessionView {
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.room_id.as_ref()
    }

    pub fn participant(&self) -> Option<ParticipantId> {
        self.participant
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn lock(&self) -> LockState {
        self.lock
    }

    pub fn holds_lock(&self) -> bool {
        matches!(self.lock, LockState::HeldBy(holder) if Some(holder) == self.participant)
    }

    pub fn selection(&self) -> Option<&SelectionView> {
        self.selection.as_ref()
    }

    pub fn selected_piece(&self) -> Option<u32> {
        self.selection.as_ref().map(|selection| selection.piece)
    }

    pub fn is_allowed(&self, cell: Cell) -> bool {
        self.selection
            .as_ref()
            .is_some_and(|selection| selection.allowed.contains(&cell))
    }

    pub fn pending(&self) -> Option<PendingMove> {
        self.pending
    }

    pub fn peer_gesture(&self) -> Option<PeerGesture> {
        self.peer_gesture
    }

    pub fn settle(&self) -> Option<SettleState> {
        self.settle
    }

    pub fn dragging(&self) -> bool {
        self.dragging
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        self.advisory.as_ref()
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn board(&self) -> BoardView {
        self.board
    }

    /// Piece under a pixel position, if any.
    pub fn piece_at_px(&self, px: f32, py: f32) -> Option<u32> {
        let cell = self.board.cell_at(px, py)?;
        self.shape.piece_at(cell).map(|piece| piece as u32)
    }
}
