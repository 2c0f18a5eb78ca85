use rkyv::{Archive, Deserialize, Serialize};

use crate::grid::{Cell, Shape};
use crate::snapshot::GameSummary;

pub type ParticipantId = u64;

/// Pointer position in viewport-independent `[0, 1]²` space, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct NormalizedPointer {
    pub fx: f32,
    pub fy: f32,
}

impl NormalizedPointer {
    pub fn new(fx: f32, fy: f32) -> Self {
        Self {
            fx: clamp_unit(fx),
            fy: clamp_unit(fy),
        }
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct LastMove {
    pub participant: ParticipantId,
    pub piece: u32,
    pub destination: Cell,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum ClientMsg {
    RequestMove { piece: u32 },
    ReleaseMove,
    MakeLockedMove { piece: u32, destination: Cell },
    DragUpdate { piece: u32, pointer: NormalizedPointer },
    DragEnd { piece: u32, pointer: NormalizedPointer },
    CompleteShape { final_shape: Shape },
    SaveShape { shape: Shape, name: String },
    Ping { nonce: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum ServerMsg {
    Welcome {
        room_id: String,
        participant: ParticipantId,
    },
    MoveLockGranted {
        piece: u32,
        allowed: Vec<Cell>,
    },
    MoveLockDenied {
        piece: u32,
        reason: String,
    },
    LockAcquired {
        participant: ParticipantId,
    },
    LockReleased {
        participant: ParticipantId,
    },
    MoveAccepted {
        shape: Shape,
        move_count: u32,
    },
    MoveRejected {
        reason: String,
    },
    GameStateUpdate {
        shape: Shape,
        move_count: u32,
        last_move: Option<LastMove>,
    },
    OpponentDrag {
        participant: ParticipantId,
        piece: u32,
        pointer: NormalizedPointer,
    },
    OpponentDragEnd {
        participant: ParticipantId,
        piece: u32,
        pointer: NormalizedPointer,
    },
    GameCompleted {
        final_shape: Shape,
    },
    GameSummary {
        summary: GameSummary,
    },
    GameReset {
        shape: Shape,
    },
    ShapeSaved {
        name: String,
    },
    Pong {
        nonce: Option<u64>,
    },
    Error {
        code: String,
        message: String,
    },
}

pub fn server_msg_kind(msg: &ServerMsg) -> &'static str {
    match msg {
        ServerMsg::Welcome { .. } => "welcome",
        ServerMsg::MoveLockGranted { .. } => "move_lock_granted",
        ServerMsg::MoveLockDenied { .. } => "move_lock_denied",
        ServerMsg::LockAcquired { .. } => "lock_acquired",
        ServerMsg::LockReleased { .. } => "lock_released",
        ServerMsg::MoveAccepted { .. } => "move_accepted",
        ServerMsg::MoveRejected { .. } => "move_rejected",
        ServerMsg::GameStateUpdate { .. } => "game_state_update",
        ServerMsg::OpponentDrag { .. } => "opponent_drag",
        ServerMsg::OpponentDragEnd { .. } => "opponent_drag_end",
        ServerMsg::GameCompleted { .. } => "game_completed",
        ServerMsg::GameSummary { .. } => "game_summary",
        ServerMsg::GameReset { .. } => "game_reset",
        ServerMsg::ShapeSaved { .. } => "shape_saved",
        ServerMsg::Pong { .. } => "pong",
        ServerMsg::Error { .. } => "error",
    }
}
