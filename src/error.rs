use foraging_core::{CodecError, MoveError, ParticipantId, RoomIdError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel is not connected")]
    NotConnected,
    #[error("channel refused connection to room {room}")]
    Refused { room: String },
    #[error("channel closed: {0}")]
    Closed(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("storage io for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("no participant identity yet")]
    NoIdentity,
    #[error("participant {holder} is acting")]
    Busy { holder: ParticipantId },
    #[error("a lock request is already active")]
    AlreadyActive,
    #[error("move submitted without holding the lock")]
    NotHolder,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("move for piece {piece} is still awaiting confirmation")]
    PendingOccupied { piece: u32 },
    #[error(transparent)]
    Illegal(#[from] MoveError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no piece is selected")]
    NoSelection,
    #[error("game is already complete")]
    Completed,
    #[error("session is offline")]
    Offline,
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    RoomId(#[from] RoomIdError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
