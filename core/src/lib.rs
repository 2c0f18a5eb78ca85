pub mod codec;
pub mod grid;
pub mod moves;
pub mod protocol;
pub mod room;
pub mod room_id;
pub mod snapshot;

pub use codec::{decode, encode, CodecError};
pub use grid::{
    is_connected, Cell, GridSpec, Shape, ShapeError, DEFAULT_GRID, GRID_SIZE_DEFAULT,
    SHAPE_SIZE_DEFAULT,
};
pub use moves::{allowed_moves, apply_move, check_move, is_movable, nearest_candidate, Move, MoveError};
pub use protocol::{server_msg_kind, ClientMsg, LastMove, NormalizedPointer, ParticipantId, ServerMsg};
pub use room::{classify_authoritative_shape, is_stale_move_count, ShapeVerdict};
pub use room_id::{is_valid_room_id, RoomId, RoomIdError, ROOM_ID_ALPHABET, ROOM_ID_LEN};
pub use snapshot::{GameSummary, MoveHistory, ShapeGuess, SummaryRecord};
