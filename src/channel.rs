use std::cell::{Cell, RefCell};
use std::rc::Rc;

use foraging_core::{decode, encode, ClientMsg, RoomId, ServerMsg};
use tracing::{debug, warn};

use crate::error::ChannelError;

/// Outbound half of the link to the room authority.
///
/// Inbound messages are fed to the session by whoever owns the transport, via
/// `MoveArbiter::handle_server_msg`.
pub trait RoomChannel {
    fn connect(&mut self, room: &RoomId) -> Result<(), ChannelError>;
    fn disconnect(&mut self);
    fn send(&mut self, msg: ClientMsg) -> Result<(), ChannelError>;
    fn is_connected(&self) -> bool;
    fn room(&self) -> Option<RoomId>;
}

/// In-process channel that records everything sent. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryChannel {
    outbox: Rc<RefCell<Vec<ClientMsg>>>,
    room: Rc<RefCell<Option<RoomId>>>,
    refuse: Rc<Cell<bool>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `connect` calls fail, as a transport would for an unknown room.
    pub fn set_refuse_connect(&self, refuse: bool) {
        self.refuse.set(refuse);
    }

    pub fn sent(&self) -> Vec<ClientMsg> {
        self.outbox.borrow().clone()
    }

    pub fn take_sent(&self) -> Vec<ClientMsg> {
        std::mem::take(&mut *self.outbox.borrow_mut())
    }
}

impl RoomChannel for MemoryChannel {
    fn connect(&mut self, room: &RoomId) -> Result<(), ChannelError> {
        if self.refuse.get() {
            return Err(ChannelError::Refused {
                room: room.to_string(),
            });
        }
        *self.room.borrow_mut() = Some(room.clone());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.room.borrow_mut().take();
    }

    fn send(&mut self, msg: ClientMsg) -> Result<(), ChannelError> {
        if self.room.borrow().is_none() {
            return Err(ChannelError::NotConnected);
        }
        self.outbox.borrow_mut().push(msg);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.room.borrow().is_some()
    }

    fn room(&self) -> Option<RoomId> {
        self.room.borrow().clone()
    }
}

pub type FrameSink = Box<dyn FnMut(&RoomId, Vec<u8>) -> Result<(), ChannelError>>;

/// Encodes outbound messages into binary frames for an arbitrary byte transport.
pub struct FrameChannel {
    sink: FrameSink,
    room: Option<RoomId>,
}

impl FrameChannel {
    pub fn new(sink: FrameSink) -> Self {
        Self { sink, room: None }
    }
}

impl RoomChannel for FrameChannel {
    fn connect(&mut self, room: &RoomId) -> Result<(), ChannelError> {
        debug!(room = %room, "frame channel connected");
        self.room = Some(room.clone());
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(room) = self.room.take() {
            debug!(room = %room, "frame channel disconnected");
        }
    }

    fn send(&mut self, msg: ClientMsg) -> Result<(), ChannelError> {
        let Some(room) = self.room.as_ref() else {
            return Err(ChannelError::NotConnected);
        };
        let bytes = encode(&msg)?;
        (self.sink)(room, bytes)
    }

    fn is_connected(&self) -> bool {
        self.room.is_some()
    }

    fn room(&self) -> Option<RoomId> {
        self.room.clone()
    }
}

/// Decodes one inbound frame. Undecodable frames are dropped.
pub fn decode_frame(bytes: &[u8]) -> Option<ServerMsg> {
    match decode::<ServerMsg>(bytes) {
        Ok(msg) => Some(msg),
        Err(err) => {
            warn!(%err, "dropping undecodable frame");
            None
        }
    }
}
