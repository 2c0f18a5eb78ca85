#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use foraging::{
    LockState, MemoryChannel, MoveArbiter, SessionConfig, SessionEvent, SessionHooks, SessionView,
};
use foraging_core::{
    allowed_moves, apply_move, ClientMsg, GameSummary, GridSpec, LastMove, Move, ParticipantId,
    RoomId, ServerMsg, Shape,
};

pub const ROOM: &str = "AB3K9Z";

pub enum Delivery {
    To(ParticipantId, ServerMsg),
    Others(ParticipantId, ServerMsg),
    All(ServerMsg),
}

/// Minimal single-room authority: one lock, one shape, strict move checks.
pub struct FakeAuthority {
    pub grid: GridSpec,
    pub shape: Shape,
    pub move_count: u32,
    pub holder: Option<ParticipantId>,
    pub participants: Vec<ParticipantId>,
}

impl FakeAuthority {
    pub fn new(grid: GridSpec, participants: &[ParticipantId]) -> Self {
        Self {
            grid,
            shape: Shape::line(grid),
            move_count: 0,
            holder: None,
            participants: participants.to_vec(),
        }
    }

    pub fn handle(&mut self, from: ParticipantId, msg: ClientMsg) -> Vec<Delivery> {
        match msg {
            ClientMsg::RequestMove { piece } => match self.holder {
                Some(holder) if holder != from => vec![Delivery::To(
                    from,
                    ServerMsg::MoveLockDenied {
                        piece,
                        reason: "another participant is moving".to_string(),
                    },
                )],
                _ => {
                    self.holder = Some(from);
                    let allowed = allowed_moves(&self.shape, piece as usize, self.grid)
                        .into_iter()
                        .collect();
                    vec![
                        Delivery::To(from, ServerMsg::MoveLockGranted { piece, allowed }),
                        Delivery::All(ServerMsg::LockAcquired { participant: from }),
                    ]
                }
            },
            ClientMsg::ReleaseMove => {
                if self.holder != Some(from) {
                    return Vec::new();
                }
                self.holder = None;
                vec![Delivery::All(ServerMsg::LockReleased { participant: from })]
            }
            ClientMsg::MakeLockedMove { piece, destination } => {
                if self.holder != Some(from) {
                    return vec![Delivery::To(
                        from,
                        ServerMsg::MoveRejected {
                            reason: "lock not held".to_string(),
                        },
                    )];
                }
                self.holder = None;
                let released = Delivery::All(ServerMsg::LockReleased { participant: from });
                match apply_move(&self.shape, Move::new(piece, destination), self.grid) {
                    Ok(next) => {
                        self.shape = next;
                        self.move_count += 1;
                        vec![
                            Delivery::To(
                                from,
                                ServerMsg::MoveAccepted {
                                    shape: self.shape.clone(),
                                    move_count: self.move_count,
                                },
                            ),
                            Delivery::Others(
                                from,
                                ServerMsg::GameStateUpdate {
                                    shape: self.shape.clone(),
                                    move_count: self.move_count,
                                    last_move: Some(LastMove {
                                        participant: from,
                                        piece,
                                        destination,
                                    }),
                                },
                            ),
                            released,
                        ]
                    }
                    Err(err) => vec![
                        Delivery::To(
                            from,
                            ServerMsg::MoveRejected {
                                reason: err.to_string(),
                            },
                        ),
                        released,
                    ],
                }
            }
            ClientMsg::DragUpdate { piece, pointer } => vec![Delivery::Others(
                from,
                ServerMsg::OpponentDrag {
                    participant: from,
                    piece,
                    pointer,
                },
            )],
            ClientMsg::DragEnd { piece, pointer } => vec![Delivery::Others(
                from,
                ServerMsg::OpponentDragEnd {
                    participant: from,
                    piece,
                    pointer,
                },
            )],
            ClientMsg::CompleteShape { final_shape } => vec![
                Delivery::All(ServerMsg::GameCompleted {
                    final_shape: final_shape.clone(),
                }),
                Delivery::All(ServerMsg::GameSummary {
                    summary: GameSummary {
                        room_id: ROOM.to_string(),
                        total_moves: self.move_count,
                        final_shape,
                        participants: self.participants.clone(),
                        guesses: Vec::new(),
                    },
                }),
            ],
            ClientMsg::SaveShape { name, .. } => {
                vec![Delivery::To(from, ServerMsg::ShapeSaved { name })]
            }
            ClientMsg::Ping { nonce } => vec![Delivery::To(from, ServerMsg::Pong { nonce })],
        }
    }
}

pub struct Client {
    pub id: ParticipantId,
    pub arbiter: MoveArbiter,
    pub channel: MemoryChannel,
    pub events: Rc<RefCell<Vec<SessionEvent>>>,
}

impl Client {
    pub fn holds_lock(&self) -> bool {
        self.arbiter.lock_state() == LockState::HeldBy(self.id)
    }

    pub fn take_events(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

/// Two or more online sessions wired to one [`FakeAuthority`].
pub struct Room {
    pub authority: FakeAuthority,
    pub clients: Vec<Client>,
    pub inbox: VecDeque<(ParticipantId, ClientMsg)>,
}

impl Room {
    pub fn new(ids: &[ParticipantId]) -> Self {
        Self::with_config(ids, SessionConfig::default())
    }

    pub fn with_config(ids: &[ParticipantId], config: SessionConfig) -> Self {
        let room_id = RoomId::parse(ROOM).expect("valid room id");
        let authority = FakeAuthority::new(config.grid(), ids);
        let clients = ids
            .iter()
            .map(|id| {
                let channel = MemoryChannel::new();
                let mut arbiter = MoveArbiter::online(config.clone(), Box::new(channel.clone()));
                let events = Rc::new(RefCell::new(Vec::new()));
                let sink = events.clone();
                arbiter.set_hooks(SessionHooks {
                    on_event: Rc::new(move |event: &SessionEvent, _: &SessionView| {
                        sink.borrow_mut().push(event.clone())
                    }),
                });
                arbiter.connect(&room_id).expect("connect");
                arbiter.handle_server_msg(
                    ServerMsg::Welcome {
                        room_id: ROOM.to_string(),
                        participant: *id,
                    },
                    0,
                );
                Client {
                    id: *id,
                    arbiter,
                    channel,
                    events,
                }
            })
            .collect();
        Self {
            authority,
            clients,
            inbox: VecDeque::new(),
        }
    }

    pub fn client(&mut self, id: ParticipantId) -> &mut Client {
        self.clients
            .iter_mut()
            .find(|client| client.id == id)
            .expect("known participant")
    }

    /// Moves everything clients sent into the authority's inbox, in client order.
    pub fn collect(&mut self) {
        for client in &self.clients {
            for msg in client.channel.take_sent() {
                self.inbox.push_back((client.id, msg));
            }
        }
    }

    /// Lets the authority handle the inbox entry at `index` and delivers the results.
    pub fn process_at(&mut self, index: usize, now_ms: u64) -> bool {
        let Some((from, msg)) = self.inbox.remove(index) else {
            return false;
        };
        let deliveries = self.authority.handle(from, msg);
        self.deliver(deliveries, now_ms);
        true
    }

    /// Handles the oldest queued message from `from`; per-client order is kept.
    pub fn process_next_from(&mut self, from: ParticipantId, now_ms: u64) -> bool {
        match self.inbox.iter().position(|(sender, _)| *sender == from) {
            Some(index) => self.process_at(index, now_ms),
            None => false,
        }
    }

    pub fn deliver(&mut self, deliveries: Vec<Delivery>, now_ms: u64) {
        for delivery in deliveries {
            match delivery {
                Delivery::To(to, msg) => {
                    self.client(to).arbiter.handle_server_msg(msg, now_ms);
                }
                Delivery::Others(from, msg) => {
                    for client in self.clients.iter_mut().filter(|c| c.id != from) {
                        client.arbiter.handle_server_msg(msg.clone(), now_ms);
                    }
                }
                Delivery::All(msg) => {
                    for client in &mut self.clients {
                        client.arbiter.handle_server_msg(msg.clone(), now_ms);
                    }
                }
            }
            assert!(
                self.holders() <= 1,
                "two participants believe they hold the lock"
            );
        }
    }

    pub fn holders(&self) -> usize {
        self.clients.iter().filter(|client| client.holds_lock()).count()
    }

    /// Runs until nobody has anything left to say.
    pub fn pump(&mut self, now_ms: u64) {
        loop {
            self.collect();
            if self.inbox.is_empty() {
                return;
            }
            while self.process_at(0, now_ms) {}
        }
    }
}
