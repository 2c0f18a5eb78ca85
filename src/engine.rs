use std::collections::BTreeSet;

use foraging_core::{
    allowed_moves, classify_authoritative_shape, is_movable, nearest_candidate, server_msg_kind,
    Cell, ClientMsg, GameSummary, GridSpec, Move, MoveError, MoveHistory, ParticipantId, RoomId,
    ServerMsg, Shape, ShapeVerdict, SummaryRecord,
};
use tracing::{debug, info, warn};

use crate::channel::RoomChannel;
use crate::config::SessionConfig;
use crate::error::{LockError, SessionError};
use crate::gesture::{BoardView, GestureRelay, PeerGesture, SettleState};
use crate::lock::{GrantOutcome, LockCoordinator, LockExpiry, LockState};
use crate::persisted_store::GalleryStore;
use crate::reconcile::{OptimisticReconciler, Reconciliation};
use crate::runtime::{SelectionView, SessionEvent, SessionHooks, SessionMode, SessionView};
use crate::status::{Advisory, StatusLine};

/// Identity used for the only participant of a solo session.
pub const SOLO_PARTICIPANT: ParticipantId = 0;

#[derive(Debug, Clone)]
struct Selection {
    piece: u32,
    allowed: BTreeSet<Cell>,
}

/// The single move-arbitration engine behind every interaction mode.
///
/// Owns the local lock mirror, the optimistic reconciler and the gesture relay
/// for one room. Time is always passed in as `now_ms` (wall clock, milliseconds)
/// so every transition is reproducible.
pub struct MoveArbiter {
    config: SessionConfig,
    grid: GridSpec,
    mode: SessionMode,
    channel: Option<Box<dyn RoomChannel>>,
    room_id: Option<RoomId>,
    lock: LockCoordinator,
    reconciler: OptimisticReconciler,
    relay: GestureRelay,
    board: BoardView,
    selection: Option<Selection>,
    settle: Option<SettleState>,
    peer_gesture: Option<PeerGesture>,
    status: StatusLine,
    completed: Option<Shape>,
    gallery: Option<GalleryStore>,
    hooks: SessionHooks,
}

impl MoveArbiter {
    pub fn solo(config: SessionConfig) -> Self {
        let lock = LockCoordinator::with_local(SOLO_PARTICIPANT);
        Self::build(config, SessionMode::Solo, None, lock)
    }

    pub fn online(config: SessionConfig, channel: Box<dyn RoomChannel>) -> Self {
        Self::build(config, SessionMode::Online, Some(channel), LockCoordinator::new())
    }

    fn build(
        config: SessionConfig,
        mode: SessionMode,
        channel: Option<Box<dyn RoomChannel>>,
        lock: LockCoordinator,
    ) -> Self {
        let grid = config.grid();
        Self {
            relay: GestureRelay::new(config.drag_threshold_px, config.gesture_interval_ms),
            reconciler: OptimisticReconciler::new(grid, Shape::line(grid)),
            board: BoardView::unit(grid.size),
            grid,
            mode,
            channel,
            room_id: None,
            lock,
            selection: None,
            settle: None,
            peer_gesture: None,
            status: StatusLine::new(),
            completed: None,
            gallery: None,
            hooks: SessionHooks::empty(),
            config,
        }
    }

    pub fn with_gallery(mut self, gallery: GalleryStore) -> Self {
        self.gallery = Some(gallery);
        self
    }

    pub fn set_hooks(&mut self, hooks: SessionHooks) {
        self.hooks = hooks;
    }

    pub fn set_board_view(&mut self, board: BoardView) {
        self.board = board;
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn shape(&self) -> &Shape {
        self.reconciler.shape()
    }

    pub fn history(&self) -> &MoveHistory {
        self.reconciler.history()
    }

    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    pub fn participant(&self) -> Option<ParticipantId> {
        self.lock.local()
    }

    pub fn gallery(&self) -> Option<&GalleryStore> {
        self.gallery.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.channel
            .as_ref()
            .is_some_and(|channel| channel.is_connected())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            mode: self.mode,
            connected: self.is_connected(),
            room_id: self.room_id.clone(),
            participant: self.lock.local(),
            shape: self.reconciler.shape().clone(),
            move_count: self.reconciler.move_count(),
            lock: self.lock.state(),
            selection: self.selection.as_ref().map(|selection| SelectionView {
                piece: selection.piece,
                allowed: selection.allowed.iter().copied().collect(),
            }),
            pending: self.reconciler.pending(),
            peer_gesture: self.peer_gesture,
            settle: self.settle,
            dragging: self.relay.is_dragging(),
            advisory: self.status.current().cloned(),
            completed: self.completed.is_some(),
            board: self.board,
        }
    }

    pub fn connect(&mut self, room_id: &RoomId) -> Result<(), SessionError> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(SessionError::Offline);
        };
        channel.connect(room_id)?;
        info!(room = %room_id, "joined room");
        self.room_id = Some(room_id.clone());
        self.emit(SessionEvent::Connected {
            room_id: room_id.clone(),
        });
        Ok(())
    }

    /// Leaves the room on purpose.
    pub fn disconnect(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            channel.disconnect();
        }
        self.clear_room_state();
        self.emit(SessionEvent::Disconnected);
    }

    /// The transport dropped underneath us.
    pub fn on_transport_lost(&mut self, now_ms: u64) {
        warn!(room = ?self.room_id, "connection lost");
        if let Some(channel) = self.channel.as_mut() {
            channel.disconnect();
        }
        self.clear_room_state();
        self.emit(SessionEvent::Disconnected);
        self.advise(Advisory::Disconnected, now_ms, self.config.advisory_ttl_ms);
    }

    fn clear_room_state(&mut self) {
        self.lock.on_disconnect();
        if let Some(pending) = self.reconciler.discard_pending() {
            debug!(piece = pending.piece, "pending move dropped with connection");
        }
        self.selection = None;
        self.settle = None;
        self.relay.cancel();
        self.peer_gesture = None;
        self.room_id = None;
    }

    /// Asks for the lock on `piece` and shows its destinations.
    pub fn select(&mut self, piece: u32, now_ms: u64) -> Result<(), SessionError> {
        if self.completed.is_some() {
            return Err(SessionError::Completed);
        }
        let shape = self.reconciler.shape();
        if piece as usize >= shape.len() {
            return Err(MoveError::NoSuchPiece {
                piece,
                len: shape.len(),
            }
            .into());
        }
        if !is_movable(shape, piece as usize) {
            self.advise(Advisory::CannotMove, now_ms, self.config.advisory_ttl_ms);
            return Err(MoveError::Articulation { piece }.into());
        }
        let allowed = allowed_moves(shape, piece as usize, self.grid);
        if allowed.is_empty() {
            self.advise(Advisory::NowhereToGo, now_ms, self.config.advisory_ttl_ms);
            return Err(MoveError::NoDestination { piece }.into());
        }
        match self.mode {
            SessionMode::Solo => {
                self.lock.request(piece, now_ms)?;
                self.lock.on_grant(piece, now_ms);
            }
            SessionMode::Online => {
                if !self.is_connected() {
                    return Err(SessionError::Offline);
                }
                if let Err(err) = self.lock.request(piece, now_ms) {
                    if let LockError::Busy { holder } = err {
                        debug!(piece, holder, "lock busy, not requesting");
                        self.advise(
                            Advisory::OtherParticipantActing,
                            now_ms,
                            self.config.advisory_ttl_ms,
                        );
                    }
                    return Err(err.into());
                }
                if let Err(err) = self.send(ClientMsg::RequestMove { piece }) {
                    self.lock.release(now_ms);
                    return Err(err);
                }
            }
        }
        self.selection = Some(Selection { piece, allowed });
        self.emit(SessionEvent::Selected { piece });
        self.emit(SessionEvent::Lock(self.lock.state()));
        Ok(())
    }

    /// Drops the selection and gives the lock back.
    pub fn deselect(&mut self, now_ms: u64) -> Option<u32> {
        let selection = self.selection.take()?;
        self.settle = None;
        if self.lock.release(now_ms) && self.mode == SessionMode::Online {
            self.send_best_effort(ClientMsg::ReleaseMove);
        }
        self.emit(SessionEvent::Deselected {
            piece: selection.piece,
        });
        self.emit(SessionEvent::Lock(self.lock.state()));
        Some(selection.piece)
    }

    /// Moves the selected piece to `destination`. Requires holding the lock.
    pub fn commit(&mut self, destination: Cell, now_ms: u64) -> Result<(), SessionError> {
        let Some(selection) = self.selection.as_ref() else {
            return Err(SessionError::NoSelection);
        };
        let piece = selection.piece;
        if !self.lock.can_submit() {
            warn!(piece, state = ?self.lock.state(), "refusing to submit without the lock");
            return Err(LockError::NotHolder.into());
        }
        if !selection.allowed.contains(&destination) {
            return Err(MoveError::NotAllowed { piece, destination }.into());
        }
        let mv = Move::new(piece, destination);
        match self.mode {
            SessionMode::Solo => {
                self.reconciler.commit_direct(mv)?;
                self.lock.on_commit(now_ms);
            }
            SessionMode::Online => {
                self.reconciler.apply_local(mv, now_ms)?;
                if let Err(err) = self.send(ClientMsg::MakeLockedMove { piece, destination }) {
                    self.reconciler.discard_pending();
                    return Err(err);
                }
            }
        }
        info!(piece, destination = %destination, mode = ?self.mode, "move committed");
        self.selection = None;
        self.settle = None;
        self.emit(SessionEvent::Committed { piece, destination });
        if self.mode == SessionMode::Solo {
            self.emit(SessionEvent::Lock(self.lock.state()));
        }
        Ok(())
    }

    /// Pointer pressed. Returns the piece under the pointer, if any.
    pub fn press(&mut self, at_px: (f32, f32), _now_ms: u64) -> Option<u32> {
        if self.completed.is_some() || self.settle.is_some() {
            return None;
        }
        let cell = self.board.cell_at(at_px.0, at_px.1)?;
        let piece = self.reconciler.shape().piece_at(cell)? as u32;
        self.relay.press(piece, at_px);
        Some(piece)
    }

    /// Pointer moved while pressed. Crossing the drag threshold selects the piece.
    pub fn drag_motion(&mut self, at_px: (f32, f32), now_ms: u64) -> Result<(), SessionError> {
        let Some(piece) = self.relay.active_piece() else {
            return Ok(());
        };
        let was_dragging = self.relay.is_dragging();
        let holding = self.lock.is_held_by_self() && self.lock.piece() == Some(piece);
        let may_stream = holding && self.mode == SessionMode::Online;
        let sample = self.relay.motion(at_px, now_ms, may_stream, &self.board);
        if holding {
            if let Some(local) = self.lock.local() {
                self.lock.touch(local, now_ms);
            }
        }
        if !was_dragging && self.relay.is_dragging() {
            let selected = self.selection.as_ref().map(|selection| selection.piece);
            if selected != Some(piece) {
                if selected.is_some() {
                    self.deselect(now_ms);
                }
                if let Err(err) = self.select(piece, now_ms) {
                    self.relay.cancel();
                    return Err(err);
                }
            }
        }
        if let Some(msg) = sample {
            self.send_best_effort(msg);
        }
        Ok(())
    }

    /// Pointer lifted. Starts the settle phase toward the nearest legal cell.
    pub fn release(&mut self, at_px: (f32, f32), now_ms: u64) -> Result<Option<Cell>, SessionError> {
        let Some(release) = self.relay.release(at_px, &self.board) else {
            return Ok(None);
        };
        if self.mode == SessionMode::Online && self.is_connected() {
            self.send_best_effort(release.end.clone());
        }
        if !release.dragged {
            return Ok(None);
        }
        let Some(selection) = self
            .selection
            .as_ref()
            .filter(|selection| selection.piece == release.piece)
        else {
            return Ok(None);
        };
        let point = self.board.board_point(at_px.0, at_px.1);
        let Some(destination) = nearest_candidate(&selection.allowed, point) else {
            self.deselect(now_ms);
            return Ok(None);
        };
        let settle = SettleState {
            piece: release.piece,
            destination,
            started_ms: now_ms,
            duration_ms: self.config.settle_ms,
        };
        self.settle = Some(settle);
        self.emit(SessionEvent::SettleStarted(settle));
        Ok(Some(destination))
    }

    /// Advances timers: advisory expiry, lock timeouts, settle completion.
    pub fn tick(&mut self, now_ms: u64) {
        self.status.tick(now_ms);
        if let Some(expiry) = self.lock.expire(now_ms, self.config.lock_timeouts()) {
            self.on_lock_expired(expiry, now_ms);
        }
        let Some(settle) = self.settle else {
            return;
        };
        if !settle.is_complete(now_ms) {
            return;
        }
        if self.lock.can_submit() {
            self.settle = None;
            if let Err(err) = self.commit(settle.destination, now_ms) {
                warn!(%err, piece = settle.piece, "settled move could not be committed");
                self.deselect(now_ms);
            }
        } else if !self.lock.is_pending_for_self() {
            debug!(piece = settle.piece, "settle abandoned, lock lost");
            self.settle = None;
        }
    }

    fn on_lock_expired(&mut self, expiry: LockExpiry, now_ms: u64) {
        match expiry {
            LockExpiry::RequestTimedOut { .. } => {
                self.clear_selection();
                self.send_best_effort(ClientMsg::ReleaseMove);
                self.advise(Advisory::RequestTimedOut, now_ms, self.config.advisory_ttl_ms);
            }
            LockExpiry::SelfIdle { .. } => {
                self.clear_selection();
                if self.mode == SessionMode::Online {
                    self.send_best_effort(ClientMsg::ReleaseMove);
                }
            }
            LockExpiry::PeerIdle { .. } => {
                if self.peer_gesture.take().is_some() {
                    self.emit(SessionEvent::PeerGesture(None));
                }
            }
        }
        self.emit(SessionEvent::LockExpired(expiry));
        self.emit(SessionEvent::Lock(self.lock.state()));
    }

    /// Declares the shape finished.
    pub fn complete_shape(&mut self, now_ms: u64) -> Result<(), SessionError> {
        if self.completed.is_some() {
            return Err(SessionError::Completed);
        }
        let final_shape = self.reconciler.shape().clone();
        match self.mode {
            SessionMode::Online => self.send(ClientMsg::CompleteShape { final_shape }),
            SessionMode::Solo => {
                self.finish(final_shape.clone());
                let summary = GameSummary {
                    room_id: format!("solo-{now_ms}"),
                    total_moves: self.reconciler.move_count(),
                    final_shape,
                    participants: vec![SOLO_PARTICIPANT],
                    guesses: Vec::new(),
                };
                self.record_summary(&summary, now_ms);
                Ok(())
            }
        }
    }

    pub fn save_shape(&mut self, name: &str) -> Result<(), SessionError> {
        match self.mode {
            SessionMode::Online => {
                let shape = self.reconciler.shape().clone();
                self.send(ClientMsg::SaveShape {
                    shape,
                    name: name.to_string(),
                })
            }
            SessionMode::Solo => {
                self.emit(SessionEvent::ShapeSaved {
                    name: name.to_string(),
                });
                Ok(())
            }
        }
    }

    pub fn ping(&mut self, nonce: Option<u64>) -> Result<(), SessionError> {
        self.send(ClientMsg::Ping { nonce })
    }

    pub fn handle_server_msg(&mut self, msg: ServerMsg, now_ms: u64) {
        if self.mode == SessionMode::Solo {
            debug!(kind = server_msg_kind(&msg), "ignoring server message in solo mode");
            return;
        }
        debug!(kind = server_msg_kind(&msg), "server message");
        match msg {
            ServerMsg::Welcome {
                room_id,
                participant,
            } => {
                info!(room_id = %room_id, participant, "welcomed");
                self.lock.set_local(participant);
                if self.room_id.is_none() {
                    match RoomId::parse(&room_id) {
                        Ok(room_id) => self.room_id = Some(room_id),
                        Err(err) => warn!(%err, "welcome carried an invalid room id"),
                    }
                }
                self.emit(SessionEvent::Welcomed { participant });
            }
            ServerMsg::MoveLockGranted { piece, allowed } => {
                match self.lock.on_grant(piece, now_ms) {
                    GrantOutcome::Held => {
                        if let Some(selection) = self
                            .selection
                            .as_mut()
                            .filter(|selection| selection.piece == piece)
                        {
                            selection.allowed = allowed.into_iter().collect();
                        }
                    }
                    GrantOutcome::Unsolicited => {
                        self.clear_selection();
                        if self.lock.release(now_ms) {
                            self.send_best_effort(ClientMsg::ReleaseMove);
                        }
                    }
                }
                self.emit(SessionEvent::Lock(self.lock.state()));
            }
            ServerMsg::MoveLockDenied { piece, reason } => {
                if self.lock.on_deny(piece, now_ms) {
                    info!(piece, %reason, "lock denied");
                    self.clear_selection();
                    self.advise(
                        Advisory::OtherParticipantActing,
                        now_ms,
                        self.config.advisory_ttl_ms,
                    );
                    self.emit(SessionEvent::Lock(self.lock.state()));
                }
            }
            ServerMsg::LockAcquired { participant } => {
                if self.lock.on_acquired(participant, now_ms) {
                    self.clear_selection();
                    self.advise(
                        Advisory::OtherParticipantActing,
                        now_ms,
                        self.config.advisory_ttl_ms,
                    );
                }
                self.emit(SessionEvent::Lock(self.lock.state()));
            }
            ServerMsg::LockReleased { participant } => {
                if self.lock.on_released(participant, now_ms) {
                    self.clear_selection();
                }
                if !self.lock.is_mine(participant) && self.peer_gesture.take().is_some() {
                    self.emit(SessionEvent::PeerGesture(None));
                }
                self.emit(SessionEvent::Lock(self.lock.state()));
            }
            ServerMsg::MoveAccepted { shape, move_count } => {
                let outcome = self.reconciler.on_authoritative_update(&shape, move_count);
                self.lock.on_commit(now_ms);
                self.after_reconcile(outcome);
                self.emit(SessionEvent::Lock(self.lock.state()));
            }
            ServerMsg::MoveRejected { reason } => {
                let discarded = self.reconciler.on_rejected();
                warn!(%reason, ?discarded, "move rejected");
                self.clear_selection();
                if self.lock.release(now_ms) {
                    self.send_best_effort(ClientMsg::ReleaseMove);
                }
                self.advise(
                    Advisory::MoveRejected {
                        reason: reason.clone(),
                    },
                    now_ms,
                    self.config.rejection_ttl_ms,
                );
                self.emit(SessionEvent::Rejected { reason, discarded });
            }
            ServerMsg::GameStateUpdate {
                shape,
                move_count,
                last_move,
            } => {
                let outcome = self.reconciler.on_authoritative_update(&shape, move_count);
                if let Some(last_move) = last_move {
                    if !self.lock.is_mine(last_move.participant) {
                        self.lock.touch(last_move.participant, now_ms);
                        if self.peer_gesture.take().is_some() {
                            self.emit(SessionEvent::PeerGesture(None));
                        }
                    }
                }
                self.after_reconcile(outcome);
            }
            ServerMsg::OpponentDrag {
                participant,
                piece,
                pointer,
            } => {
                if self.lock.is_mine(participant) {
                    return;
                }
                self.lock.touch(participant, now_ms);
                let gesture = PeerGesture {
                    participant,
                    piece,
                    pointer,
                    received_ms: now_ms,
                };
                self.peer_gesture = Some(gesture);
                self.emit(SessionEvent::PeerGesture(Some(gesture)));
            }
            ServerMsg::OpponentDragEnd { participant, .. } => {
                if self
                    .peer_gesture
                    .is_some_and(|gesture| gesture.participant == participant)
                {
                    self.peer_gesture = None;
                    self.emit(SessionEvent::PeerGesture(None));
                }
            }
            ServerMsg::GameCompleted { final_shape } => {
                self.finish(final_shape);
            }
            ServerMsg::GameSummary { summary } => {
                self.record_summary(&summary, now_ms);
            }
            ServerMsg::GameReset { shape } => {
                if let ShapeVerdict::Malformed(err) =
                    classify_authoritative_shape(&shape, self.grid)
                {
                    warn!(%err, "ignoring reset with malformed shape");
                    return;
                }
                info!("room reset by authority");
                self.reconciler.reset(shape);
                self.lock.reset(now_ms);
                self.selection = None;
                self.settle = None;
                self.relay.cancel();
                self.peer_gesture = None;
                self.completed = None;
                self.status.clear();
                self.emit(SessionEvent::Reset);
            }
            ServerMsg::ShapeSaved { name } => {
                self.emit(SessionEvent::ShapeSaved { name });
            }
            ServerMsg::Pong { nonce } => {
                debug!(?nonce, "pong");
            }
            ServerMsg::Error { code, message } => {
                warn!(%code, %message, "server error");
                self.advise(
                    Advisory::ServerError {
                        message: message.clone(),
                    },
                    now_ms,
                    self.config.advisory_ttl_ms,
                );
                self.emit(SessionEvent::ServerError { code, message });
            }
        }
    }

    fn after_reconcile(&mut self, outcome: Reconciliation) {
        debug!(outcome = outcome.kind(), "reconciled");
        if matches!(outcome, Reconciliation::Replaced { .. }) {
            // the board moved under the current selection
            if let Some(selection) = self.selection.as_mut() {
                selection.allowed =
                    allowed_moves(self.reconciler.shape(), selection.piece as usize, self.grid);
            }
        }
        self.emit(SessionEvent::Reconciled(outcome));
    }

    fn finish(&mut self, final_shape: Shape) {
        info!(move_count = self.reconciler.move_count(), "game completed");
        self.clear_selection();
        self.relay.cancel();
        self.completed = Some(final_shape.clone());
        self.emit(SessionEvent::Completed { final_shape });
    }

    fn record_summary(&mut self, summary: &GameSummary, now_ms: u64) {
        let record = SummaryRecord::from_summary(summary, self.grid, now_ms as i64);
        if let Some(gallery) = self.gallery.as_mut() {
            match gallery.save_record(record.clone()) {
                Ok(true) => info!(room_id = %record.room_id, "summary saved to gallery"),
                Ok(false) => {}
                Err(err) => warn!(%err, "failed to save summary"),
            }
        }
        self.emit(SessionEvent::SummaryReady(record));
    }

    fn clear_selection(&mut self) {
        if let Some(selection) = self.selection.take() {
            self.emit(SessionEvent::Deselected {
                piece: selection.piece,
            });
        }
        self.settle = None;
    }

    fn advise(&mut self, advisory: Advisory, now_ms: u64, ttl_ms: u64) {
        self.status.show(advisory.clone(), now_ms, ttl_ms);
        self.emit(SessionEvent::Advisory(advisory));
    }

    fn send(&mut self, msg: ClientMsg) -> Result<(), SessionError> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(SessionError::Offline);
        };
        channel.send(msg)?;
        Ok(())
    }

    fn send_best_effort(&mut self, msg: ClientMsg) {
        if let Err(err) = self.send(msg) {
            debug!(%err, "message not sent");
        }
    }

    fn emit(&self, event: SessionEvent) {
        let view = self.view();
        (self.hooks.on_event)(&event, &view);
    }
}
