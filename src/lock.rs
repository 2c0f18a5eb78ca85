use foraging_core::ParticipantId;
use tracing::{debug, info, warn};

use crate::error::LockError;

/// Local mirror of the room's single mover lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    PendingFor(ParticipantId),
    HeldBy(ParticipantId),
}

impl LockState {
    pub fn holder(self) -> Option<ParticipantId> {
        match self {
            LockState::HeldBy(holder) => Some(holder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTimeouts {
    pub request_ms: u64,
    pub hold_ms: u64,
}

/// What the timeout policy did to the local lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockExpiry {
    /// Our request went unanswered; we gave up on it.
    RequestTimedOut { piece: Option<u32> },
    /// We held the lock without acting; a release should be sent.
    SelfIdle { piece: Option<u32> },
    /// The peer held the lock without any visible activity.
    PeerIdle { holder: ParticipantId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The grant answered our outstanding request.
    Held,
    /// Granted without a matching request (cancelled meanwhile). The lock is ours anyway.
    Unsolicited,
}

/// Client side of the one-mover-at-a-time protocol. The authority's messages
/// always win over whatever was predicted locally.
#[derive(Debug, Clone, Default)]
pub struct LockCoordinator {
    state: LockState,
    local: Option<ParticipantId>,
    piece: Option<u32>,
    since_ms: u64,
}

impl LockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local(local: ParticipantId) -> Self {
        Self {
            local: Some(local),
            ..Self::default()
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn local(&self) -> Option<ParticipantId> {
        self.local
    }

    pub fn set_local(&mut self, local: ParticipantId) {
        self.local = Some(local);
    }

    /// Piece we requested or hold the lock for.
    pub fn piece(&self) -> Option<u32> {
        self.piece
    }

    pub fn since_ms(&self) -> u64 {
        self.since_ms
    }

    pub fn is_mine(&self, participant: ParticipantId) -> bool {
        self.local == Some(participant)
    }

    pub fn is_held_by_self(&self) -> bool {
        matches!(self.state, LockState::HeldBy(holder) if self.is_mine(holder))
    }

    pub fn is_pending_for_self(&self) -> bool {
        matches!(self.state, LockState::PendingFor(p) if self.is_mine(p))
    }

    /// Only the local holder may submit a move.
    pub fn can_submit(&self) -> bool {
        self.is_held_by_self()
    }

    /// Optimistically enters `PendingFor(self)`. The caller sends the request.
    pub fn request(&mut self, piece: u32, now_ms: u64) -> Result<(), LockError> {
        let local = self.local.ok_or(LockError::NoIdentity)?;
        match self.state {
            LockState::Unlocked => {
                self.transition(LockState::PendingFor(local), now_ms);
                self.piece = Some(piece);
                Ok(())
            }
            LockState::PendingFor(p) | LockState::HeldBy(p) if p == local => {
                Err(LockError::AlreadyActive)
            }
            LockState::PendingFor(holder) | LockState::HeldBy(holder) => {
                Err(LockError::Busy { holder })
            }
        }
    }

    pub fn on_grant(&mut self, piece: u32, now_ms: u64) -> GrantOutcome {
        let Some(local) = self.local else {
            warn!(piece, "lock granted before identity is known");
            return GrantOutcome::Unsolicited;
        };
        let solicited = self.is_pending_for_self() && self.piece == Some(piece);
        if !solicited {
            warn!(piece, state = ?self.state, "unsolicited lock grant, adopting");
        }
        self.transition(LockState::HeldBy(local), now_ms);
        self.piece = Some(piece);
        if solicited {
            GrantOutcome::Held
        } else {
            GrantOutcome::Unsolicited
        }
    }

    /// Returns `true` when the denial answered our outstanding request.
    pub fn on_deny(&mut self, piece: u32, now_ms: u64) -> bool {
        if !self.is_pending_for_self() || self.piece != Some(piece) {
            debug!(piece, pending = ?self.piece, state = ?self.state, "ignoring stale lock denial");
            return false;
        }
        self.transition(LockState::Unlocked, now_ms);
        self.piece = None;
        true
    }

    /// Authority announces a holder. Returns `true` when this ended a claim of ours.
    ///
    /// An acquisition naming us is only adopted while our request is pending.
    /// Otherwise we already gave the claim up (deselect or a handed-back grant)
    /// and our `ReleaseMove` is queued ahead of anything we send next.
    pub fn on_acquired(&mut self, holder: ParticipantId, now_ms: u64) -> bool {
        if self.is_mine(holder) {
            if self.is_pending_for_self() {
                self.transition(LockState::HeldBy(holder), now_ms);
            } else if !self.is_held_by_self() {
                debug!(state = ?self.state, "ignoring acquisition of a released claim");
                self.transition(LockState::Unlocked, now_ms);
                self.piece = None;
            }
            return false;
        }
        let lost = self.is_pending_for_self() || self.is_held_by_self();
        if lost {
            self.piece = None;
        }
        self.transition(LockState::HeldBy(holder), now_ms);
        lost
    }

    /// Authority announces a release. Returns `true` when this ended a claim of ours.
    pub fn on_released(&mut self, holder: ParticipantId, now_ms: u64) -> bool {
        match self.state {
            LockState::PendingFor(p) | LockState::HeldBy(p) if p == holder => {
                self.transition(LockState::Unlocked, now_ms);
                self.piece = None;
                self.is_mine(holder)
            }
            // our own claim stands until the authority says otherwise about us
            LockState::PendingFor(p) | LockState::HeldBy(p) if self.is_mine(p) => false,
            _ => {
                self.transition(LockState::Unlocked, now_ms);
                false
            }
        }
    }

    /// Drops our own claim. Returns `true` when a `release-move` should be sent.
    pub fn release(&mut self, now_ms: u64) -> bool {
        if !self.is_held_by_self() && !self.is_pending_for_self() {
            return false;
        }
        self.transition(LockState::Unlocked, now_ms);
        self.piece = None;
        true
    }

    /// Our move was accepted, which completes the hold.
    pub fn on_commit(&mut self, now_ms: u64) {
        if self.is_held_by_self() {
            self.transition(LockState::Unlocked, now_ms);
            self.piece = None;
        }
    }

    /// Nothing survives a lost connection, including our identity.
    pub fn on_disconnect(&mut self) {
        if self.state != LockState::Unlocked {
            info!(state = ?self.state, "lock state cleared on disconnect");
        }
        *self = Self::default();
    }

    /// Clears lock state but keeps identity, as after a room reset.
    pub fn reset(&mut self, now_ms: u64) {
        self.transition(LockState::Unlocked, now_ms);
        self.piece = None;
    }

    /// Refreshes the idle clock when the holder shows activity.
    pub fn touch(&mut self, participant: ParticipantId, now_ms: u64) {
        if self.state == LockState::HeldBy(participant) {
            self.since_ms = now_ms;
        }
    }

    pub fn expire(&mut self, now_ms: u64, timeouts: LockTimeouts) -> Option<LockExpiry> {
        let elapsed = now_ms.saturating_sub(self.since_ms);
        let expiry = match self.state {
            LockState::Unlocked => return None,
            LockState::PendingFor(p) if self.is_mine(p) => {
                if elapsed < timeouts.request_ms {
                    return None;
                }
                LockExpiry::RequestTimedOut { piece: self.piece }
            }
            LockState::HeldBy(p) if self.is_mine(p) => {
                if elapsed < timeouts.hold_ms {
                    return None;
                }
                LockExpiry::SelfIdle { piece: self.piece }
            }
            LockState::PendingFor(holder) | LockState::HeldBy(holder) => {
                if elapsed < timeouts.hold_ms {
                    return None;
                }
                LockExpiry::PeerIdle { holder }
            }
        };
        warn!(?expiry, elapsed_ms = elapsed, "lock expired locally");
        self.transition(LockState::Unlocked, now_ms);
        self.piece = None;
        Some(expiry)
    }

    fn transition(&mut self, next: LockState, now_ms: u64) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "lock transition");
        }
        self.state = next;
        self.since_ms = now_ms;
    }
}
