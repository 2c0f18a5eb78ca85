use std::fmt;

use tracing::info;

/// Transient, non-blocking message shown to the participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    CannotMove,
    NowhereToGo,
    OtherParticipantActing,
    MoveRejected { reason: String },
    Disconnected,
    ServerError { message: String },
    RequestTimedOut,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::CannotMove => f.write_str("That block holds the shape together"),
            Advisory::NowhereToGo => f.write_str("That block has nowhere to go"),
            Advisory::OtherParticipantActing => f.write_str("The other participant is moving"),
            Advisory::MoveRejected { reason } => write!(f, "Move rejected: {reason}"),
            Advisory::Disconnected => f.write_str("Disconnected from the room"),
            Advisory::ServerError { message } => write!(f, "Server error: {message}"),
            Advisory::RequestTimedOut => f.write_str("No answer from the room, try again"),
        }
    }
}

/// Holds at most one advisory and forgets it once its time-to-live has passed.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    current: Option<(Advisory, u64)>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, advisory: Advisory, now_ms: u64, ttl_ms: u64) {
        info!(%advisory, ttl_ms, "advisory");
        self.current = Some((advisory, now_ms.saturating_add(ttl_ms)));
    }

    pub fn current(&self) -> Option<&Advisory> {
        self.current.as_ref().map(|(advisory, _)| advisory)
    }

    /// Clears an expired advisory. Returns `true` if one was cleared.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let expired = matches!(&self.current, Some((_, expires_at)) if now_ms >= *expires_at);
        if expired {
            self.current = None;
        }
        expired
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
