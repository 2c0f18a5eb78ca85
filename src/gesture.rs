use foraging_core::{Cell, ClientMsg, NormalizedPointer, ParticipantId};
use tracing::trace;

/// Square board placed in a pixel viewport. Pixel y grows downwards; board y grows upwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardView {
    pub left: f32,
    pub top: f32,
    pub side: f32,
    pub grid_size: i32,
}

impl BoardView {
    pub fn new(left: f32, top: f32, side: f32, grid_size: i32) -> Self {
        Self {
            left,
            top,
            side,
            grid_size,
        }
    }

    /// Unit-size cells at the origin, handy when pixels and board units coincide.
    pub fn unit(grid_size: i32) -> Self {
        Self::new(0.0, 0.0, grid_size as f32, grid_size)
    }

    pub fn cell_px(&self) -> f32 {
        self.side / self.grid_size.max(1) as f32
    }

    fn fractions(&self, px: f32, py: f32) -> (f32, f32) {
        if self.side <= 0.0 {
            return (0.0, 0.0);
        }
        ((px - self.left) / self.side, (py - self.top) / self.side)
    }

    pub fn normalize(&self, px: f32, py: f32) -> NormalizedPointer {
        let (fx, fy) = self.fractions(px, py);
        NormalizedPointer::new(fx, fy)
    }

    pub fn to_pixels(&self, pointer: NormalizedPointer) -> (f32, f32) {
        (
            self.left + pointer.fx * self.side,
            self.top + pointer.fy * self.side,
        )
    }

    /// Position in board units: cell `(x, y)` spans `[x, x+1) × [y, y+1)`.
    pub fn board_point(&self, px: f32, py: f32) -> (f32, f32) {
        let (fx, fy) = self.fractions(px, py);
        let n = self.grid_size as f32;
        (fx * n, n - fy * n)
    }

    pub fn cell_at(&self, px: f32, py: f32) -> Option<Cell> {
        let (fx, fy) = self.fractions(px, py);
        if !(0.0..1.0).contains(&fx) || !(0.0..1.0).contains(&fy) {
            return None;
        }
        let n = self.grid_size;
        let col = ((fx * n as f32) as i32).min(n - 1);
        let row = ((fy * n as f32) as i32).min(n - 1);
        Some(Cell::new(col, n - 1 - row))
    }

    /// Pixel center of `cell`.
    pub fn cell_center_px(&self, cell: Cell) -> (f32, f32) {
        let size = self.cell_px();
        let row = self.grid_size - 1 - cell.y;
        (
            self.left + (cell.x as f32 + 0.5) * size,
            self.top + (row as f32 + 0.5) * size,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DragTrack {
    piece: u32,
    origin: (f32, f32),
    last: (f32, f32),
    dragging: bool,
    last_sent_ms: Option<u64>,
}

/// Result of lifting the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct DragRelease {
    pub piece: u32,
    /// Terminal sample, always produced so the peer can drop its proxy.
    pub end: ClientMsg,
    pub dragged: bool,
    pub at_px: (f32, f32),
}

/// Turns pointer motion on a held piece into throttled drag samples for the peer.
#[derive(Debug, Clone)]
pub struct GestureRelay {
    threshold_px: f32,
    interval_ms: u64,
    track: Option<DragTrack>,
}

impl GestureRelay {
    pub fn new(threshold_px: f32, interval_ms: u64) -> Self {
        Self {
            threshold_px,
            interval_ms,
            track: None,
        }
    }

    pub fn press(&mut self, piece: u32, at_px: (f32, f32)) {
        self.track = Some(DragTrack {
            piece,
            origin: at_px,
            last: at_px,
            dragging: false,
            last_sent_ms: None,
        });
    }

    pub fn active_piece(&self) -> Option<u32> {
        self.track.map(|track| track.piece)
    }

    pub fn is_dragging(&self) -> bool {
        self.track.is_some_and(|track| track.dragging)
    }

    pub fn last_px(&self) -> Option<(f32, f32)> {
        self.track.map(|track| track.last)
    }

    /// Updates the tracked pointer. Returns a sample to send when the drag is past the
    /// threshold, `may_stream` is set, and the throttle interval has elapsed.
    pub fn motion(
        &mut self,
        at_px: (f32, f32),
        now_ms: u64,
        may_stream: bool,
        view: &BoardView,
    ) -> Option<ClientMsg> {
        let track = self.track.as_mut()?;
        track.last = at_px;
        if !track.dragging {
            let dx = at_px.0 - track.origin.0;
            let dy = at_px.1 - track.origin.1;
            if (dx * dx + dy * dy).sqrt() <= self.threshold_px {
                return None;
            }
            track.dragging = true;
        }
        if !may_stream {
            return None;
        }
        if let Some(last_sent) = track.last_sent_ms {
            if now_ms.saturating_sub(last_sent) < self.interval_ms {
                return None;
            }
        }
        track.last_sent_ms = Some(now_ms);
        trace!(piece = track.piece, now_ms, "drag sample");
        Some(ClientMsg::DragUpdate {
            piece: track.piece,
            pointer: view.normalize(at_px.0, at_px.1),
        })
    }

    pub fn release(&mut self, at_px: (f32, f32), view: &BoardView) -> Option<DragRelease> {
        let track = self.track.take()?;
        Some(DragRelease {
            piece: track.piece,
            end: ClientMsg::DragEnd {
                piece: track.piece,
                pointer: view.normalize(at_px.0, at_px.1),
            },
            dragged: track.dragging,
            at_px,
        })
    }

    pub fn cancel(&mut self) -> Option<u32> {
        self.track.take().map(|track| track.piece)
    }
}

/// Visual transition between release and the actual commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleState {
    pub piece: u32,
    pub destination: Cell,
    pub started_ms: u64,
    pub duration_ms: u64,
}

impl SettleState {
    pub fn is_complete(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.started_ms) >= self.duration_ms
    }

    /// Progress in `[0, 1]` for animating the piece toward its destination.
    pub fn progress(&self, now_ms: u64) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.started_ms) as f32;
        (elapsed / self.duration_ms as f32).min(1.0)
    }
}

/// Last drag sample received from the other participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerGesture {
    pub participant: ParticipantId,
    pub piece: u32,
    pub pointer: NormalizedPointer,
    pub received_ms: u64,
}
