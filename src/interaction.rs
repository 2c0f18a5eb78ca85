use tracing::trace;

use crate::engine::MoveArbiter;
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { x: f32, y: f32 },
}

/// How raw pointer input turns into engine calls. All variants share one [`MoveArbiter`].
pub trait InteractionMode {
    fn name(&self) -> &'static str;

    fn pointer_down(
        &mut self,
        arbiter: &mut MoveArbiter,
        at_px: (f32, f32),
        now_ms: u64,
    ) -> Result<(), SessionError>;

    fn pointer_move(
        &mut self,
        arbiter: &mut MoveArbiter,
        at_px: (f32, f32),
        now_ms: u64,
    ) -> Result<(), SessionError>;

    fn pointer_up(
        &mut self,
        arbiter: &mut MoveArbiter,
        at_px: (f32, f32),
        now_ms: u64,
    ) -> Result<(), SessionError>;

    fn handle(
        &mut self,
        arbiter: &mut MoveArbiter,
        event: PointerEvent,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        trace!(mode = self.name(), ?event, "pointer");
        match event {
            PointerEvent::Down { x, y } => self.pointer_down(arbiter, (x, y), now_ms),
            PointerEvent::Move { x, y } => self.pointer_move(arbiter, (x, y), now_ms),
            PointerEvent::Up { x, y } => self.pointer_up(arbiter, (x, y), now_ms),
        }
    }
}

/// Click a piece to select it, click a highlighted cell to move there.
#[derive(Debug, Default, Clone, Copy)]
pub struct SelectAndCommit;

impl InteractionMode for SelectAndCommit {
    fn name(&self) -> &'static str {
        "select_and_commit"
    }

    fn pointer_down(
        &mut self,
        _arbiter: &mut MoveArbiter,
        _at_px: (f32, f32),
        _now_ms: u64,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    fn pointer_move(
        &mut self,
        _arbiter: &mut MoveArbiter,
        _at_px: (f32, f32),
        _now_ms: u64,
    ) -> Result<(), SessionError> {
        Ok(())
    }

    fn pointer_up(
        &mut self,
        arbiter: &mut MoveArbiter,
        at_px: (f32, f32),
        now_ms: u64,
    ) -> Result<(), SessionError> {
        let view = arbiter.view();
        if view.completed() || view.pending().is_some() {
            return Ok(());
        }
        let Some(cell) = view.board().cell_at(at_px.0, at_px.1) else {
            return Ok(());
        };
        let clicked = view.shape().piece_at(cell).map(|piece| piece as u32);
        match (view.selected_piece(), clicked) {
            (Some(selected), Some(piece)) if selected == piece => {
                arbiter.deselect(now_ms);
                Ok(())
            }
            (Some(_), Some(piece)) => {
                arbiter.deselect(now_ms);
                arbiter.select(piece, now_ms)
            }
            (Some(_), None) if view.is_allowed(cell) => {
                if !view.holds_lock() {
                    // grant still in flight
                    return Ok(());
                }
                arbiter.commit(cell, now_ms)
            }
            (Some(_), None) => {
                arbiter.deselect(now_ms);
                Ok(())
            }
            (None, Some(piece)) => arbiter.select(piece, now_ms),
            (None, None) => Ok(()),
        }
    }
}

/// Press on a piece, drag it, let go near the destination.
#[derive(Debug, Default, Clone, Copy)]
pub struct PressDragRelease;

impl InteractionMode for PressDragRelease {
    fn name(&self) -> &'static str {
        "press_drag_release"
    }

    fn pointer_down(
        &mut self,
        arbiter: &mut MoveArbiter,
        at_px: (f32, f32),
        now_ms: u64,
    ) -> Result<(), SessionError> {
        arbiter.press(at_px, now_ms);
        Ok(())
    }

    fn pointer_move(
        &mut self,
        arbiter: &mut MoveArbiter,
        at_px: (f32, f32),
        now_ms: u64,
    ) -> Result<(), SessionError> {
        arbiter.drag_motion(at_px, now_ms)
    }

    fn pointer_up(
        &mut self,
        arbiter: &mut MoveArbiter,
        at_px: (f32, f32),
        now_ms: u64,
    ) -> Result<(), SessionError> {
        arbiter.release(at_px, now_ms).map(|_| ())
    }
}
