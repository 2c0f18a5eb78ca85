use foraging::{Advisory, BoardView, GestureRelay, SettleState, StatusLine};
use foraging_core::{Cell, ClientMsg, NormalizedPointer};

fn board() -> BoardView {
    // 10x10 cells of 40px, offset inside the viewport
    BoardView::new(20.0, 10.0, 400.0, 10)
}

#[test]
fn top_left_pixel_is_top_row() {
    let view = board();
    assert_eq!(view.cell_at(21.0, 11.0), Some(Cell::new(0, 9)));
    assert_eq!(view.cell_at(419.0, 409.0), Some(Cell::new(9, 0)));
    assert_eq!(view.cell_at(19.0, 50.0), None);
    assert_eq!(view.cell_at(100.0, 410.0), None);
}

#[test]
fn cell_centers_round_trip_through_pixels() {
    let view = board();
    let center = view.cell_center_px(Cell::new(3, 7));
    assert_eq!(center, (160.0, 110.0));
    assert_eq!(view.cell_at(center.0, center.1), Some(Cell::new(3, 7)));
    let (bx, by) = view.board_point(center.0, center.1);
    assert!((bx - 3.5).abs() < 1e-4);
    assert!((by - 7.5).abs() < 1e-4);
}

#[test]
fn pointers_are_viewport_independent() {
    let mine = board();
    let theirs = BoardView::new(0.0, 0.0, 1000.0, 10);
    let pointer = mine.normalize(220.0, 110.0);
    assert_eq!(pointer, NormalizedPointer { fx: 0.5, fy: 0.25 });
    assert_eq!(theirs.to_pixels(pointer), (500.0, 250.0));
    assert_eq!(mine.normalize(-50.0, 900.0), NormalizedPointer { fx: 0.0, fy: 1.0 });
}

#[test]
fn small_motion_is_not_a_drag() {
    let view = board();
    let mut relay = GestureRelay::new(3.0, 50);
    relay.press(0, (100.0, 100.0));
    assert_eq!(relay.motion((102.0, 101.0), 10, true, &view), None);
    assert!(!relay.is_dragging());
    assert!(relay.motion((105.0, 100.0), 20, true, &view).is_some());
    assert!(relay.is_dragging());
}

#[test]
fn samples_are_throttled() {
    let view = board();
    let mut relay = GestureRelay::new(3.0, 50);
    relay.press(2, (100.0, 100.0));
    assert!(relay.motion((120.0, 100.0), 1_000, true, &view).is_some());
    assert_eq!(relay.motion((125.0, 100.0), 1_020, true, &view), None);
    assert_eq!(relay.motion((130.0, 100.0), 1_049, true, &view), None);
    let sample = relay.motion((135.0, 100.0), 1_050, true, &view);
    assert_eq!(
        sample,
        Some(ClientMsg::DragUpdate {
            piece: 2,
            pointer: view.normalize(135.0, 100.0)
        })
    );
}

#[test]
fn nothing_streams_without_the_lock() {
    let view = board();
    let mut relay = GestureRelay::new(3.0, 50);
    relay.press(2, (100.0, 100.0));
    assert_eq!(relay.motion((150.0, 100.0), 0, false, &view), None);
    assert!(relay.is_dragging());
    assert!(relay.motion((155.0, 100.0), 60, true, &view).is_some());
}

#[test]
fn release_always_ends_the_gesture() {
    let view = board();
    let mut relay = GestureRelay::new(3.0, 50);
    relay.press(7, (100.0, 100.0));
    let release = relay.release((100.0, 100.0), &view).expect("tracked press");
    assert_eq!(release.piece, 7);
    assert!(!release.dragged);
    assert!(matches!(release.end, ClientMsg::DragEnd { piece: 7, .. }));
    assert_eq!(relay.release((0.0, 0.0), &view), None);
}

#[test]
fn settle_completes_after_duration() {
    let settle = SettleState {
        piece: 0,
        destination: Cell::new(1, 6),
        started_ms: 1_000,
        duration_ms: 200,
    };
    assert!(!settle.is_complete(1_199));
    assert!(settle.is_complete(1_200));
    assert_eq!(settle.progress(1_100), 0.5);
    assert_eq!(settle.progress(5_000), 1.0);
}

#[test]
fn advisories_expire() {
    let mut status = StatusLine::new();
    status.show(Advisory::CannotMove, 100, 1_500);
    assert_eq!(status.current(), Some(&Advisory::CannotMove));
    assert!(!status.tick(1_599));
    assert!(status.tick(1_600));
    assert_eq!(status.current(), None);
}

#[test]
fn advisories_read_as_sentences() {
    let rejected = Advisory::MoveRejected {
        reason: "stale lock".to_string(),
    };
    assert_eq!(rejected.to_string(), "Move rejected: stale lock");
    assert!(Advisory::OtherParticipantActing.to_string().contains("other participant"));
}
