use foraging::{GrantOutcome, LockCoordinator, LockError, LockExpiry, LockState, LockTimeouts};

const ALICE: u64 = 11;
const BOB: u64 = 22;

const TIMEOUTS: LockTimeouts = LockTimeouts {
    request_ms: 5_000,
    hold_ms: 30_000,
};

#[test]
fn request_grant_release_cycle() {
    let mut lock = LockCoordinator::with_local(ALICE);
    assert_eq!(lock.state(), LockState::Unlocked);

    lock.request(0, 100).expect("request");
    assert_eq!(lock.state(), LockState::PendingFor(ALICE));
    assert!(!lock.can_submit());

    assert_eq!(lock.on_grant(0, 150), GrantOutcome::Held);
    assert_eq!(lock.state(), LockState::HeldBy(ALICE));
    assert!(lock.can_submit());
    assert_eq!(lock.piece(), Some(0));

    assert!(lock.release(200));
    assert_eq!(lock.state(), LockState::Unlocked);
    assert_eq!(lock.piece(), None);
    assert!(!lock.release(210));
}

#[test]
fn request_needs_identity() {
    let mut lock = LockCoordinator::new();
    assert_eq!(lock.request(0, 0), Err(LockError::NoIdentity));
}

#[test]
fn denial_clears_pending_request() {
    let mut lock = LockCoordinator::with_local(ALICE);
    lock.request(3, 0).expect("request");
    assert!(lock.on_deny(3, 10));
    assert_eq!(lock.state(), LockState::Unlocked);
    // a second denial is stale
    assert!(!lock.on_deny(3, 20));
}

#[test]
fn denial_for_an_abandoned_piece_is_ignored() {
    let mut lock = LockCoordinator::with_local(ALICE);
    lock.request(0, 0).expect("request");
    assert_eq!(
        lock.expire(5_000, TIMEOUTS),
        Some(LockExpiry::RequestTimedOut { piece: Some(0) })
    );
    lock.request(3, 5_001).expect("second request");
    // late answer to the first request
    assert!(!lock.on_deny(0, 5_002));
    assert_eq!(lock.state(), LockState::PendingFor(ALICE));
    assert_eq!(lock.piece(), Some(3));
    assert!(lock.on_deny(3, 5_003));
    assert_eq!(lock.state(), LockState::Unlocked);
}

#[test]
fn peer_holding_blocks_local_request() {
    // scenario: A holds the lock, B asks and must be refused until A is done
    let mut bob = LockCoordinator::with_local(BOB);
    assert!(!bob.on_acquired(ALICE, 0));
    assert_eq!(bob.state(), LockState::HeldBy(ALICE));
    assert_eq!(bob.request(1, 5), Err(LockError::Busy { holder: ALICE }));
    assert_eq!(bob.state(), LockState::HeldBy(ALICE));

    assert!(!bob.on_released(ALICE, 10));
    assert_eq!(bob.state(), LockState::Unlocked);
    bob.request(1, 20).expect("free after release");
    assert_eq!(bob.state(), LockState::PendingFor(BOB));
}

#[test]
fn authority_overrides_our_pending_request() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(0, 0).expect("request");
    assert!(alice.on_acquired(BOB, 5));
    assert_eq!(alice.state(), LockState::HeldBy(BOB));
    assert_eq!(alice.piece(), None);
}

#[test]
fn acquired_for_self_confirms_pending() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(2, 0).expect("request");
    assert!(!alice.on_acquired(ALICE, 5));
    assert_eq!(alice.state(), LockState::HeldBy(ALICE));
    assert_eq!(alice.piece(), Some(2));
}

#[test]
fn acquired_for_self_after_giving_up_stays_unlocked() {
    let mut alice = LockCoordinator::with_local(ALICE);
    assert!(!alice.on_acquired(ALICE, 5));
    assert_eq!(alice.state(), LockState::Unlocked);
    assert_eq!(alice.piece(), None);
    assert!(!alice.can_submit());
}

#[test]
fn unsolicited_grant_is_adopted() {
    let mut alice = LockCoordinator::with_local(ALICE);
    assert_eq!(alice.on_grant(4, 0), GrantOutcome::Unsolicited);
    assert_eq!(alice.state(), LockState::HeldBy(ALICE));
}

#[test]
fn release_of_peer_does_not_cancel_our_request() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(0, 0).expect("request");
    assert!(!alice.on_released(BOB, 5));
    assert_eq!(alice.state(), LockState::PendingFor(ALICE));
}

#[test]
fn release_naming_us_ends_our_hold() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(0, 0).expect("request");
    alice.on_grant(0, 1);
    assert!(alice.on_released(ALICE, 2));
    assert_eq!(alice.state(), LockState::Unlocked);
}

#[test]
fn commit_completes_the_hold() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(0, 0).expect("request");
    alice.on_grant(0, 1);
    alice.on_commit(2);
    assert_eq!(alice.state(), LockState::Unlocked);
}

#[test]
fn disconnect_forgets_everything() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(0, 0).expect("request");
    alice.on_grant(0, 1);
    alice.on_disconnect();
    assert_eq!(alice.state(), LockState::Unlocked);
    assert_eq!(alice.local(), None);
    assert_eq!(alice.piece(), None);
}

#[test]
fn unanswered_request_times_out() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(5, 1_000).expect("request");
    assert_eq!(alice.expire(5_999, TIMEOUTS), None);
    assert_eq!(
        alice.expire(6_000, TIMEOUTS),
        Some(LockExpiry::RequestTimedOut { piece: Some(5) })
    );
    assert_eq!(alice.state(), LockState::Unlocked);
}

#[test]
fn idle_self_hold_expires() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.request(1, 0).expect("request");
    alice.on_grant(1, 100);
    alice.touch(ALICE, 20_000);
    assert_eq!(alice.expire(49_999, TIMEOUTS), None);
    assert_eq!(
        alice.expire(50_000, TIMEOUTS),
        Some(LockExpiry::SelfIdle { piece: Some(1) })
    );
}

#[test]
fn idle_peer_hold_expires_unless_active() {
    let mut alice = LockCoordinator::with_local(ALICE);
    alice.on_acquired(BOB, 0);
    alice.touch(BOB, 25_000);
    assert_eq!(alice.expire(40_000, TIMEOUTS), None);
    assert_eq!(
        alice.expire(55_000, TIMEOUTS),
        Some(LockExpiry::PeerIdle { holder: BOB })
    );
    assert_eq!(alice.state(), LockState::Unlocked);
    alice.request(0, 55_001).expect("free again");
}

#[test]
fn unlocked_never_expires() {
    let mut alice = LockCoordinator::with_local(ALICE);
    assert_eq!(alice.expire(u64::MAX, TIMEOUTS), None);
}
