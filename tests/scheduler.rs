use parhelion::{UpdateGate, UpdatePolicy};

#[test]
fn every_tick_always_permits() {
    let mut gate = UpdateGate::default();

    for tick in 0..100 {
        assert!(gate.permits(UpdatePolicy::EveryTick, tick as f64 / 240.0));
    }
}

#[test]
fn manual_never_permits() {
    let mut gate = UpdateGate::default();

    for tick in 0..100 {
        assert!(!gate.permits(UpdatePolicy::Manual, tick as f64 / 240.0));
    }
}

#[test]
fn fixed_rate_holds_its_cadence() {
    let policy = UpdatePolicy::FixedRate { rate: 30.0 };
    let mut gate = UpdateGate::default();

    let mut permitted = 0;

    // ten simulated seconds at 240 ticks per second
    for tick in 0..2400 {
        if gate.permits(policy, tick as f64 / 240.0) {
            permitted += 1;
        }
    }

    assert!((299..=301).contains(&permitted), "{} passes", permitted);
}

#[test]
fn missed_windows_are_skipped_not_queued() {
    let policy = UpdatePolicy::FixedRate { rate: 30.0 };
    let mut gate = UpdateGate::default();

    assert!(gate.permits(policy, 0.0));

    // a long stall earns exactly one pass, not thirty
    assert!(gate.permits(policy, 10.0));
    assert!(!gate.permits(policy, 10.01));
    assert!(gate.permits(policy, 10.0 + 1.0 / 30.0));
}

#[test]
fn nonpositive_rates_never_permit() {
    let mut gate = UpdateGate::default();

    assert!(!gate.permits(UpdatePolicy::FixedRate { rate: 0.0 }, 1.0));
    assert!(!gate.permits(UpdatePolicy::FixedRate { rate: -1.0 }, 1.0));
}

#[test]
fn reset_reopens_the_window() {
    let policy = UpdatePolicy::FixedRate { rate: 30.0 };
    let mut gate = UpdateGate::default();

    assert!(gate.permits(policy, 5.0));
    assert!(!gate.permits(policy, 5.0));

    gate.reset();

    assert!(gate.permits(policy, 5.0));
}
