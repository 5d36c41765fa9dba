// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::at(100);
    assert_eq!(clock.now_secs(), 100);
    clock.advance(Duration::from_secs(30));
    assert_eq!(clock.now_secs(), 130);
}

#[test]
fn fake_clock_can_be_set() {
    let clock = FakeClock::new();
    clock.set(42);
    assert_eq!(clock.now_secs(), 42);
}

#[test]
fn system_clock_is_positive() {
    let clock = SystemClock;
    assert!(clock.now_secs() > 0);
}
