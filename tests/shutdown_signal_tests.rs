//! Signal-driven shutdown
//!
//! Sends SIGTERM to the test process itself, so it lives in its own test
//! binary.

#![cfg(unix)]

mod common;

use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};

use common::*;

fn wait_until(what: &str, check: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !check() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_sigterm_disables_modules_without_runtime() {
    let fixture = ModuleTestFixture::new();
    fixture.add_archive("1.zip", Some(&descriptor_text("Foo", "foo", "1.0")));

    let mut config = fixture.config();
    config.shutdown.listen_for_signals = true;
    config.shutdown.exit_after_signal = false;

    // no tokio runtime on this thread: the listener brings its own
    let mut manager = fixture.manager_with(config);
    manager.init().unwrap();
    let hook = manager.shutdown_hook().unwrap();
    wait_until("the signal listener", || hook.is_listening());
    reset_events();

    let status = Command::new("kill")
        .arg("-TERM")
        .arg(std::process::id().to_string())
        .status()
        .unwrap();
    assert!(status.success());

    wait_until("the disable pass", || count("disable:foo") == 1);
    assert!(hook.has_fired());
    assert!(!manager.is_loaded("foo"));

    drop(manager);
    assert_eq!(count("disable:foo"), 1);
}
