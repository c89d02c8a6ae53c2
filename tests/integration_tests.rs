//! Integration tests for the embedding lifecycle.
//!
//! Each test drives the public API against the fake runtime and verifies
//! the full pipeline:
//!   register → Session/start → in-session work → stop → (restart)

use std::ffi::OsString;
#[cfg(unix)]
use std::os::unix::ffi::OsStringExt;

use ember::{
    fake::{dummy_module, FakeRuntime},
    EmbedError, ErrorKind, InitOutcome, Interpreter, Session,
};

fn interp() -> Interpreter<FakeRuntime> {
    Interpreter::new(FakeRuntime::new())
}

// ── Start/stop ordering ───────────────────────────────────────────────────────

#[test]
fn second_and_third_start_fail_after_one_success() {
    let mut interp = interp();
    interp.start_default().unwrap();
    for _ in 0..2 {
        let err = interp.start_default().unwrap_err();
        assert_eq!(err, EmbedError::AlreadyRunning);
        assert_eq!(err.kind(), ErrorKind::IllegalState);
    }
    interp.stop().unwrap();
}

#[test]
fn full_cycle_register_start_stop_restart() {
    let mut interp = interp();
    interp
        .register_module("tools", || Ok(dummy_module()))
        .unwrap();
    interp.start_default().unwrap();

    // Registration is now unreachable.
    let err = interp
        .register_module("late", || Ok(dummy_module()))
        .unwrap_err();
    assert_eq!(err, EmbedError::RegisterAfterStart("late".into()));

    // A value created within the session is gone once stop returns.
    interp.runtime_mut().force_internals();
    interp.stop().unwrap();
    assert_eq!(interp.runtime().live_internals(), 0);
    assert_eq!(interp.runtime().freed_internals(), 1);

    // Restart works; the previously registered module is still in the
    // builtin table.
    interp.start_default().unwrap();
    assert!(matches!(
        interp.runtime().import("tools"),
        Some(InitOutcome::Ready(_))
    ));
    interp.stop().unwrap();
}

// ── Module registration ───────────────────────────────────────────────────────

#[test]
fn registered_module_is_importable_once_running() {
    let mut interp = interp();
    interp
        .register_module("greeter", || Ok(dummy_module()))
        .unwrap();
    let mut session = Session::new(&mut interp).unwrap();
    match session.interpreter().runtime().import("greeter") {
        Some(InitOutcome::Ready(_)) => {}
        other => panic!("expected a ready module, got {other:?}"),
    }
    assert!(session.interpreter().runtime().import("absent").is_none());
}

#[test]
fn failing_initializer_reports_import_failure_not_a_crash() {
    let mut interp = interp();
    interp
        .register_module("doomed", || panic!("cannot build module state"))
        .unwrap();
    let mut session = Session::new(&mut interp).unwrap();
    match session.interpreter().runtime().import("doomed") {
        Some(InitOutcome::ImportFailed(msg)) => {
            assert_eq!(msg, "cannot build module state");
        }
        other => panic!("expected import failure, got {other:?}"),
    }
}

// ── Argument delivery ─────────────────────────────────────────────────────────

#[test]
fn zero_host_arguments_become_one_empty_argument() {
    let mut interp = interp();
    interp.start(true, &[], true).unwrap();
    assert_eq!(interp.runtime().argv(), Some(vec![String::new()]));
    interp.stop().unwrap();
}

#[cfg(unix)]
#[test]
fn one_unconvertible_argument_degrades_to_unset_argv() {
    let mut interp = interp();
    let argv = vec![
        OsString::from("first"),
        OsString::from_vec(vec![0xff, 0xfe]),
        OsString::from("third"),
    ];
    interp.start(true, &argv, true).unwrap();
    // Startup still reached the running state; only the arguments were
    // abandoned.
    assert!(interp.is_running());
    assert_eq!(interp.runtime().argv(), None);
    interp.stop().unwrap();
}

// ── Scoped sessions ───────────────────────────────────────────────────────────

#[test]
fn moved_guard_stops_exactly_once_at_scope_exit() {
    let mut interp = interp();
    {
        let first = Session::new(&mut interp).unwrap();
        let _second = first;
    }
    assert!(!interp.is_running());
    assert_eq!(interp.runtime().finalize_count(), 1);
}

#[test]
fn guard_cleans_up_on_panic_exit() {
    let mut interp = interp();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _session = Session::new(&mut interp).unwrap();
        panic!("in-session failure");
    }));
    assert!(outcome.is_err());
    assert!(!interp.is_running());
}

#[test]
fn sessions_can_follow_each_other() {
    let mut interp = interp();
    for round in 1..=3u32 {
        let mut session = Session::new(&mut interp).unwrap();
        assert_eq!(session.interpreter().runtime().finalize_count(), round - 1);
    }
    assert_eq!(interp.runtime().finalize_count(), 3);
}
