//! Scope-bound sessions.

use std::ffi::OsString;

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::runtime::RuntimeApi;

/// A running session tied to a lexical scope.
///
/// Construction starts the runtime; Drop stops it, on every normal and
/// unwinding exit path. The guard borrows the interpreter exclusively for
/// its whole lifetime, so no *other* holder can open a second guard or call
/// `stop` underneath it — those are compile errors. The guard holder can
/// still reach the lifecycle through [`Session::interpreter`]; stopping
/// that way is tolerated, and Drop then finds nothing left to do. Ownership
/// moves with the value: a moved-from binding is statically dead, exactly
/// one Drop ever runs, and there is nothing to double-stop.
///
/// Values obtained from the runtime must not outlive the session that
/// produced them.
pub struct Session<'a, R: RuntimeApi> {
    interp: &'a mut Interpreter<R>,
}

impl<'a, R: RuntimeApi> Session<'a, R> {
    /// Start a session with the default start surface.
    pub fn new(interp: &'a mut Interpreter<R>) -> Result<Self> {
        interp.start_default()?;
        Ok(Session { interp })
    }

    /// Start a session, forwarding the full start signature.
    pub fn with_args(
        interp: &'a mut Interpreter<R>,
        install_signal_handlers: bool,
        argv: &[OsString],
        add_cwd_to_path: bool,
    ) -> Result<Self> {
        interp.start(install_signal_handlers, argv, add_cwd_to_path)?;
        Ok(Session { interp })
    }

    /// The interpreter this session runs on, for in-session work.
    pub fn interpreter(&mut self) -> &mut Interpreter<R> {
        self.interp
    }
}

impl<R: RuntimeApi> Drop for Session<'_, R> {
    fn drop(&mut self) {
        // The exclusive borrow keeps other holders away from `stop`, but
        // the guard holder may have stopped (or cycled) the session through
        // `interpreter()`. A not-running session at this point is therefore
        // fine; Drop has nowhere to report anyway.
        let _ = self.interp.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRuntime;

    #[test]
    fn scope_exit_stops_the_runtime() {
        let mut interp = Interpreter::new(FakeRuntime::new());
        {
            let mut session = Session::new(&mut interp).unwrap();
            assert!(session.interpreter().is_running());
        }
        assert!(!interp.is_running());
        assert_eq!(interp.runtime().finalize_count(), 1);
    }

    #[test]
    fn moving_the_guard_stops_exactly_once() {
        let mut interp = Interpreter::new(FakeRuntime::new());
        {
            let session = Session::new(&mut interp).unwrap();
            let moved = session;
            drop(moved);
        }
        assert!(!interp.is_running());
        assert_eq!(interp.runtime().finalize_count(), 1);
    }

    #[test]
    fn guard_returned_from_a_function_keeps_the_session_alive() {
        fn open<R: RuntimeApi>(interp: &mut Interpreter<R>) -> Session<'_, R> {
            Session::new(interp).unwrap()
        }
        let mut interp = Interpreter::new(FakeRuntime::new());
        {
            let mut session = open(&mut interp);
            assert!(session.interpreter().is_running());
        }
        assert!(!interp.is_running());
        assert_eq!(interp.runtime().finalize_count(), 1);
    }

    #[test]
    fn guard_stops_on_unwind() {
        let mut interp = Interpreter::new(FakeRuntime::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _session = Session::new(&mut interp).unwrap();
            panic!("host blew up mid-session");
        }));
        assert!(result.is_err());
        assert!(!interp.is_running());
        assert_eq!(interp.runtime().finalize_count(), 1);
    }

    #[test]
    fn manual_stop_through_the_guard_is_tolerated() {
        let mut interp = Interpreter::new(FakeRuntime::new());
        {
            let mut session = Session::new(&mut interp).unwrap();
            session.interpreter().stop().unwrap();
        }
        // Drop found the session already stopped and did not stop again.
        assert!(!interp.is_running());
        assert_eq!(interp.runtime().finalize_count(), 1);
    }

    #[test]
    fn with_args_forwards_the_start_surface() {
        let mut interp = Interpreter::new(FakeRuntime::new());
        {
            let _session =
                Session::with_args(&mut interp, false, &[OsString::from("host")], false)
                    .unwrap();
        }
        assert_eq!(interp.runtime().signal_handlers(), Some(false));
        assert_eq!(interp.runtime().argv(), Some(vec!["host".into()]));
        assert_eq!(interp.runtime().cwd_on_path(), Some(false));
    }
}
