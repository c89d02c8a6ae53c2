//! Runtime lifecycle — starting, stopping, and the cleanup of process-wide
//! bookkeeping state.

use std::ffi::OsString;
use std::ptr;

use crate::argv;
use crate::error::{EmbedError, Result};
use crate::registry::{self, InitError};
use crate::runtime::{ModuleHandle, RuntimeApi, INTERNALS_ID};

/// Lifecycle controller for the embedded runtime.
///
/// The runtime is a process-wide singleton: at most one session may be live
/// per process, and this type provides no internal locking. Hosts serialize
/// `register_module`, `start` and `stop` — typically by registering before
/// any threads exist and starting/stopping from one controlling thread.
pub struct Interpreter<R: RuntimeApi> {
    rt: R,
}

impl<R: RuntimeApi> Interpreter<R> {
    pub fn new(rt: R) -> Self {
        Interpreter { rt }
    }

    /// The underlying runtime surface.
    pub fn runtime(&self) -> &R {
        &self.rt
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.rt
    }

    /// Whether a session is currently running. The runtime's own predicate
    /// is the single source of truth; no shadow flag is kept.
    pub fn is_running(&self) -> bool {
        self.rt.is_initialized()
    }

    /// Record a host module initializer, before the runtime starts.
    pub fn register_module<F>(&mut self, name: &str, init: F) -> Result<()>
    where
        F: Fn() -> std::result::Result<ModuleHandle, InitError> + 'static,
    {
        registry::register_module(&mut self.rt, name, init)
    }

    /// Start with the default surface: the runtime installs its own signal
    /// handlers, no program arguments, current directory on the module
    /// search path.
    pub fn start_default(&mut self) -> Result<()> {
        self.start(true, &[], true)
    }

    /// Start a session.
    ///
    /// Runs the runtime's core initialization primitive, then hands `argv`
    /// to the argument encoder. Starting while a session is already running
    /// is caller misuse and fails with an illegal-state error.
    ///
    /// If the runtime's own initialization fails, the process terminates —
    /// the embedded runtime's documented contract, which this layer does
    /// not intercept or convert into a recoverable error.
    pub fn start(
        &mut self,
        install_signal_handlers: bool,
        argv: &[OsString],
        add_cwd_to_path: bool,
    ) -> Result<()> {
        if self.rt.is_initialized() {
            return Err(EmbedError::AlreadyRunning);
        }
        self.rt.initialize(install_signal_handlers);
        argv::set_interpreter_argv(&mut self.rt, argv, add_cwd_to_path);
        Ok(())
    }

    /// Stop the running session and release this layer's own bookkeeping.
    ///
    /// The internals cell is resolved before finalization: first the plain
    /// pointer-to-pointer lookup (which must not force creation), then the
    /// captured builtin namespace — a capsule stashed there under
    /// [`INTERNALS_ID`] takes precedence as the cell to clear. Finalization
    /// itself may lazily create a fresh internals object (teardown code can
    /// force creation by querying for it), so the cell is read again only
    /// after finalization returns, and whatever it points at then is freed.
    ///
    /// Restarting afterwards is supported, with a caveat inherited from the
    /// runtime: native extension state loaded during a previous session
    /// (reference cycles, process-global caches) may not be fully
    /// reclaimed. Only this layer's bookkeeping is promised clean.
    pub fn stop(&mut self) -> Result<()> {
        if !self.rt.is_initialized() {
            return Err(EmbedError::NotRunning);
        }

        let mut cell = self.rt.internals_cell();
        if let Some(stashed) = self.rt.builtins_capsule(INTERNALS_ID) {
            cell = stashed;
        }

        self.rt.finalize();

        // Free after finalize, never before: teardown may still dereference
        // the internals. Re-read through the cell because finalize can have
        // replaced what it points to.
        if !cell.is_null() {
            let internals = unsafe { *cell };
            if !internals.is_null() {
                unsafe {
                    self.rt.free_internals(internals);
                    *cell = ptr::null_mut();
                }
            }
        }
        Ok(())
    }
}
