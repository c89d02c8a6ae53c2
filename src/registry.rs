//! Pre-start module registration.
//!
//! Host modules are recorded in the runtime's builtin-module table before
//! the runtime exists; the runtime consults the table when an import names
//! one of them. Registration is ordinary host code run before `start` — the
//! before-start invariant is an explicit state check, not a load-order
//! convention.

use std::panic::{self, AssertUnwindSafe};

use crate::error::{EmbedError, Result};
use crate::runtime::{InitOutcome, ModuleHandle, NativeInit, RuntimeApi};

/// Host-side failure of a module initializer body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitError {
    message: String,
}

impl InitError {
    pub fn new(message: impl Into<String>) -> Self {
        InitError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Record `init` under `name` in the runtime's builtin-module table.
///
/// Fails with an illegal-state error once the runtime is initialized, and
/// with a resource-exhausted error when the table cannot take the entry.
/// Duplicate names are left to the runtime's own table semantics.
pub fn register_module<R, F>(rt: &mut R, name: &str, init: F) -> Result<()>
where
    R: RuntimeApi,
    F: Fn() -> std::result::Result<ModuleHandle, InitError> + 'static,
{
    if rt.is_initialized() {
        return Err(EmbedError::RegisterAfterStart(name.to_owned()));
    }
    rt.append_builtin(name, wrap_initializer(init))
        .map_err(|_| EmbedError::TableExhausted(name.to_owned()))
}

/// Adapt a typed host initializer to the runtime's native convention.
///
/// Both an `Err` return and a panic in the body become the import-failed
/// signal; nothing unwinds across the embedding boundary.
fn wrap_initializer<F>(init: F) -> NativeInit
where
    F: Fn() -> std::result::Result<ModuleHandle, InitError> + 'static,
{
    Box::new(move || match panic::catch_unwind(AssertUnwindSafe(&init)) {
        Ok(Ok(module)) => InitOutcome::Ready(module),
        Ok(Err(e)) => InitOutcome::ImportFailed(e.message),
        Err(payload) => InitOutcome::ImportFailed(panic_text(payload.as_ref())),
    })
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "module initializer panicked".to_owned()
    }
}
