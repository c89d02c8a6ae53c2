//! Ember — embed a managed scripting runtime inside a host process.
//!
//! This crate is the lifecycle layer only: starting the runtime exactly
//! once, registering host extension modules before startup, converting host
//! arguments to the runtime's wide encoding, and tearing everything down in
//! an order that can never double-free the process-wide bookkeeping. Object
//! wrapping and value conversion belong to a separate layer and are
//! consumed here only through the [`RuntimeApi`] seam.
//!
//! # Quick start
//!
//! ```rust
//! use ember::{fake::FakeRuntime, Interpreter, Session};
//!
//! let mut interp = Interpreter::new(FakeRuntime::new());
//! interp
//!     .register_module("greeter", || Ok(ember::fake::dummy_module()))
//!     .unwrap();
//! {
//!     let mut session = Session::new(&mut interp).unwrap();
//!     assert!(session.interpreter().is_running());
//! }
//! assert!(!interp.is_running());
//! ```

pub mod argv;
pub mod error;
pub mod fake;
pub mod interpreter;
pub mod registry;
pub mod runtime;
pub mod session;

pub use error::{EmbedError, ErrorKind, Result};
pub use interpreter::Interpreter;
pub use registry::{register_module, InitError};
pub use runtime::{ApiVersion, InitOutcome, ModuleHandle, RuntimeApi};
pub use session::Session;
