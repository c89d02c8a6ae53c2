//! demos/host — a host application embedding the runtime.
//!
//! Shows the intended shape of an embedding host:
//!   1. Register native modules while nothing is running.
//!   2. Open a scoped session (arguments are encoded and delivered here).
//!   3. Do in-session work — importing the registered module.
//!   4. Let the guard stop the runtime at scope exit.

use std::env;

use ember::{
    fake::{dummy_module, FakeRuntime},
    InitOutcome, Interpreter, Session,
};

fn main() {
    let mut interp = Interpreter::new(FakeRuntime::new());

    interp
        .register_module("host_tools", || Ok(dummy_module()))
        .expect("registration before start cannot hit the table limit here");

    let argv: Vec<_> = env::args_os().collect();
    {
        let mut session =
            Session::with_args(&mut interp, true, &argv, false).expect("no session is running yet");

        let interp = session.interpreter();
        println!("runtime running: {}", interp.is_running());
        println!("delivered argv:  {:?}", interp.runtime().argv());

        match interp.runtime().import("host_tools") {
            Some(InitOutcome::Ready(_)) => println!("host_tools imported"),
            Some(InitOutcome::ImportFailed(msg)) => println!("import failed: {msg}"),
            None => println!("host_tools is not a builtin"),
        }
    }

    println!("runtime running after scope exit: {}", interp.is_running());
}
