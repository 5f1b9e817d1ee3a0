//! A small interactive Unix shell.
//!
//! This crate implements the command-resolution and process-orchestration
//! engine of an interactive shell: tokenization, redirection and pipeline
//! detection, process spawning with I/O retargeting, foreground/background
//! scheduling, asynchronous reaping of terminated children, and a table of
//! built-in commands (job control, shell variables, history recall).
//!
//! The main entry point is [`Interpreter`], which evaluates one raw command
//! line at a time against explicitly owned state (environment, job table,
//! history). The binary wraps it in a rustyline read loop; the library is
//! fully usable headless, which is how the integration tests drive it.

mod builtin;
pub mod command;
pub mod env;
pub mod exec;
pub mod history;
mod interpreter;
pub mod jobs;
pub mod lexer;
pub mod parser;
pub mod sig;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, Options};
