//! Traits shared by the interpreter's built-in commands.

use crate::env::Environment;
use crate::jobs::JobTable;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line
/// tools.
pub type ExitCode = i32;

/// Object-safe trait for a command the interpreter runs in-process instead
/// of spawning a child.
///
/// Implemented by built-ins via a blanket impl over their typed argument
/// structs.
pub trait Builtin {
    /// Executes the command, writing any user-visible output to `out`.
    fn execute(
        self: Box<Self>,
        out: &mut dyn Write,
        env: &mut Environment,
        jobs: &mut JobTable,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a builtin from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and
    /// arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn Builtin>>;
}
