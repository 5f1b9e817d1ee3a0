//! Built-in commands known to the shell at compile time.
//!
//! Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
//! directly in-process without spawning a child process. A builtin name
//! suppresses external execution for its line; the variable builtins
//! (`set`, `export`, `unset`, `printenv`) can additionally fall through to
//! ordinary execution when the interpreter runs with the legacy
//! double-dispatch option.

use crate::command::{Builtin, CommandFactory, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::jobs::JobTable;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Typed builtin commands parsed from their argument list.
///
/// Return value follows shell conventions: 0 for success, non-zero for
/// error.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "jobs".
    fn name() -> &'static str;

    /// Executes the command using the provided output stream and state.
    fn execute(
        self,
        out: &mut dyn Write,
        env: &mut Environment,
        jobs: &mut JobTable,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> Builtin for T {
    fn execute(
        self: Box<Self>,
        out: &mut dyn Write,
        env: &mut Environment,
        jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        match BuiltinCommand::execute(*self, out, env, jobs) {
            Ok(code) => Ok(code),
            Err(e) => {
                writeln!(out, "{e}")?;
                Ok(1)
            }
        }
    }
}

/// Fallback produced when argh rejects an invocation; carries the usage or
/// help text argh rendered.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl Builtin for InvalidArgs {
    fn execute(
        self: Box<Self>,
        out: &mut dyn Write,
        _env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        writeln!(out, "{}", self.output.trim_end())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn Builtin>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

/// Factories for every builtin the dispatcher knows.
pub(crate) fn default_factories() -> Vec<Box<dyn CommandFactory>> {
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Jobs>::default()),
        Box::new(Factory::<Kill>::default()),
        Box::new(Factory::<Help>::default()),
        Box::new(Factory::<Set>::default()),
        Box::new(Factory::<Export>::default()),
        Box::new(Factory::<Unset>::default()),
        Box::new(Factory::<Printenv>::default()),
    ]
}

/// The builtins that mutate or print the variable store; subject to the
/// legacy double-dispatch option.
pub(crate) fn is_variable_builtin(name: &str) -> bool {
    matches!(name, "set" | "export" | "unset" | "printenv")
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory
    pub target: String,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _out: &mut dyn Write,
        env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        let target = PathBuf::from(&self.target);
        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: {}: no such directory", new_dir.display()))?;
        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: cannot change to {}", canonical.display()))?;
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Terminate the shell.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _out: &mut dyn Write,
        env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List background jobs.
pub struct Jobs {}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn execute(
        self,
        out: &mut dyn Write,
        _env: &mut Environment,
        jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        writeln!(out, "Background jobs:")?;
        for (index, pid) in jobs.iter() {
            writeln!(out, "[{index}] {pid}")?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Terminate a background job.
pub struct Kill {
    #[argh(positional)]
    /// the 1-based index of the job to terminate, as listed by `jobs`
    pub index: usize,
}

impl BuiltinCommand for Kill {
    fn name() -> &'static str {
        "kill"
    }

    fn execute(
        self,
        out: &mut dyn Write,
        _env: &mut Environment,
        jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        match jobs.kill(self.index) {
            Ok(pid) => {
                writeln!(out, "killed job [{}] {pid}", self.index)?;
                Ok(0)
            }
            Err(e) => {
                writeln!(out, "kill: {e}")?;
                Ok(1)
            }
        }
    }
}

#[derive(FromArgs)]
/// Display help for the built-in commands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(
        self,
        out: &mut dyn Write,
        _env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        writeln!(out, "Built-in commands:")?;
        writeln!(out, "  cd <dir>            Change the current working directory.")?;
        writeln!(out, "  exit                Terminate the shell.")?;
        writeln!(out, "  jobs                List background jobs.")?;
        writeln!(out, "  kill <job_index>    Terminate a background job.")?;
        writeln!(out, "  help                Display this help message.")?;
        writeln!(out, "  set <name> <value>  Define or overwrite a shell variable.")?;
        writeln!(out, "  export <name>       Make a variable visible to child processes.")?;
        writeln!(out, "  unset <name>        Remove a shell variable.")?;
        writeln!(out, "  printenv            List shell and exported variables.")?;
        writeln!(out, "Operators:")?;
        writeln!(out, "  cmd < file          Read standard input from a file.")?;
        writeln!(out, "  cmd > file          Write standard output to a file.")?;
        writeln!(out, "  cmd1 | cmd2         Connect two commands with a pipe.")?;
        writeln!(out, "  cmd &               Run a command in the background.")?;
        writeln!(out, "History:")?;
        writeln!(out, "  !<n>                Re-run command number <n>.")?;
        writeln!(out, "  !-1                 Re-run the most recent command.")?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Define or overwrite a shell variable.
pub struct Set {
    #[argh(positional)]
    /// variable name
    pub name: String,

    #[argh(positional)]
    /// value to bind
    pub value: String,
}

impl BuiltinCommand for Set {
    fn name() -> &'static str {
        "set"
    }

    fn execute(
        self,
        _out: &mut dyn Write,
        env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        env.vars.set(&self.name, &self.value, false)?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Mark a shell variable as exported to child processes.
pub struct Export {
    #[argh(positional)]
    /// name of an existing variable
    pub name: String,
}

impl BuiltinCommand for Export {
    fn name() -> &'static str {
        "export"
    }

    fn execute(
        self,
        _out: &mut dyn Write,
        env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        // Exporting a name that was never set is a silent no-op.
        env.vars.export(&self.name);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove a shell variable.
pub struct Unset {
    #[argh(positional)]
    /// name of the variable to remove
    pub name: String,
}

impl BuiltinCommand for Unset {
    fn name() -> &'static str {
        "unset"
    }

    fn execute(
        self,
        _out: &mut dyn Write,
        env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        env.vars.unset(&self.name);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// List shell variables and exported environment variables.
pub struct Printenv {}

impl BuiltinCommand for Printenv {
    fn name() -> &'static str {
        "printenv"
    }

    fn execute(
        self,
        out: &mut dyn Write,
        env: &mut Environment,
        _jobs: &mut JobTable,
    ) -> Result<ExitCode> {
        writeln!(out, "User-defined variables:")?;
        for var in env.vars.locals() {
            writeln!(out, "  {}={}", var.name, var.value)?;
        }
        writeln!(out, "Environment variables:")?;
        for var in env.vars.exported() {
            writeln!(out, "  {}={}", var.name, var.value)?;
        }
        Ok(0)
    }
}
