//! The interpreter: per-line evaluation and the interactive loop.

use crate::builtin;
use crate::command::{Builtin, CommandFactory};
use crate::env::Environment;
use crate::exec::{self, Outcome};
use crate::history::History;
use crate::jobs::{self, JobTable};
use crate::lexer;
use crate::parser::{self, ResolvedLine};
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// Factory allows creating instances of builtin commands.
///
/// Only supports commands defined in this crate; see
/// [`builtin::default_factories`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Interpreter behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Replicate the historical double dispatch: after a variable builtin
    /// (`set`, `export`, `unset`, `printenv`) runs, the same line also goes
    /// through ordinary redirection/pipe/execution handling. Off by
    /// default.
    pub var_exec_fallthrough: bool,
}

/// An interactive command interpreter with pipes, redirection, background
/// jobs and a built-in command table.
///
/// All state (environment, variable store, job table, history) is owned
/// here and passed explicitly, so the interpreter can be driven headless:
///
/// ```
/// use minish::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// sh.eval_line("set greeting hello", &mut out).unwrap();
/// ```
pub struct Interpreter {
    env: Environment,
    jobs: JobTable,
    history: History,
    builtins: Vec<Box<dyn CommandFactory>>,
    options: Options,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Interpreter {
    pub fn new(options: Options) -> Self {
        Self {
            env: Environment::new(),
            jobs: JobTable::new(),
            history: History::new(),
            builtins: builtin::default_factories(),
            options,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// True once the `exit` builtin has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Evaluate one raw command line, writing all user-visible reports to
    /// `out`.
    ///
    /// Parse errors, builtin usage errors and child-local failures are
    /// reported and consumed; an `Err` from this method means the host
    /// cannot support further execution (pipe or fork failure) and the
    /// caller should terminate.
    pub fn eval_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        if let Some(index) = line.strip_prefix('!') {
            return self.recall(index, out);
        }
        if line.trim().is_empty() {
            return Ok(());
        }
        self.history.record(line);
        self.execute_line(line, out)
    }

    /// Re-run a stored line by history index. The recalled line is resolved
    /// and executed in full but not re-recorded.
    fn recall(&mut self, index: &str, out: &mut dyn Write) -> Result<()> {
        let n: i32 = match index.trim().parse() {
            Ok(n) => n,
            Err(_) => {
                writeln!(out, "history: invalid index: {index}")?;
                return Ok(());
            }
        };
        let Some(stored) = self.history.recall(n).map(str::to_owned) else {
            writeln!(out, "no such command in history")?;
            return Ok(());
        };
        writeln!(out, "{stored}")?;
        self.execute_line(&stored, out)
    }

    fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let tokens = match lexer::tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                writeln!(out, "{e}")?;
                return Ok(());
            }
        };
        if tokens.is_empty() {
            return Ok(());
        }
        let resolved = match parser::resolve(tokens) {
            Ok(resolved) => resolved,
            Err(e) => {
                writeln!(out, "{e}")?;
                return Ok(());
            }
        };
        tracing::debug!(?resolved, "resolved command line");

        if let Some(cmd) = self.lookup_builtin(&resolved) {
            let _code = cmd.execute(out, &mut self.env, &mut self.jobs)?;
            let falls_through = self.options.var_exec_fallthrough
                && builtin::is_variable_builtin(&resolved.head().program);
            if !falls_through {
                return Ok(());
            }
        }

        self.dispatch_external(&resolved, out)
    }

    /// A builtin name intercepts the line; the head command's arguments are
    /// handed over with control operators already stripped.
    fn lookup_builtin(&self, resolved: &ResolvedLine) -> Option<Box<dyn Builtin>> {
        let head = resolved.head();
        let args: Vec<&str> = head.args.iter().map(String::as_str).collect();
        self.builtins
            .iter()
            .find_map(|factory| factory.try_create(&head.program, &args))
    }

    fn dispatch_external(&mut self, resolved: &ResolvedLine, out: &mut dyn Write) -> Result<()> {
        if let ResolvedLine::Single(spec) = resolved {
            if spec.background && self.jobs.is_full() {
                writeln!(
                    out,
                    "too many background jobs (limit is {})",
                    jobs::MAX_JOBS
                )?;
                return Ok(());
            }
        }
        match exec::run(resolved, &mut self.jobs)? {
            Outcome::Exited(code) => writeln!(out, "child exited with status {code}")?,
            Outcome::Launched { index, pid } => writeln!(out, "[{index}] {pid}")?,
        }
        Ok(())
    }

    /// The interactive read loop: prompt, read, evaluate, until `exit` or
    /// end-of-input.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let mut stdout = std::io::stdout();

        loop {
            match rl.readline(&self.render_prompt()) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    self.eval_line(&line, &mut stdout)?;
                    if self.env.should_exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    fn render_prompt(&self) -> String {
        let user = nix::unistd::User::from_uid(nix::unistd::getuid())
            .ok()
            .flatten()
            .map(|user| user.name)
            .unwrap_or_else(|| "unknown".to_string());
        format!("{}@{}$ ", user, self.env.current_dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(sh: &mut Interpreter, line: &str) -> String {
        let mut out: Vec<u8> = Vec::new();
        sh.eval_line(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_line_is_skipped_and_not_recorded() {
        let mut sh = Interpreter::default();
        let output = eval(&mut sh, "");
        assert!(output.is_empty());
        let output = eval(&mut sh, "   \t ");
        assert!(output.is_empty());
        assert!(sh.history().is_empty());
    }

    #[test]
    fn variable_builtins_update_state_through_the_line_path() {
        let mut sh = Interpreter::default();
        eval(&mut sh, "set x 1");
        assert_eq!(sh.env().vars.get("x"), Some("1"));
        eval(&mut sh, "unset x");
        assert_eq!(sh.env().vars.get("x"), None);
        assert_eq!(sh.history().len(), 2);
    }

    #[test]
    fn builtin_with_redirection_tokens_suppresses_execution() {
        let mut sh = Interpreter::default();
        // The resolver consumes the operator pair; the builtin sees clean
        // arguments and no child process is spawned.
        let output = eval(&mut sh, "set x 1 < missing-input-file");
        assert!(output.is_empty(), "unexpected output: {output}");
        assert_eq!(sh.env().vars.get("x"), Some("1"));
    }

    #[test]
    fn variable_builtin_fallthrough_also_dispatches_the_line() {
        let mut sh = Interpreter::new(Options {
            var_exec_fallthrough: true,
        });
        // The builtin effect happens, and the line is additionally handed
        // to ordinary execution, where no external `set` program exists.
        let output = eval(&mut sh, "set x 1");
        assert_eq!(sh.env().vars.get("x"), Some("1"));
        assert!(
            output.contains("child exited with status 127"),
            "fallthrough should spawn and fail: {output}"
        );
    }

    #[test]
    fn too_many_tokens_reports_and_continues() {
        let mut sh = Interpreter::default();
        let line = "a b c d e f g h i j k";
        let output = eval(&mut sh, line);
        assert!(output.contains("too many arguments"));
        // The next line still evaluates normally.
        eval(&mut sh, "set y 2");
        assert_eq!(sh.env().vars.get("y"), Some("2"));
    }

    #[test]
    fn dangling_redirect_reports_and_continues() {
        let mut sh = Interpreter::default();
        let output = eval(&mut sh, "cat <");
        assert!(output.contains("requires a file path"));
    }

    #[test]
    fn background_pipeline_is_rejected_with_a_message() {
        let mut sh = Interpreter::default();
        let output = eval(&mut sh, "ls | wc &");
        assert!(output.contains("background"));
    }

    #[test]
    fn recall_reruns_a_slot_without_recording() {
        let mut sh = Interpreter::default();
        eval(&mut sh, "set x 1");
        eval(&mut sh, "set x 2");
        assert_eq!(sh.env().vars.get("x"), Some("2"));
        assert_eq!(sh.history().len(), 2);

        let output = eval(&mut sh, "!1");
        assert!(output.contains("set x 1"));
        assert_eq!(sh.env().vars.get("x"), Some("1"));
        assert_eq!(sh.history().len(), 2);
    }

    #[test]
    fn recall_most_recent_with_minus_one() {
        let mut sh = Interpreter::default();
        eval(&mut sh, "set x 1");
        eval(&mut sh, "set x 3");
        let output = eval(&mut sh, "!-1");
        assert!(output.contains("set x 3"));
        assert_eq!(sh.history().len(), 2);
    }

    #[test]
    fn recall_of_unknown_slot_reports() {
        let mut sh = Interpreter::default();
        let output = eval(&mut sh, "!7");
        assert!(output.contains("no such command in history"));
    }

    #[test]
    fn recall_with_a_non_numeric_index_reports() {
        let mut sh = Interpreter::default();
        let output = eval(&mut sh, "!abc");
        assert!(output.contains("invalid index"));
    }

    #[test]
    fn exit_builtin_flags_the_loop() {
        let mut sh = Interpreter::default();
        eval(&mut sh, "exit");
        assert!(sh.should_exit());
    }
}
