//! Process creation, I/O retargeting and foreground/background scheduling.
//!
//! A single command forks one child; a pipeline creates one pipe and forks
//! two. All child-side setup funnels through [`child_setup`], whose tagged
//! failure result is translated into a distinguished exit status in exactly
//! one place: 1 for redirection failures, 127 when the program cannot be
//! found, 126 when the exec itself fails. Foreground waits run with SIGCHLD
//! blocked so the asynchronous reaper cannot claim the awaited child.
//! Inability to create a pipe or fork is reported as an error to the
//! caller, which treats it as fatal to the interpreter.

use crate::command::ExitCode;
use crate::jobs::JobTable;
use crate::parser::{CommandSpec, PipelineSpec, ResolvedLine};
use crate::sig::SigchldBlock;
use anyhow::{Context, Result};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::borrow::Cow;
use std::convert::Infallible;
use std::env;
use std::ffi::CString;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// What became of a fully dispatched command line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Foreground execution finished with this exit code.
    Exited(ExitCode),
    /// A background job was registered at this display index.
    Launched { index: usize, pid: Pid },
}

/// Execute a resolved line, blocking for foreground commands and pipelines.
///
/// Errors returned here indicate the host environment cannot support
/// further execution (pipe or fork failure); everything local to a child is
/// reported through the child's own exit status.
pub fn run(line: &ResolvedLine, jobs: &mut JobTable) -> Result<Outcome> {
    match line {
        ResolvedLine::Single(spec) if spec.background => run_background(spec, jobs),
        ResolvedLine::Single(spec) => run_foreground(spec),
        ResolvedLine::Pipeline(pipeline) => run_pipeline(pipeline),
    }
}

fn run_foreground(spec: &CommandSpec) -> Result<Outcome> {
    let _guard = SigchldBlock::new().context("cannot block SIGCHLD")?;
    // Safety: the child branch only redirects descriptors and execs.
    match unsafe { unistd::fork() }.context("fork failed")? {
        ForkResult::Child => exec_child(spec, None),
        ForkResult::Parent { child } => {
            tracing::debug!(pid = child.as_raw(), program = %spec.program, "spawned foreground child");
            let code = wait_for(child)?;
            Ok(Outcome::Exited(code))
        }
    }
}

fn run_background(spec: &CommandSpec, jobs: &mut JobTable) -> Result<Outcome> {
    // Safety: as above.
    match unsafe { unistd::fork() }.context("fork failed")? {
        ForkResult::Child => exec_child(spec, None),
        ForkResult::Parent { child } => {
            let index = jobs.add(child)?;
            tracing::debug!(pid = child.as_raw(), index, program = %spec.program, "registered background job");
            Ok(Outcome::Launched { index, pid: child })
        }
    }
}

fn run_pipeline(pipeline: &PipelineSpec) -> Result<Outcome> {
    let _guard = SigchldBlock::new().context("cannot block SIGCHLD")?;
    let (read_end, write_end) = unistd::pipe().context("pipe creation failed")?;

    // Safety: as above.
    let left = match unsafe { unistd::fork() }.context("fork failed")? {
        ForkResult::Child => exec_child(
            &pipeline.left,
            Some(PipeEnds {
                role: PipeRole::Left,
                read: read_end,
                write: write_end,
            }),
        ),
        ForkResult::Parent { child } => child,
    };

    // Safety: as above.
    let right = match unsafe { unistd::fork() }.context("fork failed")? {
        ForkResult::Child => exec_child(
            &pipeline.right,
            Some(PipeEnds {
                role: PipeRole::Right,
                read: read_end,
                write: write_end,
            }),
        ),
        ForkResult::Parent { child } => child,
    };

    // The parent never uses the channel; keeping the write end open would
    // stop the right child from ever seeing end-of-input.
    drop(read_end);
    drop(write_end);

    tracing::debug!(
        left = left.as_raw(),
        right = right.as_raw(),
        "spawned pipeline, waiting for both stages"
    );
    let _ = wait_for(left)?;
    let code = wait_for(right)?;
    Ok(Outcome::Exited(code))
}

/// Block until the given child terminates and extract its real exit code,
/// mapping signal terminations to `128 + signo`.
fn wait_for(pid: Pid) -> Result<ExitCode> {
    loop {
        match waitpid(pid, None).context("waitpid failed")? {
            WaitStatus::Exited(_, code) => return Ok(code),
            WaitStatus::Signaled(_, sig, _) => return Ok(128 + sig as ExitCode),
            _ => {}
        }
    }
}

/// Which stage of a pipeline a child is, and both channel ends it must
/// close after duplicating its own.
struct PipeEnds {
    role: PipeRole,
    read: OwnedFd,
    write: OwnedFd,
}

enum PipeRole {
    Left,
    Right,
}

/// Failures local to a forked child.
enum ChildError {
    OpenInput(PathBuf, io::Error),
    OpenOutput(PathBuf, io::Error),
    Dup(nix::Error),
    NotFound(String),
    NulByte(String),
    Exec(String, nix::Error),
}

impl ChildError {
    fn exit_code(&self) -> ExitCode {
        match self {
            ChildError::OpenInput(..) | ChildError::OpenOutput(..) | ChildError::Dup(_) => 1,
            ChildError::NotFound(_) => 127,
            ChildError::NulByte(_) | ChildError::Exec(..) => 126,
        }
    }
}

impl fmt::Display for ChildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildError::OpenInput(path, e) => {
                write!(f, "cannot open {} for reading: {e}", path.display())
            }
            ChildError::OpenOutput(path, e) => {
                write!(f, "cannot open {} for writing: {e}", path.display())
            }
            ChildError::Dup(errno) => write!(f, "cannot redirect: {errno}"),
            ChildError::NotFound(name) => write!(f, "command not found: {name}"),
            ChildError::NulByte(name) => write!(f, "invalid argument for {name}"),
            ChildError::Exec(name, errno) => write!(f, "cannot execute {name}: {errno}"),
        }
    }
}

/// Runs in the forked child: perform setup and exec, or report the tagged
/// failure and terminate with its distinguished status. Never returns.
fn exec_child(spec: &CommandSpec, pipe: Option<PipeEnds>) -> ! {
    let err = match child_setup(spec, pipe) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    eprintln!("{err}");
    // _exit instead of exit: the forked child must not run the parent's
    // cleanup handlers or flush its cloned stdio buffers.
    unsafe { libc::_exit(err.exit_code()) }
}

fn child_setup(spec: &CommandSpec, pipe: Option<PipeEnds>) -> Result<Infallible, ChildError> {
    if let Some(path) = &spec.stdin_file {
        let file = File::open(path).map_err(|e| ChildError::OpenInput(path.clone(), e))?;
        unistd::dup2(file.as_raw_fd(), libc::STDIN_FILENO).map_err(ChildError::Dup)?;
    }

    if let Some(ends) = pipe {
        let (fd, target) = match ends.role {
            PipeRole::Left => (ends.write.as_raw_fd(), libc::STDOUT_FILENO),
            PipeRole::Right => (ends.read.as_raw_fd(), libc::STDIN_FILENO),
        };
        unistd::dup2(fd, target).map_err(ChildError::Dup)?;
        // Closes both original channel ends; only the duplicates survive.
        drop(ends);
    }

    if let Some(path) = &spec.stdout_file {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o644)
            .open(path)
            .map_err(|e| ChildError::OpenOutput(path.clone(), e))?;
        unistd::dup2(file.as_raw_fd(), libc::STDOUT_FILENO).map_err(ChildError::Dup)?;
    }

    let resolved = find_command_path(Path::new(&spec.program))
        .ok_or_else(|| ChildError::NotFound(spec.program.clone()))?;
    let path = CString::new(resolved.as_os_str().as_bytes())
        .map_err(|_| ChildError::NulByte(spec.program.clone()))?;

    let mut argv = Vec::with_capacity(spec.args.len() + 1);
    argv.push(
        CString::new(spec.program.as_bytes())
            .map_err(|_| ChildError::NulByte(spec.program.clone()))?,
    );
    for arg in &spec.args {
        argv.push(
            CString::new(arg.as_bytes()).map_err(|_| ChildError::NulByte(spec.program.clone()))?,
        );
    }

    match unistd::execv(&path, &argv) {
        Ok(never) => match never {},
        Err(errno) => Err(ChildError::Exec(spec.program.clone(), errno)),
    }
}

/// Resolve a program name the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returned if it names a file.
/// - Path with multiple components (e.g. `bin/sh`, `./foo`): resolved
///   relative to the current directory.
/// - Single component: each directory in `PATH` is searched and the first
///   existing match wins.
/// - Empty name: not found.
fn find_command_path(program: &Path) -> Option<Cow<'_, Path>> {
    if program.is_absolute() {
        return program.is_file().then(|| Cow::Borrowed(program));
    }

    let mut components = program.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => None,
        (Some(name), None) => {
            let search_paths = env::var_os("PATH")?;
            env::split_paths(&search_paths)
                .map(|dir| dir.join(name.as_os_str()))
                .find(|candidate| candidate.is_file())
                .map(Cow::Owned)
        }
        _ => program.is_file().then(|| Cow::Borrowed(program)),
    }
}
