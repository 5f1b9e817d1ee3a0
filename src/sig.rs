//! SIGCHLD handling: asynchronous reaping of terminated children.
//!
//! The handler's sole responsibility is draining zombies with a
//! non-blocking wait loop. It touches no interpreter state, so it needs no
//! locks and is safe to run concurrently with the main command loop. The
//! one interaction it must not have, claiming a child the orchestrator is
//! about to wait for, is ruled out by [`SigchldBlock`], which masks the
//! signal across every foreground fork-and-wait.

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// Reap every already-terminated child without blocking.
///
/// Runs in signal context; waitpid is async-signal-safe.
extern "C" fn reap_children(_signo: libc::c_int) {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            // Children remain but none have terminated, or no children left.
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

/// Install the SIGCHLD reaper for the lifetime of the process.
pub fn install_sigchld_handler() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(reap_children),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // Safety: the handler only performs non-blocking waitpid calls.
    unsafe { signal::sigaction(Signal::SIGCHLD, &action) }?;
    tracing::debug!("installed SIGCHLD reaper");
    Ok(())
}

/// Blocks SIGCHLD for the guard's lifetime.
///
/// Held across a foreground fork and wait so the asynchronous reaper cannot
/// claim the awaited child. Signals arriving while blocked stay pending and
/// deliver on drop, reaping any background child that terminated meanwhile.
#[derive(Debug)]
pub struct SigchldBlock {
    set: SigSet,
}

impl SigchldBlock {
    pub fn new() -> nix::Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGCHLD);
        signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&set), None)?;
        Ok(Self { set })
    }
}

impl Drop for SigchldBlock {
    fn drop(&mut self) {
        let _ = signal::sigprocmask(SigmaskHow::SIG_UNBLOCK, Some(&self.set), None);
    }
}
