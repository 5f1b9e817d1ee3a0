//! Bounded table of background jobs.
//!
//! Each entry is a background child's pid; display indices are 1-based and
//! re-numbered after every removal, so they are positions, not stable
//! identifiers. The table is mutated only by the main command loop; the
//! asynchronous reaper never touches it.

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fmt;

/// Upper bound on the number of simultaneously tracked jobs.
pub const MAX_JOBS: usize = 100;

/// Errors reported by job table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobError {
    /// The table is at capacity.
    TableFull,
    /// The display index is outside `1..=len`.
    NoSuchJob(usize),
    /// The termination signal could not be delivered; the table is left
    /// unchanged.
    Kill(nix::Error),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::TableFull => {
                write!(f, "too many background jobs (limit is {MAX_JOBS})")
            }
            JobError::NoSuchJob(index) => write!(f, "no such job: {index}"),
            JobError::Kill(errno) => write!(f, "kill failed: {errno}"),
        }
    }
}

impl std::error::Error for JobError {}

/// Bounded list of background process identifiers in insertion order.
#[derive(Debug, Clone, Default)]
pub struct JobTable {
    pids: Vec<Pid>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a background pid. Returns the new job's 1-based display
    /// index.
    pub fn add(&mut self, pid: Pid) -> Result<usize, JobError> {
        if self.pids.len() == MAX_JOBS {
            return Err(JobError::TableFull);
        }
        self.pids.push(pid);
        Ok(self.pids.len())
    }

    /// Jobs as `(display_index, pid)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Pid)> + '_ {
        self.pids.iter().enumerate().map(|(i, &pid)| (i + 1, pid))
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pids.len() == MAX_JOBS
    }

    /// Send SIGKILL to the job at a 1-based display index.
    ///
    /// On success the entry is removed and every later entry shifts one
    /// display slot down. On failure the table is not mutated and the OS
    /// error is reported.
    pub fn kill(&mut self, index: usize) -> Result<Pid, JobError> {
        if index == 0 || index > self.pids.len() {
            return Err(JobError::NoSuchJob(index));
        }
        let pid = self.pids[index - 1];
        signal::kill(pid, Signal::SIGKILL).map_err(JobError::Kill)?;
        self.pids.remove(index - 1);
        Ok(pid)
    }
}
