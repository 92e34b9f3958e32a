use crate::errors::ShellError;

/// Upper bound on concurrently tracked background jobs.
pub const MAX_JOBS: usize = 100;

/// A single tracked background job: the pid of its terminal stage plus a
/// snapshot of the command line for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub pid: i32,
    pub command: String,
}

/// Bounded registry of background jobs.
///
/// Indices are presentation order and stay dense: removing a job shifts every
/// later entry down by one. A pid appears at most once.
#[derive(Debug)]
pub struct JobTable {
    jobs: Vec<Job>,
    capacity: usize,
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::with_capacity(MAX_JOBS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.jobs.len() >= self.capacity
    }

    /// Append a job at the next free index and return that index.
    /// Fails with `CapacityExceeded` when the table is full.
    pub fn insert(&mut self, pid: i32, command: String) -> Result<usize, ShellError> {
        if self.is_full() {
            return Err(ShellError::CapacityExceeded(self.capacity));
        }
        debug_assert!(self.jobs.iter().all(|j| j.pid != pid));
        self.jobs.push(Job { pid, command });
        Ok(self.jobs.len() - 1)
    }

    /// Remove the job tracking `pid`, shifting later entries down to keep
    /// indices dense. Removing an untracked pid is a no-op.
    pub fn remove(&mut self, pid: i32) {
        if let Some(index) = self.position_of(pid) {
            self.jobs.remove(index);
        }
    }

    /// Index of the job tracking `pid`, if any.
    pub fn position_of(&self, pid: i32) -> Option<usize> {
        self.jobs.iter().position(|j| j.pid == pid)
    }

    /// The job at `index`, or `NoSuchJob` when the index is out of range.
    pub fn get(&self, index: usize) -> Result<&Job, ShellError> {
        self.jobs.get(index).ok_or(ShellError::NoSuchJob(index))
    }

    /// Jobs in index order. Never blocks, never mutates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Job)> {
        self.jobs.iter().enumerate()
    }

    /// Pids of every tracked job, for the shutdown path.
    pub fn pids(&self) -> Vec<i32> {
        self.jobs.iter().map(|j| j.pid).collect()
    }

    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
