use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use crate::jobs::JobTable;

/// How a reaped child finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitOutcome {
    Exited(i32),
    Signaled(i32),
}

impl WaitOutcome {
    /// Shell-style exit code: `128 + signal` for signal deaths.
    pub fn code(self) -> i32 {
        match self {
            WaitOutcome::Exited(code) => code,
            WaitOutcome::Signaled(signal) => 128 + signal,
        }
    }
}

/// Decode a raw `waitpid` status. `None` for state changes that are neither
/// an exit nor a signal death (not requested by any of our waits).
pub fn classify_wait_status(raw: libc::c_int) -> Option<WaitOutcome> {
    if libc::WIFEXITED(raw) {
        return Some(WaitOutcome::Exited(libc::WEXITSTATUS(raw)));
    }
    if libc::WIFSIGNALED(raw) {
        return Some(WaitOutcome::Signaled(libc::WTERMSIG(raw)));
    }
    None
}

/// Human-readable name for the signals a job plausibly dies from.
pub fn signal_name(signal: i32) -> String {
    match signal {
        libc::SIGHUP => "SIGHUP".into(),
        libc::SIGINT => "SIGINT".into(),
        libc::SIGQUIT => "SIGQUIT".into(),
        libc::SIGABRT => "SIGABRT".into(),
        libc::SIGKILL => "SIGKILL".into(),
        libc::SIGSEGV => "SIGSEGV".into(),
        libc::SIGPIPE => "SIGPIPE".into(),
        libc::SIGTERM => "SIGTERM".into(),
        other => format!("signal {other}"),
    }
}

/// Shared job-control state: the Foreground Slot, the Job Table, and the
/// mirror of any open redirection fds.
///
/// Owned by `main` and shared (`Arc`) with the signal-bridge thread and the
/// Ctrl-C handler. The discipline:
/// - The table `Mutex` is held across spawn-and-register on the dispatcher
///   side and across reap-and-remove on the bridge side, so neither can
///   observe the other mid-update.
/// - The Foreground Slot is cleared by whichever side actually collected the
///   pid: the waiter when its pid-scoped `waitpid` succeeds, the bridge
///   (compare-exchange, after publishing the exit status) when its
///   non-blocking reap got there first.
pub struct JobControl {
    foreground: AtomicI32,
    fg_status: AtomicI32,
    jobs: Mutex<JobTable>,
    redirect_fds: [AtomicI32; 3],
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new()
    }
}

impl JobControl {
    pub fn new() -> Self {
        Self {
            foreground: AtomicI32::new(0),
            fg_status: AtomicI32::new(0),
            jobs: Mutex::new(JobTable::new()),
            redirect_fds: [AtomicI32::new(-1), AtomicI32::new(-1), AtomicI32::new(-1)],
        }
    }

    /// Lock the job table. The guard doubles as the spawn/reap exclusion
    /// described above.
    pub fn jobs(&self) -> std::sync::MutexGuard<'_, JobTable> {
        self.jobs.lock().unwrap()
    }

    pub fn foreground_pid(&self) -> i32 {
        self.foreground.load(Ordering::Acquire)
    }

    /// Claim the Foreground Slot for `pid`. Call while holding the table
    /// lock so the bridge cannot reap the pid before the slot is set.
    pub fn set_foreground(&self, pid: i32) {
        self.foreground.store(pid, Ordering::Release);
    }

    /// Forward SIGINT to the foreground process, if any. Returns false when
    /// the slot is empty (the interrupt is absorbed by the shell).
    pub fn interrupt_foreground(&self) -> bool {
        let pid = self.foreground_pid();
        if pid <= 0 {
            return false;
        }
        send_signal(pid, libc::SIGINT);
        true
    }

    /// Block until `pid`, and specifically `pid`, is reaped, returning its
    /// shell-style exit code. Tolerates being interrupted by the bridge
    /// reaping unrelated background jobs; if the bridge collected this very
    /// pid (our wait was interrupted at the wrong moment), the status it
    /// published is consumed instead.
    pub fn wait_foreground(&self, pid: i32) -> i32 {
        loop {
            let mut raw: libc::c_int = 0;
            let rc = unsafe { libc::waitpid(pid, &mut raw, 0) };
            if rc == pid {
                self.foreground.store(0, Ordering::Release);
                return classify_wait_status(raw).map_or(1, WaitOutcome::code);
            }

            let err = io::Error::last_os_error();
            match err.raw_os_error() {
                Some(libc::EINTR) => continue,
                Some(libc::ECHILD) => return self.take_foreground_status(pid),
                _ => {
                    self.foreground.store(0, Ordering::Release);
                    let _ = writeln!(io::stderr(), "msh: wait: {err}");
                    return 1;
                }
            }
        }
    }

    /// ECHILD path of `wait_foreground`: the bridge reaped `pid`. It stores
    /// the status before clearing the slot, so once the slot no longer holds
    /// `pid` the status read is the fresh one. The bridge is mid-publish
    /// when we get here, so the wait is a few scheduler ticks at most.
    fn take_foreground_status(&self, pid: i32) -> i32 {
        while self.foreground.load(Ordering::Acquire) == pid {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        self.fg_status.load(Ordering::Acquire)
    }

    /// Bridge-side completion of a foreground pid: publish the status first,
    /// then clear the slot, so an ECHILD waiter always reads the fresh value.
    fn publish_foreground_status(&self, pid: i32, code: i32) {
        self.fg_status.store(code, Ordering::Release);
        let _ = self
            .foreground
            .compare_exchange(pid, 0, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Drain every reapable child. Run by the bridge thread on each
    /// child-state-change notification; notifications coalesce, so stopping
    /// after one reap would leak zombies when several stages exit together.
    pub fn reap_children(&self) {
        let mut table = self.jobs();
        loop {
            let mut raw: libc::c_int = 0;
            let pid = unsafe { libc::waitpid(-1, &mut raw, libc::WNOHANG) };
            if pid <= 0 {
                break;
            }
            let Some(outcome) = classify_wait_status(raw) else {
                continue;
            };

            if self.foreground.load(Ordering::Acquire) == pid {
                // Foreground-only process: hand the status to the waiter and
                // leave the table alone.
                self.publish_foreground_status(pid, outcome.code());
                continue;
            }

            if let Some(index) = table.position_of(pid) {
                let command = table.get(index).map(|j| j.command.clone()).unwrap_or_default();
                match outcome {
                    WaitOutcome::Exited(code) => {
                        println!("[{index}]  Done ({code})  {command}");
                    }
                    WaitOutcome::Signaled(signal) => {
                        println!("[{index}]  Terminated ({})  {command}", signal_name(signal));
                    }
                }
                let _ = io::stdout().flush();
                table.remove(pid);
            }
            // Anything else is an unmonitored pipeline stage; collecting it
            // was the whole job.
        }
    }

    /// Record (or clear, fd = -1) an open redirection fd so the
    /// signal-shutdown path can close it.
    pub fn register_redirect_fd(&self, slot: usize, fd: i32) {
        self.redirect_fds[slot].store(fd, Ordering::Release);
    }

    /// Terminal-state cleanup: close redirection handles, terminate the
    /// foreground process and every tracked job, and release the table.
    /// Does not end the process itself.
    pub fn shutdown(&self) {
        for fd_slot in &self.redirect_fds {
            let fd = fd_slot.swap(-1, Ordering::AcqRel);
            if fd >= 0 {
                unsafe { libc::close(fd) };
            }
        }

        let fg = self.foreground.swap(0, Ordering::AcqRel);
        if fg > 0 {
            send_signal(fg, libc::SIGTERM);
        }

        let mut table = self.jobs();
        for pid in table.pids() {
            send_signal(pid, libc::SIGTERM);
        }
        table.clear();
    }
}

/// Best-effort `kill` with EINTR retry.
pub fn send_signal(pid: i32, signal: libc::c_int) {
    loop {
        let rc = unsafe { libc::kill(pid, signal) };
        if rc == 0 {
            return;
        }
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EINTR) {
            continue;
        }
        // ESRCH just means the process already finished.
        return;
    }
}
