//! Signal plumbing for the job-control bridge.
//!
//! SIGCHLD and the termination signals are blocked in every thread and
//! collected by a dedicated bridge thread via `sigwait`. The bridge runs
//! ordinary thread code (reaping, table updates, reporting) instead of an
//! async signal handler, so nothing allocation- or lock-shaped ever happens
//! in a true handler context. SIGINT stays with the `ctrlc` crate, which
//! delivers it to a handler thread of its own.

use std::io;
use std::mem::MaybeUninit;
use std::process::Command;
use std::sync::Arc;
use std::thread;

use crate::job_control::JobControl;
use crate::prompt;

/// Signals owned by the bridge thread.
const BRIDGE_SIGNALS: [libc::c_int; 4] =
    [libc::SIGCHLD, libc::SIGTERM, libc::SIGQUIT, libc::SIGHUP];

fn bridge_sigset() -> libc::sigset_t {
    unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigemptyset(set.as_mut_ptr());
        for signal in BRIDGE_SIGNALS {
            libc::sigaddset(set.as_mut_ptr(), signal);
        }
        set.assume_init()
    }
}

/// Block the bridge's signals in the calling thread. Must run on the main
/// thread before any other thread is spawned, so every thread inherits the
/// mask and only the bridge's `sigwait` can receive them.
pub fn block_bridge_signals() -> io::Result<()> {
    let set = bridge_sigset();
    let rc = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &set, std::ptr::null_mut()) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}

/// Spawn the bridge thread: child-state changes update the shared job state,
/// termination signals run shutdown cleanup and end the shell.
pub fn spawn_bridge(job_control: Arc<JobControl>) {
    thread::spawn(move || {
        let set = bridge_sigset();
        loop {
            let mut signal: libc::c_int = 0;
            if unsafe { libc::sigwait(&set, &mut signal) } != 0 {
                continue;
            }
            match signal {
                libc::SIGCHLD => job_control.reap_children(),
                signal => {
                    job_control.shutdown();
                    std::process::exit(128 + signal);
                }
            }
        }
    });
}

/// Install the user-interrupt handler: forward Ctrl-C to the foreground
/// process, or, with nothing in the foreground, absorb it and redraw the
/// prompt.
pub fn install_interrupt_handler(job_control: Arc<JobControl>) {
    ctrlc::set_handler(move || {
        if !job_control.interrupt_foreground() {
            println!();
            prompt::print_prompt();
        }
    })
    .expect("failed to set Ctrl-C handler");
}

/// Give a spawned child a clean signal slate: default dispositions for the
/// signals the shell repurposes, and an empty signal mask (children inherit
/// the shell's blocked set otherwise).
pub fn reset_signals_in_child(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        command.pre_exec(|| {
            unsafe {
                let mut empty = MaybeUninit::<libc::sigset_t>::uninit();
                libc::sigemptyset(empty.as_mut_ptr());
                libc::pthread_sigmask(libc::SIG_SETMASK, empty.as_ptr(), std::ptr::null_mut());
                libc::signal(libc::SIGINT, libc::SIG_DFL);
                libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            }
            Ok(())
        });
    }
}
