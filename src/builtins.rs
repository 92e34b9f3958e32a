use std::io::Write;

use crate::errors::ShellError;
use crate::job_control::JobControl;

/// The list of all builtin command names.
const BUILTINS: &[&str] = &["cd", "exit", "jobs", "fg", "umask"];

/// What the main loop should do after a builtin ran.
#[derive(Debug)]
pub enum BuiltinAction {
    Continue(i32),
    Exit(i32),
}

/// Returns true if the command name is a shell builtin.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Execute a builtin in the shell process, writing through the active
/// redirection streams. Returns the exit code, or the request to leave.
pub fn execute(
    program: &str,
    args: &[String],
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
    job_control: &JobControl,
) -> BuiltinAction {
    match program {
        "cd" => BuiltinAction::Continue(builtin_cd(args, stderr)),
        "exit" => builtin_exit(args, stderr),
        "jobs" => BuiltinAction::Continue(builtin_jobs(job_control, stdout)),
        "fg" => BuiltinAction::Continue(builtin_fg(args, job_control, stdout, stderr)),
        "umask" => BuiltinAction::Continue(builtin_umask(args, stdout, stderr)),
        _ => {
            let _ = writeln!(stderr, "msh: unknown builtin: {program}");
            BuiltinAction::Continue(1)
        }
    }
}

/// Change working directory; `$HOME` when no path is given. Failure is
/// reported and the shell carries on where it was.
fn builtin_cd(args: &[String], stderr: &mut dyn Write) -> i32 {
    let target = match args.first() {
        Some(dir) => dir.clone(),
        None => match std::env::var("HOME") {
            Ok(home) => home,
            Err(_) => {
                let _ = writeln!(stderr, "msh: cd: HOME not set");
                return 1;
            }
        },
    };

    if let Err(e) = std::env::set_current_dir(&target) {
        let _ = writeln!(stderr, "msh: cd: {target}: {e}");
        return 1;
    }
    0
}

fn builtin_exit(args: &[String], stderr: &mut dyn Write) -> BuiltinAction {
    match args.first() {
        None => BuiltinAction::Exit(0),
        Some(s) => match s.parse::<i32>() {
            Ok(code) => BuiltinAction::Exit(code),
            Err(_) => {
                let _ = writeln!(stderr, "msh: exit: {s}: numeric argument required");
                BuiltinAction::Exit(2)
            }
        },
    }
}

/// List the job table in index order.
fn builtin_jobs(job_control: &JobControl, stdout: &mut dyn Write) -> i32 {
    for (index, job) in job_control.jobs().iter() {
        let _ = writeln!(stdout, "[{index}]  {}  {}", job.pid, job.command);
    }
    0
}

/// Promote a background job (default index 0) to the foreground, wait for
/// it, and drop it from the table.
fn builtin_fg(
    args: &[String],
    job_control: &JobControl,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    let index: usize = match args.first() {
        Some(s) => match s.parse() {
            Ok(index) => index,
            Err(_) => {
                let _ = writeln!(stderr, "msh: fg: {s}: not a valid job index");
                return 1;
            }
        },
        None => 0,
    };

    // Promote under the table lock: the bridge cannot reap between the slot
    // claim and the removal, so the job is never double-handled.
    let (pid, command) = {
        let mut table = job_control.jobs();
        let (pid, command) = match table.get(index) {
            Ok(job) => (job.pid, job.command.clone()),
            Err(e) => {
                let _ = writeln!(stderr, "msh: {e}");
                return 1;
            }
        };
        job_control.set_foreground(pid);
        table.remove(pid);
        (pid, command)
    };

    let _ = writeln!(stdout, "{command}");
    let _ = stdout.flush();
    job_control.wait_foreground(pid)
}

/// Set or report the file-creation mask.
fn builtin_umask(args: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
    let symbolic = args.iter().any(|a| a == "-S" || a == "--symbolic");
    if symbolic {
        let _ = writeln!(stdout, "{}", symbolic_mask(current_mask()));
        return 0;
    }

    match args.first() {
        Some(arg) => match parse_mask(arg) {
            Ok(mask) => {
                unsafe { libc::umask(mask as libc::mode_t) };
                0
            }
            Err(e) => {
                let _ = writeln!(stderr, "msh: {e}");
                1
            }
        },
        None => {
            let _ = writeln!(stdout, "{:04o}", current_mask());
            0
        }
    }
}

fn current_mask() -> u32 {
    // umask can only be read by writing; set a scratch value and restore.
    let mask = unsafe { libc::umask(0o022) };
    unsafe { libc::umask(mask) };
    mask as u32
}

fn parse_mask(arg: &str) -> Result<u32, ShellError> {
    let bad = || ShellError::MaskConversion(arg.to_string());
    let mask = u32::from_str_radix(arg, 8).map_err(|_| bad())?;
    if mask > 0o777 {
        return Err(bad());
    }
    Ok(mask)
}

/// Render a mask as per-class permission letters: the letters present are
/// the read/write/execute bits the mask does NOT take away.
fn symbolic_mask(mask: u32) -> String {
    let class = |read: u32, write: u32, exec: u32| {
        let mut bits = String::new();
        if mask & read == 0 {
            bits.push('r');
        }
        if mask & write == 0 {
            bits.push('w');
        }
        if mask & exec == 0 {
            bits.push('x');
        }
        bits
    };
    format!(
        "u={},g={},o={}",
        class(0o400, 0o200, 0o100),
        class(0o040, 0o020, 0o010),
        class(0o004, 0o002, 0o001)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_are_recognized() {
        for name in ["cd", "exit", "jobs", "fg", "umask"] {
            assert!(is_builtin(name));
        }
        assert!(!is_builtin("ls"));
        assert!(!is_builtin(""));
    }

    #[test]
    fn symbolic_mask_for_022() {
        assert_eq!(symbolic_mask(0o022), "u=rwx,g=rx,o=rx");
    }

    #[test]
    fn symbolic_mask_for_077_hides_group_and_other() {
        assert_eq!(symbolic_mask(0o077), "u=rwx,g=,o=");
    }

    #[test]
    fn symbolic_mask_for_000_allows_everything() {
        assert_eq!(symbolic_mask(0o000), "u=rwx,g=rwx,o=rwx");
    }

    #[test]
    fn parse_mask_accepts_octal_strings() {
        assert_eq!(parse_mask("022").unwrap(), 0o022);
        assert_eq!(parse_mask("0").unwrap(), 0);
        assert_eq!(parse_mask("777").unwrap(), 0o777);
    }

    #[test]
    fn parse_mask_rejects_non_octal_input() {
        assert!(parse_mask("9z9").is_err());
        assert!(parse_mask("blah").is_err());
        assert!(parse_mask("1777").is_err());
        assert!(parse_mask("").is_err());
    }

    #[test]
    fn fg_on_an_empty_table_reports_no_such_job() {
        let jc = JobControl::new();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = builtin_fg(&[], &jc, &mut out, &mut err);
        assert_eq!(code, 1);
        assert!(String::from_utf8_lossy(&err).contains("no such job"));
        assert_eq!(jc.foreground_pid(), 0);
    }

    #[test]
    fn fg_with_a_bad_index_changes_nothing() {
        let jc = JobControl::new();
        jc.jobs().insert(i32::MAX - 2, "fake &".into()).unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = builtin_fg(&["7".into()], &jc, &mut out, &mut err);
        assert_eq!(code, 1);
        assert_eq!(jc.jobs().len(), 1);
    }

    #[test]
    fn cd_to_a_missing_directory_reports_and_stays_put() {
        let before = std::env::current_dir().unwrap();
        let mut err = Vec::new();
        let code = builtin_cd(&["/definitely/not/a/dir".into()], &mut err);
        assert_eq!(code, 1);
        assert!(String::from_utf8_lossy(&err).contains("/definitely/not/a/dir"));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }
}
