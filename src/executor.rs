use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::ast::Line;
use crate::builtins::{self, BuiltinAction};
use crate::errors::ShellError;
use crate::job_control::JobControl;
use crate::redirect::RedirectionScope;
use crate::signals;

/// What the main loop should do after a line ran.
pub enum LineOutcome {
    Continue(i32),
    Exit(i32),
}

/// Run one parsed line: validate, redirect, route, and either wait for the
/// foreground pid or register a background job. The caller releases the
/// redirection scope afterwards on every path.
pub fn run_line(
    line: &Line,
    scope: &mut RedirectionScope,
    job_control: &JobControl,
) -> LineOutcome {
    // Validating: every command must resolve to a builtin or a locatable
    // executable before anything is touched.
    for command in &line.commands {
        if !builtins::is_builtin(&command.program) && find_in_path(&command.program).is_none() {
            report(scope, &ShellError::CommandNotFound(command.program.clone()));
            return LineOutcome::Continue(127);
        }
    }

    // Redirecting: open the line's streams, or abort without executing.
    if let Err(e) = scope.apply(line, job_control) {
        report(scope, &e);
        return LineOutcome::Continue(1);
    }

    // Routing: builtins never run as a pipeline stage.
    if line.commands.len() > 1 {
        if let Some(command) = line
            .commands
            .iter()
            .find(|c| builtins::is_builtin(&c.program))
        {
            report(scope, &ShellError::BuiltinInPipeline(command.program.clone()));
            return LineOutcome::Continue(1);
        }
    } else if builtins::is_builtin(&line.commands[0].program) {
        return run_builtin(line, scope, job_control);
    }

    match run_pipeline(line, scope, job_control) {
        Ok(code) => LineOutcome::Continue(code),
        Err(e) => {
            report(scope, &e);
            LineOutcome::Continue(1)
        }
    }
}

/// Single builtin command, run in-process through the redirection scope.
fn run_builtin(
    line: &Line,
    scope: &mut RedirectionScope,
    job_control: &JobControl,
) -> LineOutcome {
    let command = &line.commands[0];
    let (out_file, err_file) = scope.write_handles();
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let out: &mut dyn Write = match out_file {
        Some(f) => f,
        None => &mut stdout,
    };
    let err: &mut dyn Write = match err_file {
        Some(f) => f,
        None => &mut stderr,
    };

    match builtins::execute(&command.program, &command.args, out, err, job_control) {
        BuiltinAction::Continue(code) => LineOutcome::Continue(code),
        BuiltinAction::Exit(code) => LineOutcome::Exit(code),
    }
}

/// Spawn the line's commands as an N-stage pipeline (N >= 1), wiring stage
/// stdio to pipes and the redirection scope per position.
fn run_pipeline(
    line: &Line,
    scope: &RedirectionScope,
    job_control: &JobControl,
) -> Result<i32, ShellError> {
    let n = line.commands.len();

    // All inter-stage pipes up front: a partially piped chain never runs.
    let mut pipes = Vec::with_capacity(n - 1);
    for _ in 1..n {
        pipes.push(os_pipe::pipe().map_err(ShellError::Pipe)?);
    }

    // Hold the table lock across spawn and registration so the bridge can
    // never observe a pid it has no entry or foreground slot for.
    let mut table = job_control.jobs();
    if line.background && table.is_full() {
        return Err(ShellError::CapacityExceeded(crate::jobs::MAX_JOBS));
    }

    let mut pipes = pipes.into_iter();
    let mut prev_reader = None;
    let mut last_pid = 0;

    for (i, stage) in line.commands.iter().enumerate() {
        let last = i == n - 1;
        let mut command = Command::new(&stage.program);
        command.args(&stage.args);

        match prev_reader.take() {
            Some(reader) => {
                command.stdin(Stdio::from(reader));
            }
            None => {
                command.stdin(scope.input_stdio().map_err(|source| ShellError::Spawn {
                    command: stage.program.clone(),
                    source,
                })?);
            }
        }

        if last {
            command.stdout(scope.output_stdio().map_err(|source| ShellError::Spawn {
                command: stage.program.clone(),
                source,
            })?);
            // Intermediate stages never redirect stderr.
            command.stderr(scope.error_stdio().map_err(|source| ShellError::Spawn {
                command: stage.program.clone(),
                source,
            })?);
        } else {
            let (reader, writer) = pipes.next().expect("one pipe per inner stage");
            prev_reader = Some(reader);
            command.stdout(Stdio::from(writer));
        }

        signals::reset_signals_in_child(&mut command);

        match command.spawn() {
            // The parent's copies of this stage's pipe ends are dropped with
            // `command` at the end of the iteration, so downstream readers
            // see EOF as soon as the writers finish.
            Ok(child) => last_pid = child.id() as i32,
            Err(e) => {
                // Abort the remaining stages; already-spawned ones run to
                // completion and are collected by the bridge.
                let code = if e.kind() == ErrorKind::NotFound { 127 } else { 126 };
                drop(table);
                report_spawn_failure(scope, &stage.program, &e);
                return Ok(code);
            }
        }
    }

    if line.background {
        // Only the terminal stage becomes a named job; intermediates are the
        // bridge's to collect.
        let index = table.insert(last_pid, line.display.clone())?;
        println!("[{index}] {last_pid}");
        let _ = io::stdout().flush();
        return Ok(0);
    }

    // Pipeline completion is the terminal consumer finishing: claim the
    // foreground slot for the last stage and wait for that pid alone.
    job_control.set_foreground(last_pid);
    drop(table);
    Ok(job_control.wait_foreground(last_pid))
}

fn report(scope: &mut RedirectionScope, error: &ShellError) {
    let (_, err_file) = scope.write_handles();
    match err_file {
        Some(f) => {
            let _ = writeln!(f, "msh: {error}");
        }
        None => eprintln!("msh: {error}"),
    }
}

/// The message the child would have printed had exec failed there: the
/// command name plus the OS error, on the line's error stream.
fn report_spawn_failure(scope: &RedirectionScope, program: &str, error: &io::Error) {
    let message = if error.kind() == ErrorKind::NotFound {
        format!("msh: command not found: {program}")
    } else {
        format!("msh: {program}: {error}")
    };
    match scope.error_ref() {
        Some(mut f) => {
            let _ = writeln!(f, "{message}");
        }
        None => eprintln!("{message}"),
    }
}

/// Check if a path points to an executable file.
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    let Ok(meta) = path.metadata() else {
        return false;
    };
    meta.is_file() && meta.permissions().mode() & 0o111 != 0
}

/// Resolve a command name the way exec would: names with a slash are taken
/// as paths, everything else is searched for on PATH.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }

    let path_var = std::env::var("PATH").ok()?;
    for dir in path_var.split(':') {
        let full_path = Path::new(dir).join(name);
        if is_executable(&full_path) {
            return Some(full_path);
        }
    }
    None
}
