use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::process::Stdio;

use crate::ast::Line;
use crate::errors::ShellError;
use crate::job_control::JobControl;

/// The three redirectable streams, in fd-mirror slot order.
const INPUT: usize = 0;
const OUTPUT: usize = 1;
const ERROR: usize = 2;

/// Open stream handles for one line's execution.
///
/// A slot that is `None` means "use the process default". A slot that is
/// `Some` was opened by [`RedirectionScope::apply`] and is closed exactly
/// once by [`RedirectionScope::release`], which must run on every exit path
/// before the next line is processed. Builtins write through these handles
/// too; redirection applies to them the same as to external commands.
#[derive(Default)]
pub struct RedirectionScope {
    input: Option<File>,
    output: Option<File>,
    error: Option<File>,
}

impl RedirectionScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every redirect target named on the line. Input must pre-exist;
    /// output and error are created or truncated. On failure the offending
    /// path and OS error are returned and already-opened handles stay in
    /// place so `release` can close them.
    pub fn apply(&mut self, line: &Line, job_control: &JobControl) -> Result<(), ShellError> {
        if let Some(path) = &line.redirect_input {
            let file = File::open(path).map_err(|source| ShellError::Redirection {
                path: path.clone(),
                source,
            })?;
            job_control.register_redirect_fd(INPUT, file.as_raw_fd());
            self.input = Some(file);
        }
        if let Some(path) = &line.redirect_output {
            let file = File::create(path).map_err(|source| ShellError::Redirection {
                path: path.clone(),
                source,
            })?;
            job_control.register_redirect_fd(OUTPUT, file.as_raw_fd());
            self.output = Some(file);
        }
        if let Some(path) = &line.redirect_error {
            let file = File::create(path).map_err(|source| ShellError::Redirection {
                path: path.clone(),
                source,
            })?;
            job_control.register_redirect_fd(ERROR, file.as_raw_fd());
            self.error = Some(file);
        }
        Ok(())
    }

    /// Close any handle that is not a process default and reset all slots.
    pub fn release(&mut self, job_control: &JobControl) {
        for slot in [INPUT, OUTPUT, ERROR] {
            job_control.register_redirect_fd(slot, -1);
        }
        self.input.take();
        self.output.take();
        self.error.take();
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Stdin for the first pipeline stage.
    pub fn input_stdio(&self) -> io::Result<Stdio> {
        stdio_for(&self.input)
    }

    /// Stdout for the last pipeline stage.
    pub fn output_stdio(&self) -> io::Result<Stdio> {
        stdio_for(&self.output)
    }

    /// Stderr for the last pipeline stage.
    pub fn error_stdio(&self) -> io::Result<Stdio> {
        stdio_for(&self.error)
    }

    /// Split borrows of the output and error handles, for routing builtin
    /// output through the scope.
    pub fn write_handles(&mut self) -> (Option<&mut File>, Option<&mut File>) {
        (self.output.as_mut(), self.error.as_mut())
    }

    /// Shared borrow of the error handle (`&File` is `Write`).
    pub fn error_ref(&self) -> Option<&File> {
        self.error.as_ref()
    }
}

fn stdio_for(slot: &Option<File>) -> io::Result<Stdio> {
    match slot {
        // The scope keeps ownership for `release`; the child gets a dup.
        Some(file) => Ok(file.try_clone()?.into()),
        None => Ok(Stdio::inherit()),
    }
}
