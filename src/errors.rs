use std::fmt;
use std::io;

/// Everything that can go wrong while turning a parsed line into processes.
///
/// All variants are recovered at the dispatcher boundary and surfaced as a
/// single `msh: ...` diagnostic; none of them terminate the shell.
#[derive(Debug)]
pub enum ShellError {
    /// A command name resolved to neither a builtin nor a PATH executable.
    CommandNotFound(String),
    /// A builtin appeared as a stage of a multi-command pipeline.
    BuiltinInPipeline(String),
    /// A redirection path could not be opened.
    Redirection { path: String, source: io::Error },
    /// Creating an inter-process pipe failed; the whole line is abandoned.
    Pipe(io::Error),
    /// Spawning a pipeline stage failed (fork/exec error).
    Spawn { command: String, source: io::Error },
    /// The background job table is full.
    CapacityExceeded(usize),
    /// `fg` referenced a job index with no live job behind it.
    NoSuchJob(usize),
    /// `umask` was given a mask that is not a valid octal string.
    MaskConversion(String),
    /// The line itself was malformed (parser-level).
    Syntax(String),
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::CommandNotFound(name) => {
                write!(f, "command not found: {name}")
            }
            ShellError::BuiltinInPipeline(name) => {
                write!(f, "{name}: builtins cannot be used in a pipeline")
            }
            ShellError::Redirection { path, source } => {
                write!(f, "{path}: {source}")
            }
            ShellError::Pipe(source) => write!(f, "pipe creation failed: {source}"),
            ShellError::Spawn { command, source } => write!(f, "{command}: {source}"),
            ShellError::CapacityExceeded(max) => {
                write!(f, "cannot run more than {max} background jobs")
            }
            ShellError::NoSuchJob(index) => write!(f, "fg: {index}: no such job"),
            ShellError::MaskConversion(arg) => {
                write!(f, "umask: {arg}: invalid octal mask")
            }
            ShellError::Syntax(msg) => write!(f, "syntax error: {msg}"),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShellError::Redirection { source, .. }
            | ShellError::Pipe(source)
            | ShellError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}
