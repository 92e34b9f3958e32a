/// One executable name plus its ordered argument list.
/// Immutable once parsed; owned by the [`Line`] for its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub program: String,
    pub args: Vec<String>,
}

/// One user-entered command line: an ordered sequence of commands joined by
/// pipes, optional whole-line redirections, and a background flag.
///
/// Redirection paths are meaningful only at the ends of a multi-command
/// line: `redirect_input` feeds the first command, `redirect_output` and
/// `redirect_error` come from the last. Mid-pipeline commands always
/// read/write pipes.
#[derive(Debug, Clone)]
pub struct Line {
    pub commands: Vec<Command>,
    pub redirect_input: Option<String>,
    pub redirect_output: Option<String>,
    pub redirect_error: Option<String>,
    pub background: bool,
    /// Snapshot of the raw input, used as the job display text.
    pub display: String,
}

impl Line {
    pub fn new(display: &str) -> Self {
        Self {
            commands: Vec::new(),
            redirect_input: None,
            redirect_output: None,
            redirect_error: None,
            background: false,
            display: display.to_string(),
        }
    }
}
