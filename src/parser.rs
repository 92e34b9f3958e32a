use crate::ast::{Command, Line};
use crate::errors::ShellError;

/// A single word of input. `quoted` records whether any part of the word was
/// quoted or escaped: a quoted `"|"` is an argument, never an operator.
#[derive(Debug, Clone, PartialEq)]
struct Token {
    text: String,
    quoted: bool,
}

impl Token {
    fn is_operator(&self, op: &str) -> bool {
        !self.quoted && self.text == op
    }
}

/// States for the tokenizer state machine.
enum State {
    /// Between tokens; whitespace is skipped
    Normal,
    /// Building an unquoted word; whitespace ends it
    InWord,
    /// Inside double quotes; whitespace is preserved
    InDoubleQuote,
    /// Inside single quotes; everything is literal
    InSingleQuote,
}

/// Split input into words, honoring single quotes, double quotes, and
/// backslash escapes. Unclosed quotes are tolerated (the rest of the line
/// becomes part of the word).
fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut current = String::new();
    let mut current_quoted = false;
    let mut state = State::Normal;
    let mut chars = input.chars();

    let flush = |tokens: &mut Vec<Token>, current: &mut String, quoted: &mut bool| {
        if !current.is_empty() || *quoted {
            tokens.push(Token {
                text: std::mem::take(current),
                quoted: std::mem::take(quoted),
            });
        }
    };

    while let Some(ch) = chars.next() {
        match (&state, ch) {
            (State::Normal, ' ' | '\t') => {}
            (State::Normal | State::InWord, '"') => {
                current_quoted = true;
                state = State::InDoubleQuote;
            }
            (State::Normal | State::InWord, '\'') => {
                current_quoted = true;
                state = State::InSingleQuote;
            }
            (State::Normal | State::InWord, '\\') => {
                // Escaped char is literal, including whitespace and operators.
                current_quoted = true;
                match chars.next() {
                    Some(next) => current.push(next),
                    None => current.push('\\'),
                }
                state = State::InWord;
            }
            (State::InWord, ' ' | '\t') => {
                flush(&mut tokens, &mut current, &mut current_quoted);
                state = State::Normal;
            }
            (State::Normal | State::InWord, c) => {
                current.push(c);
                state = State::InWord;
            }
            (State::InDoubleQuote, '"') | (State::InSingleQuote, '\'') => {
                state = State::InWord;
            }
            (State::InDoubleQuote, '\\') => match chars.next() {
                Some(next @ ('"' | '\\')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            (State::InDoubleQuote | State::InSingleQuote, c) => current.push(c),
        }
    }
    flush(&mut tokens, &mut current, &mut current_quoted);

    tokens
}

/// Parse one raw input line into a [`Line`]. Returns `Ok(None)` for blank
/// input. Operator tokens (`|`, `<`, `>`, `2>`, `&`) are recognized only
/// when unquoted.
pub fn parse_line(input: &str) -> Result<Option<Line>, ShellError> {
    let trimmed = input.trim();
    let mut tokens = tokenize(trimmed);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut line = Line::new(trimmed);

    // A trailing `&` backgrounds the whole line; anywhere else it is an error.
    if tokens.last().is_some_and(|t| t.is_operator("&")) {
        line.background = true;
        tokens.pop();
        if tokens.is_empty() {
            return Err(ShellError::Syntax("nothing before '&'".into()));
        }
    }
    if tokens.iter().any(|t| t.is_operator("&")) {
        return Err(ShellError::Syntax("'&' is only allowed at the end of a line".into()));
    }

    let mut words: Vec<String> = Vec::new();
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        if token.is_operator("|") {
            push_command(&mut line, &mut words)?;
        } else if token.is_operator("<") || token.is_operator(">") || token.is_operator("2>") {
            let op = token.text.clone();
            let path = match iter.next() {
                Some(t) => t.text,
                None => {
                    return Err(ShellError::Syntax(format!("expected filename after '{op}'")));
                }
            };
            match op.as_str() {
                "<" => line.redirect_input = Some(path),
                ">" => line.redirect_output = Some(path),
                _ => line.redirect_error = Some(path),
            }
        } else {
            words.push(token.text);
        }
    }
    push_command(&mut line, &mut words)?;

    Ok(Some(line))
}

fn push_command(line: &mut Line, words: &mut Vec<String>) -> Result<(), ShellError> {
    if words.is_empty() {
        return Err(ShellError::Syntax("empty command in pipeline".into()));
    }
    let mut drained = std::mem::take(words).into_iter();
    line.commands.push(Command {
        program: drained.next().unwrap_or_default(),
        args: drained.collect(),
    });
    Ok(())
}
