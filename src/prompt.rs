use std::env;
use std::io::{self, Write};

use crossterm::style::Stylize;

/// Print the `user@host:cwd msh> ` prompt and flush it out.
pub fn print_prompt() {
    let user = env::var("USER").unwrap_or_else(|_| "?".into());
    let host = hostname().unwrap_or_else(|| "?".into());
    let cwd = env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "?".into());
    let cwd = match env::var("HOME") {
        Ok(home) => collapse_home(&cwd, &home),
        Err(_) => cwd,
    };

    print!(
        "{}:{} msh> ",
        format!("{user}@{host}").green().bold(),
        cwd.blue().bold()
    );
    let _ = io::stdout().flush();
}

pub fn print_banner() {
    println!("{}", "Welcome to msh.".green().bold());
}

fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Some(String::from_utf8_lossy(&buf[..len]).into_owned())
}

/// Replace a leading `$HOME` with `~`, the way bash's prompt does.
fn collapse_home(path: &str, home: &str) -> String {
    if home.len() > 1 {
        if let Some(rest) = path.strip_prefix(home) {
            if rest.is_empty() || rest.starts_with('/') {
                return format!("~{rest}");
            }
        }
    }
    path.to_string()
}
