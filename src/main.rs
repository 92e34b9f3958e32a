mod ast;
mod builtins;
mod errors;
mod executor;
mod job_control;
mod jobs;
mod parser;
mod prompt;
mod redirect;
mod signals;

use std::io;
use std::sync::Arc;

use executor::LineOutcome;
use job_control::JobControl;
use redirect::RedirectionScope;

fn main() {
    let job_control = Arc::new(JobControl::new());

    // Mask first, threads after: the bridge thread must be the only place
    // SIGCHLD and the termination signals can be delivered.
    signals::block_bridge_signals().expect("failed to set signal mask");
    signals::spawn_bridge(job_control.clone());
    signals::install_interrupt_handler(job_control.clone());

    prompt::print_banner();

    let stdin = io::stdin();
    let mut scope = RedirectionScope::new();
    let mut last_exit_code: i32 = 0;

    loop {
        prompt::print_prompt();

        let mut input = String::new();
        match stdin.read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {}
            Err(error) => {
                eprintln!("msh: error reading input: {error}");
                break;
            }
        }

        let line = match parser::parse_line(&input) {
            Ok(Some(line)) => line,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("msh: {e}");
                last_exit_code = 2;
                continue;
            }
        };

        let outcome = executor::run_line(&line, &mut scope, &job_control);
        // Every exit path tears the scope down before the next line.
        scope.release(&job_control);

        match outcome {
            LineOutcome::Continue(code) => last_exit_code = code,
            LineOutcome::Exit(code) => {
                last_exit_code = code;
                break;
            }
        }
    }

    job_control.shutdown();
    std::process::exit(last_exit_code);
}
