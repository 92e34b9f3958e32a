use std::io::Write;
use std::process::{Command, Stdio};

fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_msh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn msh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
        writeln!(stdin, "exit").expect("write exit");
    }

    child.wait_with_output().expect("wait output")
}

fn temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("msh_it_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn two_stage_pipeline_transforms_the_stream() {
    let output = run_shell(&["echo hi | tr h H"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hi"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}

#[test]
fn three_stage_pipeline_chains_in_order() {
    let output = run_shell(&["printf 'b\\na\\nc\\n' | sort | head -1"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("a\n"), "stdout was: {stdout}");
    assert!(!stdout.contains("b\n"), "stdout was: {stdout}");
}

#[test]
fn unknown_command_is_reported_and_shell_survives() {
    let output = run_shell(&["definitely-not-a-command-msh", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("command not found: definitely-not-a-command-msh"),
        "stderr was: {stderr}"
    );
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}

#[test]
fn unknown_stage_aborts_the_whole_pipeline() {
    let output = run_shell(&["echo visible | definitely-not-a-command-msh", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("command not found"), "stderr was: {stderr}");
    assert!(!stdout.contains("visible"), "stdout was: {stdout}");
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}

#[test]
fn builtin_in_pipeline_is_rejected_before_spawning() {
    let output = run_shell(&["echo leaked | cd /", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("pipeline"), "stderr was: {stderr}");
    assert!(!stdout.contains("leaked"), "stdout was: {stdout}");
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}

#[test]
fn output_redirection_writes_the_file() {
    let path = temp_dir().join("redirected_out.txt");
    let line = format!("echo hello > {}", path.display());
    let output = run_shell(&[line.as_str()]);
    assert!(output.status.success());

    let contents = std::fs::read_to_string(&path).expect("read redirected output");
    assert_eq!(contents, "hello\n");
    let _ = std::fs::remove_file(path);
}

#[test]
fn input_redirection_feeds_the_first_stage() {
    let path = temp_dir().join("redirected_in.txt");
    std::fs::write(&path, "hi\n").unwrap();

    let line = format!("tr h H < {}", path.display());
    let output = run_shell(&[line.as_str()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hi"), "stdout was: {stdout}");
    let _ = std::fs::remove_file(path);
}

#[test]
fn error_redirection_captures_the_last_stage_stderr() {
    let path = temp_dir().join("redirected_err.txt");
    let line = format!("sh -c 'echo oops 1>&2' 2> {}", path.display());
    let output = run_shell(&[line.as_str()]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("oops"), "stderr was: {stderr}");

    let contents = std::fs::read_to_string(&path).expect("read redirected stderr");
    assert!(contents.contains("oops"), "file was: {contents}");
    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_input_file_aborts_the_line() {
    let output = run_shell(&["wc -l < /definitely/not/a/file", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/definitely/not/a/file"), "stderr was: {stderr}");
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
}

#[test]
fn pipeline_stages_see_only_the_standard_descriptors() {
    // Every stage must start with just stdin/stdout/stderr; pipe ends wired
    // to other stages (and the shell's own file handles) stay out of its fd
    // table. The last stage lists its own descriptors into a file so the
    // listing is not interleaved with prompt output.
    let path = temp_dir().join("fd_listing.txt");
    let line = format!("echo x | cat | ls /proc/self/fd > {}", path.display());
    let output = run_shell(&[line.as_str()]);
    assert!(output.status.success(), "shell did not exit cleanly");

    let listing = std::fs::read_to_string(&path).expect("read fd listing");
    assert!(!listing.trim().is_empty(), "empty fd listing");
    for entry in listing.split_whitespace() {
        let fd: u32 = entry.parse().expect("fd entries are numeric");
        // 0..=2 plus the descriptor ls holds on the directory itself.
        assert!(
            fd <= 3,
            "descriptor {fd} leaked into a pipeline stage; listing: {listing}"
        );
    }
    let _ = std::fs::remove_file(path);
}

#[test]
fn quoted_arguments_keep_their_spacing() {
    let output = run_shell(&[r#"echo "hello   world""#]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello   world"), "stdout was: {stdout}");
}

#[test]
fn pipeline_sigpipe_does_not_abort_shell() {
    // yes writes until head closes the read end; the shell must survive the
    // event and keep processing lines.
    let output = run_shell(&["yes | head -1", "echo ALIVE"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ALIVE"), "stdout was: {stdout}");
    assert!(output.status.success(), "shell did not exit cleanly");
}
