/// Command Runner - External Process Execution
///
/// **Core Responsibility:**
/// Run one argv inside a repository directory and capture its raw output.
///
/// **Boundary:**
/// - Knows HOW to run a command (spawn, capture, hard timeout)
/// - Does NOT know test cases, rubrics or comparison rules
/// - A non-zero exit status is not a failure; the output is still judged
///
/// The timeout is enforced with `tokio::time::timeout`. The child is spawned
/// with `kill_on_drop`, so abandoning the wait kills it.
use grade_common::error::ExecutionFailure;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Raw output of one command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

/// Run `argv` in `working_directory`, capturing stdout and stderr
pub async fn execute(
    argv: &[String],
    working_directory: &Path,
    timeout: Duration,
) -> Result<CommandOutput, ExecutionFailure> {
    let (program, args) = argv.split_first().ok_or(ExecutionFailure::EmptyCommand)?;

    let child = Command::new(program)
        .args(args)
        .current_dir(working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecutionFailure::Spawn {
            program: program.clone(),
            source,
        })?;

    let start_time = Instant::now();

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let exit_code = output.status.code();
            debug!(
                program = %program,
                exit_code = ?exit_code,
                execution_ms = start_time.elapsed().as_millis() as u64,
                "Command finished"
            );
            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code,
            })
        }
        Ok(Err(source)) => Err(ExecutionFailure::Wait {
            program: program.clone(),
            source,
        }),
        Err(_) => {
            // Dropping the wait future kills the child
            warn!(
                program = %program,
                timeout_ms = timeout.as_millis() as u64,
                "Command timed out"
            );
            Err(ExecutionFailure::Timeout(timeout))
        }
    }
}

/// Run `argv`, then return the contents of `file_path`
///
/// `file_path` is relative to `working_directory`. A file that was never
/// created reads as the empty string, the same as a file left empty.
pub async fn execute_capturing_file(
    argv: &[String],
    working_directory: &Path,
    timeout: Duration,
    file_path: &Path,
) -> Result<String, ExecutionFailure> {
    execute(argv, working_directory, timeout).await?;

    let path = working_directory.join(file_path);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "Capture file not created");
            Ok(String::new())
        }
        Err(source) => Err(ExecutionFailure::Capture { path, source }),
    }
}

/// Run a version-control or build tool and capture what it printed
///
/// Not time limited. Tool chatter never reaches stdout, which is reserved
/// for report lines; it is logged instead.
pub async fn run_tool(program: &str, args: &[&str]) -> Result<CommandOutput, ExecutionFailure> {
    debug!(program, args = ?args, "Running");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|source| ExecutionFailure::Spawn {
            program: program.to_string(),
            source,
        })?;

    let result = CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    };
    if output.status.success() {
        debug!(program, stdout = %result.stdout.trim_end(), stderr = %result.stderr.trim_end(), "Tool finished");
    } else {
        warn!(program, exit_code = ?result.exit_code, stderr = %result.stderr.trim_end(), "Tool failed");
    }
    Ok(result)
}

/// Exit status of [`run_tool`]; a signal death reads as -1
pub async fn run_status(program: &str, args: &[&str]) -> Result<i32, ExecutionFailure> {
    Ok(run_tool(program, args).await?.exit_code.unwrap_or(-1))
}
