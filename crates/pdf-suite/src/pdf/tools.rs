//! Invocation of external command-line tools (poppler, tesseract, qpdf,
//! LibreOffice).

use std::ffi::OsStr;
use std::io::{Read, Seek, SeekFrom};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use crate::error::ProcessError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs `program` to completion and returns its raw output. Only a failure
/// to start the process is an error.
pub fn output<I, S>(program: &str, args: I) -> Result<Output, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    tracing::debug!(tool = program, "running external tool");
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ProcessError::ToolUnavailable {
            tool: program.to_string(),
            source: e,
        })
}

/// Runs `program` and fails with its stderr when it exits unsuccessfully.
pub fn run<I, S>(program: &str, args: I) -> Result<Output, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = output(program, args)?;
    if !output.status.success() {
        return Err(ProcessError::ToolFailed {
            tool: program.to_string(),
            message: failure_message(&output.stderr, output.status.code()),
        });
    }
    Ok(output)
}

/// Runs `program` with a wall-clock bound. The process is killed once the
/// bound is exceeded. Stdout is discarded.
pub fn run_with_timeout<I, S>(program: &str, args: I, timeout: Duration) -> Result<(), ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let spawn_error = |e: std::io::Error| ProcessError::ToolFailed {
        tool: program.to_string(),
        message: e.to_string(),
    };

    // Stderr goes to an anonymous file so a chatty child can never block on
    // a full pipe while we poll.
    let mut stderr_file = tempfile::tempfile().map_err(spawn_error)?;
    let stderr_handle = stderr_file.try_clone().map_err(spawn_error)?;

    tracing::debug!(tool = program, timeout_secs = timeout.as_secs(), "running external tool");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_handle))
        .spawn()
        .map_err(|e| ProcessError::ToolUnavailable {
            tool: program.to_string(),
            source: e,
        })?;

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait().map_err(spawn_error)? {
            break status;
        }
        if started.elapsed() >= timeout {
            if let Err(e) = child.kill() {
                tracing::warn!(tool = program, error = %e, "failed to kill timed out process");
            }
            let _ = child.wait();
            return Err(ProcessError::ConversionTimeout {
                seconds: timeout.as_secs(),
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    if !status.success() {
        let mut stderr = Vec::new();
        stderr_file
            .seek(SeekFrom::Start(0))
            .and_then(|_| stderr_file.read_to_end(&mut stderr))
            .map_err(spawn_error)?;
        return Err(ProcessError::ToolFailed {
            tool: program.to_string(),
            message: failure_message(&stderr, status.code()),
        });
    }
    Ok(())
}

pub(crate) fn failure_message(stderr: &[u8], code: Option<i32>) -> String {
    let text = String::from_utf8_lossy(stderr).trim().to_string();
    if !text.is_empty() {
        return text;
    }
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSING_TOOL: &str = "pdf-suite-test-no-such-tool";

    #[test]
    fn test_missing_tool_is_unavailable() {
        let result = run(MISSING_TOOL, ["--version"]);
        match result {
            Err(ProcessError::ToolUnavailable { tool, .. }) => assert_eq!(tool, MISSING_TOOL),
            other => panic!("expected ToolUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_failure_message_prefers_stderr() {
        assert_eq!(failure_message(b"  bad input\n", Some(2)), "bad input");
        assert_eq!(failure_message(b"", Some(2)), "exited with status 2");
        assert_eq!(failure_message(b"", None), "terminated by signal");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_reports_stderr() {
        let result = run("sh", ["-c", "echo boom >&2; exit 2"]);
        match result {
            Err(ProcessError::ToolFailed { tool, message }) => {
                assert_eq!(tool, "sh");
                assert_eq!(message, "boom");
            }
            other => panic!("expected ToolFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let result = run_with_timeout("sleep", ["5"], Duration::from_millis(200));
        assert!(matches!(result, Err(ProcessError::ConversionTimeout { seconds: 0 })));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_run_reports_failure() {
        let result = run_with_timeout(
            "sh",
            ["-c", "echo conversion broke >&2; exit 1"],
            Duration::from_secs(5),
        );
        match result {
            Err(ProcessError::ToolFailed { message, .. }) => {
                assert_eq!(message, "conversion broke")
            }
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_run_succeeds() {
        assert!(run_with_timeout("true", Vec::<&str>::new(), Duration::from_secs(5)).is_ok());
    }
}
