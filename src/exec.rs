// SPDX-License-Identifier: GPL-3.0-only
//! External ddcutil invocation
//!
//! All DDC/CI traffic goes through the ddcutil binary; this module owns
//! spawning it, bounding each call with a timeout, and capturing its output.
//! Exit-code interpretation is left to the caller.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ExecError;

/// How often a running child is checked against its deadline
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Timeout for the startup availability probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Captured result of one external command invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` when the child was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the monitor controller and the external tool
pub trait CommandRunner {
    /// Run the tool with `args`, waiting up to `timeout`.
    ///
    /// A completed child is returned regardless of its exit code; only
    /// spawn/IO failures and timeouts are errors. No retry is performed.
    fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput, ExecError>;
}

/// Runs the real ddcutil binary
pub struct DdcutilRunner {
    program: String,
}

impl DdcutilRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Log whether the tool can be executed at all, once at startup
    pub fn probe(&self) {
        match self.run(&["--version".to_string()], PROBE_TIMEOUT) {
            Ok(output) if output.success() => {
                let version = output.stdout.lines().next().unwrap_or("").trim().to_string();
                info!("{} available: {version}", self.program);
            }
            Ok(output) => {
                warn!(
                    "{} responded with exit code {:?}: {}",
                    self.program,
                    output.code,
                    output.stderr.trim()
                );
            }
            Err(err) => warn!("{err}"),
        }
    }
}

impl Default for DdcutilRunner {
    fn default() -> Self {
        Self::new("ddcutil")
    }
}

impl CommandRunner for DdcutilRunner {
    fn run(&self, args: &[String], timeout: Duration) -> Result<CommandOutput, ExecError> {
        let command = display_line(&self.program, args);
        debug!("executing: {command}");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Execution {
                command: command.clone(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let stdout = read_stream(child.stdout.take(), &command)?;
                    let stderr = read_stream(child.stderr.take(), &command)?;
                    return Ok(CommandOutput {
                        code: status.code(),
                        stdout,
                        stderr,
                    });
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        // Kill and reap; no partial result is returned.
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ExecError::Timeout { command, timeout });
                    }
                    thread::sleep(WAIT_POLL_INTERVAL);
                }
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExecError::Execution { command, source });
                }
            }
        }
    }
}

fn read_stream(stream: Option<impl Read>, command: &str) -> Result<String, ExecError> {
    let mut text = String::new();
    if let Some(mut stream) = stream {
        stream
            .read_to_string(&mut text)
            .map_err(|source| ExecError::Execution {
                command: command.to_string(),
                source,
            })?;
    }
    Ok(text)
}

fn display_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}


#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_captures_streams_and_exit_code() {
        let runner = DdcutilRunner::new("sh");
        let output = runner
            .run(
                &args(&["-c", "printf out; printf err >&2; exit 3"]),
                Duration::from_secs(5),
            )
            .unwrap();

        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout, "out");
        assert_eq!(output.stderr, "err");
    }

    #[test]
    fn test_zero_exit_is_success() {
        let runner = DdcutilRunner::new("true");
        let output = runner.run(&[], Duration::from_secs(5)).unwrap();
        assert!(output.success());
    }

    #[test]
    fn test_missing_binary_is_execution_error() {
        let runner = DdcutilRunner::new("/nonexistent/padswitch-test-binary");
        let err = runner.run(&[], Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ExecError::Execution { .. }));
    }

    #[test]
    fn test_slow_child_times_out() {
        let runner = DdcutilRunner::new("sleep");
        let started = Instant::now();
        let err = runner
            .run(&args(&["5"]), Duration::from_millis(100))
            .unwrap_err();

        assert!(matches!(err, ExecError::Timeout { .. }));
        // The child must have been killed, not waited out.
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
