//! Running external tools with captured output and a bounded wait.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use super::TrustError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Minimum time left for reading output after the tool exits.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// An external command. `privileged` commands are run through `sudo` when the
/// process is not already root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub privileged: bool,
}

impl ToolCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Program name without its directory, for messages.
    pub fn tool_name(&self) -> String {
        PathBuf::from(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.clone())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !out.is_empty() && !out.ends_with('\n') && !self.stderr.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.stderr);
        out
    }

    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.combined().to_ascii_lowercase().contains(&needle)
    }

    pub(super) fn into_failure(self, command: &ToolCommand) -> TrustError {
        TrustError::ToolFailed {
            tool: command.tool_name(),
            status: self.status,
            output: self.combined(),
        }
    }
}

/// Seam between trust targets and the operating system.
pub trait CommandRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, TrustError>;

    /// Locate `program` on `PATH`.
    fn find_program(&self, program: &str) -> Option<PathBuf>;
}

/// Runs commands as child processes of this one.
pub struct SystemRunner {
    timeout: Duration,
    escalate: bool,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            escalate: needs_sudo(),
        }
    }

    fn command_line(&self, command: &ToolCommand) -> (String, Vec<String>) {
        if command.privileged && self.escalate {
            let mut args = Vec::with_capacity(command.args.len() + 1);
            args.push(command.program.clone());
            args.extend(command.args.iter().cloned());
            ("sudo".to_string(), args)
        } else {
            (command.program.clone(), command.args.clone())
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, TrustError> {
        let (program, args) = self.command_line(command);
        tracing::info!(command = %command, sudo = program == "sudo", "Running tool");

        // stdin stays attached so sudo can prompt for a password.
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TrustError::Spawn {
                tool: command.tool_name(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        if let Some(pipe) = child.stdout.take() {
            drain(pipe, Stream::Stdout, tx.clone());
        }
        if let Some(pipe) = child.stderr.take() {
            drain(pipe, Stream::Stderr, tx.clone());
        }
        drop(tx);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    tracing::warn!(command = %command, "Tool timed out");
                    return Err(TrustError::ToolTimeout {
                        tool: command.tool_name(),
                        timeout: self.timeout,
                    });
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(source) => {
                    let _ = child.kill();
                    return Err(TrustError::Spawn {
                        tool: command.tool_name(),
                        source,
                    });
                }
            }
        };

        // Helpers the tool left running can hold the pipes open past its exit.
        let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
        let (stdout, stderr, complete) = collect(&rx, drain_deadline);
        if !complete {
            tracing::warn!(command = %command, "Tool output still open after exit; keeping what was read");
        }

        let output = ToolOutput {
            status: status.code(),
            stdout,
            stderr,
        };
        tracing::debug!(command = %command, status = ?output.status, "Tool finished");
        Ok(output)
    }

    fn find_program(&self, program: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path).find_map(|dir| executable_in(&dir.join(program)))
    }
}

fn executable_in(candidate: &std::path::Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    if cfg!(windows) {
        let exe = candidate.with_extension("exe");
        if exe.is_file() {
            return Some(exe);
        }
    }
    None
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Forward everything read from `pipe` to `tx` until EOF.
fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<(Stream, Vec<u8>)>) {
    std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
}

/// Gather output until both pipes close or `deadline` passes. The flag is
/// false when the deadline cut reading short.
fn collect(rx: &Receiver<(Stream, Vec<u8>)>, deadline: Instant) -> (String, String, bool) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let complete = loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(wait) {
            Ok((Stream::Stdout, bytes)) => stdout.extend_from_slice(&bytes),
            Ok((Stream::Stderr, bytes)) => stderr.extend_from_slice(&bytes),
            Err(RecvTimeoutError::Disconnected) => break true,
            Err(RecvTimeoutError::Timeout) => break false,
        }
    };
    (
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
        complete,
    )
}

#[cfg(unix)]
fn needs_sudo() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() != 0 }
}

#[cfg(not(unix))]
fn needs_sudo() -> bool {
    false
}
