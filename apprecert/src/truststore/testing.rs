//! Scripted [`CommandRunner`] for target and orchestrator tests.

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

use super::{CaFile, CommandRunner, ToolCommand, ToolOutput, TrustEnv, TrustError};

enum Reply {
    Output(ToolOutput),
    Timeout,
}

/// Answers commands from a script. The first rule whose pattern is a
/// substring of the rendered command line wins; unmatched commands succeed
/// with empty output.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    programs: Vec<String>,
    rules: Vec<(String, Reply)>,
    calls: RefCell<Vec<ToolCommand>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `program` discoverable on the fake `PATH`.
    pub fn with_program(mut self, program: &str) -> Self {
        self.programs.push(program.to_string());
        self
    }

    pub fn respond(mut self, pattern: &str, status: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.push((
            pattern.to_string(),
            Reply::Output(ToolOutput {
                status: Some(status),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
        ));
        self
    }

    pub fn time_out(mut self, pattern: &str) -> Self {
        self.rules.push((pattern.to_string(), Reply::Timeout));
        self
    }

    /// Rendered command lines, in call order. Privileged calls carry a
    /// `sudo ` prefix.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| {
                if c.privileged {
                    format!("sudo {c}")
                } else {
                    c.to_string()
                }
            })
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput, TrustError> {
        self.calls.borrow_mut().push(command.clone());
        let line = command.to_string();
        match self.rules.iter().find(|(pattern, _)| line.contains(pattern)) {
            Some((_, Reply::Output(output))) => Ok(output.clone()),
            Some((_, Reply::Timeout)) => Err(TrustError::ToolTimeout {
                tool: command.tool_name(),
                timeout: Duration::from_secs(120),
            }),
            None => Ok(ToolOutput {
                status: Some(0),
                ..ToolOutput::default()
            }),
        }
    }

    fn find_program(&self, program: &str) -> Option<PathBuf> {
        self.programs
            .iter()
            .any(|p| p == program)
            .then(|| PathBuf::from("/usr/bin").join(program))
    }
}

/// A CA file with fixed content under `dir`.
pub(crate) fn ca_file(dir: &std::path::Path) -> CaFile {
    let path = dir.join("rootCA.pem");
    let pem = "-----BEGIN CERTIFICATE-----\nTUlJQ0FURVNU\n-----END CERTIFICATE-----\n";
    std::fs::write(&path, pem).unwrap();
    CaFile {
        path,
        pem: pem.to_string(),
        serial_hex: "01ab".to_string(),
    }
}

pub(crate) fn env<'a>(runner: &'a ScriptedRunner, ca: &'a CaFile) -> TrustEnv<'a> {
    TrustEnv {
        runner,
        ca,
        home: None,
        java_home: None,
    }
}
