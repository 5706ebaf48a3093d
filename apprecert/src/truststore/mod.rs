//! Propagating trust of the local CA into the stores developer tools consult.
//!
//! Every store is a [`TrustTarget`]. Targets discover where they apply, then
//! install or uninstall the CA certificate file. External tools are only ever
//! invoked through a [`CommandRunner`].

mod docker;
mod git;
mod java;
mod kubernetes;
mod nodejs;
mod nss;
pub mod orchestrator;
mod python;
pub mod runner;
mod system;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::ca::CaCertificate;

pub use docker::DockerBundle;
pub use git::GitConfig;
pub use java::JavaKeystore;
pub use kubernetes::KubernetesConfigMap;
pub use nodejs::NodeExtraCerts;
pub use nss::NssProfiles;
pub use orchestrator::{EntryStatus, Mode, Orchestrator, Report, ReportEntry};
pub use python::PythonCertifi;
pub use runner::{CommandRunner, SystemRunner, ToolCommand, ToolOutput};
pub use system::{LinuxSystemStore, MacosKeychain, WindowsRootStore};

/// Nickname/alias the CA is registered under in stores that key by name.
pub const TRUST_ALIAS: &str = "apprecert-rootCA";

/// Errors that can occur while changing a trust store
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("{tool} failed ({}): {}", exit_label(.status), .output.trim())]
    ToolFailed {
        tool: String,
        status: Option<i32>,
        output: String,
    },

    #[error("{tool} did not finish within {}s", .timeout.as_secs())]
    ToolTimeout { tool: String, timeout: Duration },

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("CA certificate not found at {0}")]
    CaFileMissing(PathBuf),

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, std::io::Error),

    #[error("Failed to write file {0}: {1}")]
    FileWrite(PathBuf, std::io::Error),
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Which kind of trust anchor a target manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    MacosKeychain,
    LinuxSystem,
    WindowsRoot,
    Kubernetes,
    Docker,
    Git,
    NodeJs,
    Java,
    Nss,
    Python,
}

impl TargetKind {
    pub fn name(self) -> &'static str {
        match self {
            TargetKind::MacosKeychain => "macOS keychain",
            TargetKind::LinuxSystem => "system trust store",
            TargetKind::WindowsRoot => "Windows root store",
            TargetKind::Kubernetes => "Kubernetes",
            TargetKind::Docker => "Docker CA bundle",
            TargetKind::Git => "Git",
            TargetKind::NodeJs => "Node.js",
            TargetKind::Java => "Java keystore",
            TargetKind::Nss => "NSS/browser profile",
            TargetKind::Python => "Python certifi",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One place a target applies to (a database, a keystore, a config key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub label: String,
    pub path: Option<PathBuf>,
}

impl Location {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: path.display().to_string(),
            path: Some(path),
        }
    }

    pub fn named(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: None,
        }
    }

    /// Filesystem path of this location; targets that hand out named
    /// locations never ask for one.
    fn file(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(&self.label))
    }
}

/// Outcome of [`TrustTarget::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(Vec<Location>),
    Skip(String),
}

impl Discovery {
    fn skip(reason: impl Into<String>) -> Self {
        Discovery::Skip(reason.into())
    }
}

/// What an install or uninstall did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Applied,
    AlreadyPresent,
    NotPresent,
}

/// The CA certificate as the trust targets see it.
#[derive(Debug, Clone)]
pub struct CaFile {
    pub path: PathBuf,
    pub pem: String,
    /// Serial in hex without leading zero bytes
    pub serial_hex: String,
}

impl CaFile {
    pub fn new(path: impl Into<PathBuf>, certificate: &CaCertificate) -> Self {
        Self {
            path: path.into(),
            pem: certificate.pem().to_string(),
            serial_hex: certificate.serial_hex(),
        }
    }

    fn ensure_exists(&self) -> Result<(), TrustError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(TrustError::CaFileMissing(self.path.clone()))
        }
    }

    fn path_arg(&self) -> String {
        self.path.display().to_string()
    }
}

/// Everything a target may consult. Built from the process environment in
/// production and by hand in tests.
pub struct TrustEnv<'a> {
    pub runner: &'a dyn CommandRunner,
    pub ca: &'a CaFile,
    pub home: Option<PathBuf>,
    pub java_home: Option<PathBuf>,
}

impl<'a> TrustEnv<'a> {
    pub fn from_process(runner: &'a dyn CommandRunner, ca: &'a CaFile) -> Self {
        Self {
            runner,
            ca,
            home: crate::paths::home_dir(),
            java_home: std::env::var_os("JAVA_HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Run a command and require a zero exit status.
    fn run_checked(&self, command: &ToolCommand) -> Result<ToolOutput, TrustError> {
        let output = self.runner.run(command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(output.into_failure(command))
        }
    }

    /// Run a removal command. A failure whose output matches `absent` means
    /// there was nothing to remove.
    fn run_removal(
        &self,
        command: &ToolCommand,
        absent: impl Fn(&ToolOutput) -> bool,
    ) -> Result<Change, TrustError> {
        let output = self.runner.run(command)?;
        if output.success() {
            Ok(Change::Applied)
        } else if absent(&output) {
            tracing::debug!(command = %command, "Nothing to remove");
            Ok(Change::NotPresent)
        } else {
            Err(output.into_failure(command))
        }
    }
}

/// A trust anchor the CA can be installed into.
pub trait TrustTarget {
    fn kind(&self) -> TargetKind;

    /// Find where this target applies on the current machine.
    fn discover(&self, env: &TrustEnv) -> Discovery;

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError>;

    fn uninstall(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError>;

    fn supports_uninstall(&self) -> bool {
        true
    }
}
