use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during CA operations
#[derive(Debug, Error)]
pub enum CaError {
    #[error("Failed to generate keypair: {0}")]
    KeypairGeneration(String),

    #[error("Entropy source failure: {0}")]
    Entropy(String),

    #[error("Failed to generate certificate: {0}")]
    CertificateGeneration(String),

    #[error("Corrupt CA material in {path}: {reason}")]
    CorruptCaMaterial { path: PathBuf, reason: String },

    #[error(
        "CA certificate exists but its private key {0} is missing; restore it or remove the CA root to start over"
    )]
    MissingCaKey(PathBuf),

    #[error("No CA certificate found at {0}")]
    CaNotFound(PathBuf),

    #[error("No hosts specified")]
    NoHostsSpecified,

    #[error("Invalid host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, std::io::Error),

    #[error("Failed to write file {path}: {source}")]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode PKCS#12 bundle: {0}")]
    Pkcs12(String),
}

pub type Result<T> = std::result::Result<T, CaError>;

impl CaError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        CaError::CorruptCaMaterial {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
