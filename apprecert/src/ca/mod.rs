//! Local development CA and leaf certificate issuance.

mod error;
pub mod export;
mod fs;
pub mod issuer;
pub mod keys;
mod store;
mod validity;

pub use error::{CaError, Result};
pub use issuer::{IssuedCertificate, IssuedFiles, issue, issue_to_disk};
pub use keys::KeyKind;
pub use store::{CaCertificate, CaSigner, CaSource, LoadOutcome, LocalCA, LocalCAStore};

/// CA certificate, PEM encoded
pub const ROOT_CA_PEM: &str = "rootCA.pem";
/// Same bytes as [`ROOT_CA_PEM`], for tools that key on the `.crt` extension
pub const ROOT_CA_CRT: &str = "rootCA.crt";
/// CA certificate and key as a PKCS#12 bundle
pub const ROOT_CA_P12: &str = "rootCA.p12";
/// CA private key, PKCS#8 PEM
pub const ROOT_CA_KEY: &str = "rootCA-key.pem";

pub const CA_COMMON_NAME: &str = "Apprecert Development CA";
pub const CA_ORGANIZATION: &str = "Apprecert Development CA";
pub const LEAF_ORGANIZATION: &str = "Apprecert Development Certificate";
