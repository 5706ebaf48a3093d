//! CA certificate exports: PEM, CRT, PKCS#12.
//!
//! Each format is written independently; one failing does not stop the others.

use std::path::{Path, PathBuf};

use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::x509::X509;
use pem::{EncodeConfig, LineEnding, Pem};

use super::fs::{PRIVATE_MODE, PUBLIC_MODE, write_atomic};
use super::{CA_COMMON_NAME, CaError, ROOT_CA_CRT, ROOT_CA_P12, ROOT_CA_PEM, Result};

/// Passphrase protecting `rootCA.p12`. Documented and deliberately not secret:
/// it matches the default Java keystore password so the bundle imports without
/// prompting.
pub const P12_PASSPHRASE: &str = "changeit";

/// Per-format outcome of [`export_all`].
#[derive(Debug)]
pub struct ExportReport {
    pub pem: Result<PathBuf>,
    pub crt: Result<PathBuf>,
    pub p12: Result<PathBuf>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.pem.is_ok() && self.crt.is_ok() && self.p12.is_ok()
    }

    /// Formats that failed, with their errors.
    pub fn failures(&self) -> Vec<(&'static str, &CaError)> {
        [("pem", &self.pem), ("crt", &self.crt), ("p12", &self.p12)]
            .into_iter()
            .filter_map(|(name, result)| result.as_ref().err().map(|e| (name, e)))
            .collect()
    }
}

/// Write the CA certificate in every supported format under `root`.
pub fn export_all(cert_der: &[u8], key_pem: &str, root: &Path) -> ExportReport {
    let cert_pem = encode_cert_pem(cert_der);

    let report = ExportReport {
        pem: write_public(&root.join(ROOT_CA_PEM), &cert_pem),
        crt: write_public(&root.join(ROOT_CA_CRT), &cert_pem),
        p12: export_p12(cert_der, key_pem, &root.join(ROOT_CA_P12)),
    };

    for (format, err) in report.failures() {
        tracing::warn!(format, error = %err, "CA export failed");
    }
    report
}

/// PEM-encode a DER certificate with LF line endings.
pub fn encode_cert_pem(cert_der: &[u8]) -> String {
    let block = Pem::new("CERTIFICATE", cert_der.to_vec());
    pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

fn write_public(path: &Path, cert_pem: &str) -> Result<PathBuf> {
    write_atomic(path, cert_pem.as_bytes(), PUBLIC_MODE)?;
    Ok(path.to_path_buf())
}

/// Re-export only the PKCS#12 bundle.
pub fn export_p12(cert_der: &[u8], key_pem: &str, path: &Path) -> Result<PathBuf> {
    let der = encode_p12(cert_der, key_pem)?;
    write_atomic(path, &der, PRIVATE_MODE)?;
    Ok(path.to_path_buf())
}

fn encode_p12(cert_der: &[u8], key_pem: &str) -> Result<Vec<u8>> {
    let cert = X509::from_der(cert_der).map_err(|e| CaError::Pkcs12(e.to_string()))?;
    let key =
        PKey::private_key_from_pem(key_pem.as_bytes()).map_err(|e| CaError::Pkcs12(e.to_string()))?;

    let mut builder = Pkcs12::builder();
    builder.name(CA_COMMON_NAME).pkey(&key).cert(&cert);
    let bundle = builder
        .build2(P12_PASSPHRASE)
        .map_err(|e| CaError::Pkcs12(e.to_string()))?;

    bundle.to_der().map_err(|e| CaError::Pkcs12(e.to_string()))
}
