//! Leaf certificate issuance.

use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyUsagePurpose,
    SanType,
};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use super::fs::{PRIVATE_MODE, PUBLIC_MODE, write_atomic};
use super::keys::{self, KeyKind};
use super::validity::add_months;
use super::{CaError, LEAF_ORGANIZATION, LocalCA, Result};

/// Leaf certificate validity (2 years and 3 months)
const LEAF_VALIDITY_MONTHS: i32 = 27;

/// A freshly signed leaf certificate and its private key.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub cert_pem: String,
    pub key_pem: String,
    pub serial: Vec<u8>,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

/// Where [`issue_to_disk`] put the certificate.
#[derive(Debug, Clone)]
pub struct IssuedFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub certificate: IssuedCertificate,
}

/// Issue a leaf certificate covering `hosts`.
///
/// The first host becomes the Common Name; every host is listed as a SAN.
pub fn issue(ca: &LocalCA, hosts: &[String], key_kind: KeyKind) -> Result<IssuedCertificate> {
    let primary = hosts.first().ok_or(CaError::NoHostsSpecified)?;

    let mut params = CertificateParams::default();

    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, primary.as_str());
    dn.push(DnType::OrganizationName, LEAF_ORGANIZATION);
    params.distinguished_name = dn;

    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];

    params.subject_alt_names = hosts
        .iter()
        .map(|host| subject_alt_name(host))
        .collect::<Result<_>>()?;

    let has_email = params
        .subject_alt_names
        .iter()
        .any(|san| matches!(san, SanType::Rfc822Name(_)));
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    if has_email {
        params
            .extended_key_usages
            .extend([ExtendedKeyUsagePurpose::ClientAuth, ExtendedKeyUsagePurpose::EmailProtection]);
    }

    let serial = keys::random_serial()?;
    params.serial_number = Some(serial.clone());

    let now = OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = add_months(now, LEAF_VALIDITY_MONTHS)?;

    let leaf_key = keys::generate(key_kind)?;
    let leaf_cert = params
        .signed_by(&leaf_key, ca.signer().issuer())
        .map_err(|e| {
            CaError::CertificateGeneration(format!("Failed to sign leaf certificate: {e}"))
        })?;

    tracing::debug!(
        host = %primary,
        hosts = hosts.len(),
        algorithm = key_kind.describe(),
        "Issued leaf certificate"
    );

    Ok(IssuedCertificate {
        cert_pem: leaf_cert.pem(),
        key_pem: leaf_key.serialize_pem(),
        serial: serial.to_bytes(),
        not_before: params.not_before,
        not_after: params.not_after,
    })
}

/// Issue a leaf certificate and write `<host>-cert.pem` / `<host>-key.pem`
/// into `dir`.
pub fn issue_to_disk(
    ca: &LocalCA,
    dir: &Path,
    hosts: &[String],
    key_kind: KeyKind,
) -> Result<IssuedFiles> {
    let certificate = issue(ca, hosts, key_kind)?;

    let stem = file_stem(&hosts[0]);
    let cert_path = dir.join(format!("{stem}-cert.pem"));
    let key_path = dir.join(format!("{stem}-key.pem"));

    write_atomic(&cert_path, certificate.cert_pem.as_bytes(), PUBLIC_MODE)?;
    if let Err(e) = write_atomic(&key_path, certificate.key_pem.as_bytes(), PRIVATE_MODE) {
        // A certificate without its key is useless.
        let _ = fs::remove_file(&cert_path);
        return Err(e);
    }

    Ok(IssuedFiles {
        cert_path,
        key_path,
        certificate,
    })
}

fn subject_alt_name(host: &str) -> Result<SanType> {
    let invalid = |e: rcgen::Error| CaError::InvalidHost {
        host: host.to_string(),
        reason: e.to_string(),
    };

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SanType::IpAddress(ip));
    }
    // The first host names the output files, so nothing may steer them out of the root.
    if let Some(c) = host.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(CaError::InvalidHost {
            host: host.to_string(),
            reason: format!("'{}' is not allowed in a host name", c.escape_default()),
        });
    }
    if host.contains('@') {
        return Ok(SanType::Rfc822Name(host.try_into().map_err(invalid)?));
    }
    if host.is_empty() {
        return Err(CaError::InvalidHost {
            host: host.to_string(),
            reason: "empty host name".to_string(),
        });
    }
    if let Some(c) = host
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '*')))
    {
        return Err(CaError::InvalidHost {
            host: host.to_string(),
            reason: format!("'{}' is not valid in a DNS name", c.escape_default()),
        });
    }
    Ok(SanType::DnsName(host.try_into().map_err(invalid)?))
}

/// File name stem for a host: `*` becomes `_wildcard`, `:` becomes `_`.
pub fn file_stem(host: &str) -> String {
    host.replace('*', "_wildcard").replace(':', "_")
}
