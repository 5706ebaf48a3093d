//! Key material for the CA and issued leaves.
//!
//! RSA keys come from OpenSSL and are handed to rcgen as PKCS#8; ECDSA keys are
//! generated by rcgen's own backend.

use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use rcgen::{KeyPair, PKCS_ECDSA_P256_SHA256, PKCS_RSA_SHA256, SerialNumber};

use super::{CaError, Result};

/// Serial numbers are 128 random bits.
const SERIAL_NUMBER_BYTES: usize = 16;

/// Which key policy to generate for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// RSA 3072, used for the root CA
    Ca,
    /// RSA 2048, the default for issued leaves
    Leaf,
    /// ECDSA P-256
    Ecdsa,
}

impl KeyKind {
    pub fn describe(self) -> &'static str {
        match self {
            KeyKind::Ca => "RSA-3072",
            KeyKind::Leaf => "RSA-2048",
            KeyKind::Ecdsa => "ECDSA-P256",
        }
    }

    fn rsa_bits(self) -> Option<u32> {
        match self {
            KeyKind::Ca => Some(3072),
            KeyKind::Leaf => Some(2048),
            KeyKind::Ecdsa => None,
        }
    }
}

/// Generate a fresh key pair. Failure means the entropy source or crypto
/// backend is broken and is never retried.
pub fn generate(kind: KeyKind) -> Result<KeyPair> {
    tracing::debug!(algorithm = kind.describe(), "Generating key pair");
    match kind.rsa_bits() {
        Some(bits) => generate_rsa(bits),
        None => KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| CaError::KeypairGeneration(e.to_string())),
    }
}

fn generate_rsa(bits: u32) -> Result<KeyPair> {
    let rsa = Rsa::generate(bits).map_err(|e| CaError::KeypairGeneration(e.to_string()))?;
    let pkey = PKey::from_rsa(rsa).map_err(|e| CaError::KeypairGeneration(e.to_string()))?;
    let pkcs8 = pkey
        .private_key_to_pem_pkcs8()
        .map_err(|e| CaError::KeypairGeneration(e.to_string()))?;
    let pkcs8 = String::from_utf8(pkcs8)
        .map_err(|e| CaError::KeypairGeneration(format!("PKCS#8 PEM is not UTF-8: {e}")))?;

    KeyPair::from_pem_and_sign_algo(&pkcs8, &PKCS_RSA_SHA256)
        .map_err(|e| CaError::KeypairGeneration(e.to_string()))
}

/// Random 128-bit serial number. rcgen encodes it as a positive INTEGER.
pub fn random_serial() -> Result<SerialNumber> {
    let mut bytes = [0u8; SERIAL_NUMBER_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| CaError::Entropy(e.to_string()))?;
    Ok(SerialNumber::from(bytes.to_vec()))
}
