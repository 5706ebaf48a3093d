//! Leaf certificate issuance from the command line.

use time::OffsetDateTime;

use crate::ca::{self, KeyKind, LocalCAStore};
use crate::config::Config;
use crate::output;

/// Which key a leaf gets for the given flags.
fn leaf_key_kind(ecdsa: bool) -> KeyKind {
    if ecdsa { KeyKind::Ecdsa } else { KeyKind::Leaf }
}

fn expiry_line(not_after: OffsetDateTime) -> String {
    format!(
        "It will expire on {} {} {}",
        not_after.day(),
        not_after.month(),
        not_after.year()
    )
}

/// Issue a certificate for `hosts` into the CA root.
pub fn run(config: &Config, hosts: &[String], ecdsa: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalCAStore::new(&config.caroot);
    let outcome = super::ensure_ca(&store)?;

    let key_kind = leaf_key_kind(ecdsa);
    let files = output::with_spinner(
        format!("Generating {} certificate...", key_kind.describe()),
        || ca::issue_to_disk(&outcome.ca, store.root(), hosts, key_kind),
    )?;

    tracing::info!(
        serial = %hex::encode(&files.certificate.serial),
        not_before = %files.certificate.not_before,
        not_after = %files.certificate.not_after,
        "Issued certificate"
    );

    output::section("Created a new certificate valid for:");
    for host in hosts {
        output::step(host);
    }
    println!();
    output::success(&format!(
        "Certificate: {}",
        output::emphasized(&files.cert_path.display().to_string())
    ));
    output::success(&format!(
        "Key:         {}",
        output::emphasized(&files.key_path.display().to_string())
    ));
    output::muted(&expiry_line(files.certificate.not_after));

    if hosts.iter().any(|h| h.starts_with("*.")) {
        output::muted("Wildcards cover one label only: *.example.test does not match example.test.");
    }

    Ok(())
}
