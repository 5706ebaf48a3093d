pub mod issue;
pub mod trust;

use crate::ca::{CaSource, LoadOutcome, LocalCAStore};
use crate::output;

/// Load the CA, generating it first when the root is empty.
fn ensure_ca(store: &LocalCAStore) -> Result<LoadOutcome, Box<dyn std::error::Error>> {
    let outcome = if store.ca_exists() {
        store.load_or_bootstrap()?
    } else {
        output::with_spinner("Generating local CA...", || store.load_or_bootstrap())?
    };

    if outcome.source == CaSource::Generated {
        output::success(&format!(
            "Created a new local CA at {}",
            output::emphasized(&store.root().display().to_string())
        ));
    }

    if let Some(exports) = outcome.exports.as_ref().filter(|e| !e.is_complete()) {
        for (format, err) in exports.failures() {
            output::warning(&format!("Could not export CA as {format}: {err}"));
        }
    }

    let cert = outcome.ca.certificate();
    tracing::info!(
        subject = %cert.subject(),
        serial = %cert.serial_hex(),
        algorithm = ?outcome.ca.signer().algorithm(),
        not_before = %cert.not_before(),
        not_after = %cert.not_after(),
        "Using local CA"
    );

    Ok(outcome)
}
