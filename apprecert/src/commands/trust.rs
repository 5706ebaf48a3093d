//! `--install` / `--uninstall`: propagate the CA into every trust store.

use crate::ca::LocalCAStore;
use crate::config::Config;
use crate::output;
use crate::truststore::{
    CaFile, Change, EntryStatus, Mode, Orchestrator, Report, ReportEntry, SystemRunner,
    TargetKind, TrustEnv,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Success,
    Muted,
    Error,
}

fn describe(mode: Mode, entry: &ReportEntry) -> (Tone, String) {
    let label = match &entry.location {
        Some(location) => format!("{} ({location})", entry.kind),
        None => entry.kind.to_string(),
    };

    match (&entry.status, mode) {
        (EntryStatus::Done(Change::Applied), Mode::Install) => {
            (Tone::Success, format!("{label}: installed"))
        }
        (EntryStatus::Done(Change::Applied), Mode::Uninstall) => {
            (Tone::Success, format!("{label}: removed"))
        }
        (EntryStatus::Done(Change::AlreadyPresent), _) => {
            (Tone::Success, format!("{label}: already installed"))
        }
        (EntryStatus::Done(Change::NotPresent), _) => {
            (Tone::Muted, format!("{label}: nothing to remove"))
        }
        (EntryStatus::Skipped(reason), _) => (Tone::Muted, format!("{label}: skipped, {reason}")),
        (EntryStatus::Failed(err), _) => (Tone::Error, format!("{label}: {err}")),
        (EntryStatus::NotAttempted, _) => (Tone::Muted, format!("{label}: not attempted")),
    }
}

fn render(report: &Report, ca: &CaFile) {
    for entry in &report.entries {
        let (tone, line) = describe(report.mode, entry);
        match tone {
            Tone::Success => output::success(&line),
            Tone::Muted => output::muted(&format!("  {line}")),
            Tone::Error => output::error(&line),
        }

        if report.mode == Mode::Install
            && entry.kind == TargetKind::NodeJs
            && matches!(entry.status, EntryStatus::Done(_))
        {
            output::muted(&format!(
                "  NODE_EXTRA_CA_CERTS only applies to processes started from here; add {} to your shell profile.",
                output::emphasized(&format!("export NODE_EXTRA_CA_CERTS=\"{}\"", ca.path.display()))
            ));
        }
    }
}

fn finish(report: &Report) -> Result<(), Box<dyn std::error::Error>> {
    if !report.has_failures() {
        return Ok(());
    }
    let failed = report.failures().count();
    let noun = if failed == 1 { "target" } else { "targets" };
    Err(format!("{failed} trust {noun} failed").into())
}

fn propagate(
    config: &Config,
    mode: Mode,
    fail_fast: bool,
    ca: &CaFile,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = SystemRunner::new(config.tool_timeout);
    let env = TrustEnv::from_process(&runner, ca);

    let title = match mode {
        Mode::Install => "Installing the local CA",
        Mode::Uninstall => "Removing the local CA",
    };
    output::section(title);

    let report = Orchestrator::for_current_platform(fail_fast).run(mode, &env);
    render(&report, ca);
    finish(&report)
}

/// Install the CA everywhere, creating it first if needed.
pub fn install(config: &Config, fail_fast: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalCAStore::new(&config.caroot);
    let outcome = super::ensure_ca(&store)?;
    let ca = CaFile::new(store.ca_cert_path(), outcome.ca.certificate());
    propagate(config, Mode::Install, fail_fast, &ca)
}

/// Remove the CA from every store. The CA itself stays on disk.
pub fn uninstall(config: &Config, fail_fast: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalCAStore::new(&config.caroot);
    let local_ca = store.load()?;
    let ca = CaFile::new(store.ca_cert_path(), local_ca.certificate());
    propagate(config, Mode::Uninstall, fail_fast, &ca)?;
    output::muted(&format!(
        "The CA is still stored in {}; delete that directory to discard it.",
        output::emphasized(&store.root().display().to_string())
    ));
    Ok(())
}
