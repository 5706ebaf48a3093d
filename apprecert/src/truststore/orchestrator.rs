//! Runs every trust target for this platform and collects one report.

use super::{
    Change, Discovery, DockerBundle, GitConfig, JavaKeystore, KubernetesConfigMap,
    LinuxSystemStore, MacosKeychain, NodeExtraCerts, NssProfiles, PythonCertifi, TargetKind,
    TrustEnv, TrustError, TrustTarget, WindowsRootStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Install,
    Uninstall,
}

#[derive(Debug)]
pub enum EntryStatus {
    Done(Change),
    Skipped(String),
    Failed(TrustError),
    /// Not run because an earlier target failed in fail-fast mode
    NotAttempted,
}

#[derive(Debug)]
pub struct ReportEntry {
    pub kind: TargetKind,
    pub location: Option<String>,
    pub status: EntryStatus,
}

#[derive(Debug)]
pub struct Report {
    pub mode: Mode,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.status, EntryStatus::Failed(_)))
    }
}

pub struct Orchestrator {
    targets: Vec<Box<dyn TrustTarget>>,
    fail_fast: bool,
}

impl Orchestrator {
    /// The OS-native store first, then every tool-specific target in a fixed
    /// order.
    pub fn for_current_platform(fail_fast: bool) -> Self {
        let mut targets: Vec<Box<dyn TrustTarget>> = Vec::new();
        if cfg!(target_os = "macos") {
            targets.push(Box::new(MacosKeychain));
        } else if cfg!(target_os = "linux") {
            targets.push(Box::new(LinuxSystemStore::new()));
        } else if cfg!(target_os = "windows") {
            targets.push(Box::new(WindowsRootStore));
        }
        targets.push(Box::new(KubernetesConfigMap));
        targets.push(Box::new(DockerBundle));
        targets.push(Box::new(GitConfig));
        targets.push(Box::new(NodeExtraCerts));
        targets.push(Box::new(JavaKeystore));
        targets.push(Box::new(NssProfiles));
        targets.push(Box::new(PythonCertifi));

        Self::with_targets(targets, fail_fast)
    }

    pub fn with_targets(targets: Vec<Box<dyn TrustTarget>>, fail_fast: bool) -> Self {
        Self { targets, fail_fast }
    }

    pub fn run(&self, mode: Mode, env: &TrustEnv) -> Report {
        let mut entries = Vec::new();
        let mut stopped = false;

        for target in &self.targets {
            let kind = target.kind();
            if stopped {
                entries.push(ReportEntry {
                    kind,
                    location: None,
                    status: EntryStatus::NotAttempted,
                });
                continue;
            }

            if mode == Mode::Uninstall && !target.supports_uninstall() {
                entries.push(ReportEntry {
                    kind,
                    location: None,
                    status: EntryStatus::Skipped("uninstall not supported".to_string()),
                });
                continue;
            }

            let locations = match target.discover(env) {
                Discovery::Found(locations) => locations,
                Discovery::Skip(reason) => {
                    tracing::info!(kind = %kind, %reason, "Skipping trust target");
                    entries.push(ReportEntry {
                        kind,
                        location: None,
                        status: EntryStatus::Skipped(reason),
                    });
                    continue;
                }
            };

            for location in locations {
                if stopped {
                    entries.push(ReportEntry {
                        kind,
                        location: Some(location.label),
                        status: EntryStatus::NotAttempted,
                    });
                    continue;
                }

                let result = match mode {
                    Mode::Install => target.install(env, &location),
                    Mode::Uninstall => target.uninstall(env, &location),
                };
                let status = match result {
                    Ok(change) => {
                        tracing::info!(kind = %kind, location = %location.label, ?change, "Trust target done");
                        EntryStatus::Done(change)
                    }
                    Err(e) => {
                        tracing::warn!(kind = %kind, location = %location.label, error = %e, "Trust target failed");
                        stopped = self.fail_fast;
                        EntryStatus::Failed(e)
                    }
                };
                entries.push(ReportEntry {
                    kind,
                    location: Some(location.label),
                    status,
                });
            }
        }

        Report { mode, entries }
    }
}
