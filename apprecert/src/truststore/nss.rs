//! NSS certificate databases used by Firefox and Chromium on Linux.

use std::fs;
use std::path::{Path, PathBuf};

use super::{
    Change, Discovery, Location, TRUST_ALIAS, TargetKind, ToolCommand, TrustEnv, TrustError,
    TrustTarget,
};

/// Profile roots relative to the home directory. `true` means every
/// subdirectory is a candidate profile.
const PROFILE_ROOTS: &[(&str, bool)] = &[
    (".pki/nssdb", false),
    ("snap/chromium/current/.pki/nssdb", false),
    (".mozilla/firefox", true),
    ("snap/firefox/common/.mozilla/firefox", true),
    ("Library/Application Support/Firefox/Profiles", true),
];

pub struct NssProfiles;

impl NssProfiles {
    fn profiles(home: &Path) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for (relative, expand) in PROFILE_ROOTS {
            let root = home.join(relative);
            if !*expand {
                dirs.push(root);
                continue;
            }
            let Ok(entries) = fs::read_dir(&root) else {
                continue;
            };
            let mut children: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_dir())
                .collect();
            children.sort();
            dirs.extend(children);
        }
        dirs.into_iter()
            .filter(|dir| database_spec(dir).is_some())
            .collect()
    }
}

/// `sql:` for cert9.db databases, `dbm:` for legacy cert8.db ones.
fn database_spec(dir: &Path) -> Option<String> {
    if dir.join("cert9.db").is_file() {
        Some(format!("sql:{}", dir.display()))
    } else if dir.join("cert8.db").is_file() {
        Some(format!("dbm:{}", dir.display()))
    } else {
        None
    }
}

impl TrustTarget for NssProfiles {
    fn kind(&self) -> TargetKind {
        TargetKind::Nss
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        if cfg!(target_os = "windows") {
            // certutil on Windows is the system tool, not NSS.
            return Discovery::skip("NSS certutil is not used on Windows");
        }
        let Some(home) = env.home.as_deref() else {
            return Discovery::skip("home directory unknown");
        };

        let profiles = Self::profiles(home);
        if profiles.is_empty() {
            return Discovery::skip("no NSS databases found");
        }
        if env.runner.find_program("certutil").is_none() {
            return Discovery::skip("certutil not found on PATH (install libnss3-tools or nss-tools)");
        }

        Discovery::Found(profiles.into_iter().map(Location::path).collect())
    }

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        let db = database_arg(location);
        env.run_checked(&ToolCommand::new(
            "certutil",
            [
                "-A",
                "-d",
                db.as_str(),
                "-t",
                "C,,",
                "-n",
                TRUST_ALIAS,
                "-i",
                env.ca.path_arg().as_str(),
            ],
        ))?;
        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        let db = database_arg(location);
        env.run_removal(
            &ToolCommand::new("certutil", ["-D", "-d", db.as_str(), "-n", TRUST_ALIAS]),
            |out| out.mentions("could not be found"),
        )
    }
}

fn database_arg(location: &Location) -> String {
    let dir = location.file();
    database_spec(dir).unwrap_or_else(|| format!("sql:{}", dir.display()))
}
