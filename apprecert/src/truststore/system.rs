//! Operating system trust stores.

use std::fs;
use std::path::{Path, PathBuf};

use super::{
    Change, Discovery, Location, TRUST_ALIAS, TargetKind, ToolCommand, TrustEnv, TrustError,
    TrustTarget,
};

const SYSTEM_KEYCHAIN: &str = "/Library/Keychains/System.keychain";

/// The macOS System keychain, via `security`.
pub struct MacosKeychain;

impl TrustTarget for MacosKeychain {
    fn kind(&self) -> TargetKind {
        TargetKind::MacosKeychain
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        if !cfg!(target_os = "macos") {
            return Discovery::skip("only available on macOS");
        }
        if env.runner.find_program("security").is_none() {
            return Discovery::skip("security not found on PATH");
        }
        Discovery::Found(vec![Location::path(SYSTEM_KEYCHAIN)])
    }

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        let keychain = location.file().display().to_string();
        env.run_checked(
            &ToolCommand::new(
                "security",
                [
                    "add-trusted-cert",
                    "-d",
                    "-r",
                    "trustRoot",
                    "-k",
                    keychain.as_str(),
                    env.ca.path_arg().as_str(),
                ],
            )
            .privileged(),
        )?;
        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        env.run_removal(
            &ToolCommand::new(
                "security",
                ["remove-trusted-cert", "-d", env.ca.path_arg().as_str()],
            )
            .privileged(),
            |out| out.mentions("could not be found"),
        )
    }
}

/// Anchor directory and refresh command of one Linux distribution family.
#[derive(Debug, Clone)]
pub struct SystemLayout {
    pub anchors: PathBuf,
    pub extension: &'static str,
    /// Refresh program and its arguments
    pub refresh: (&'static str, &'static [&'static str]),
}

impl SystemLayout {
    fn new(
        anchors: &str,
        extension: &'static str,
        refresh: (&'static str, &'static [&'static str]),
    ) -> Self {
        Self {
            anchors: PathBuf::from(anchors),
            extension,
            refresh,
        }
    }

    fn destination(&self) -> PathBuf {
        self.anchors
            .join(format!("{TRUST_ALIAS}.{}", self.extension))
    }

    fn refresh_command(&self) -> ToolCommand {
        let (program, args) = self.refresh;
        ToolCommand::new(program, args.iter().copied()).privileged()
    }
}

/// The distribution-wide CA bundle on Linux.
pub struct LinuxSystemStore {
    layouts: Vec<SystemLayout>,
}

impl LinuxSystemStore {
    pub fn new() -> Self {
        Self::with_layouts(vec![
            // Debian, Ubuntu
            SystemLayout::new(
                "/usr/local/share/ca-certificates",
                "crt",
                ("update-ca-certificates", &[]),
            ),
            // Fedora, RHEL, CentOS
            SystemLayout::new(
                "/etc/pki/ca-trust/source/anchors",
                "pem",
                ("update-ca-trust", &["extract"]),
            ),
            // Arch
            SystemLayout::new(
                "/etc/ca-certificates/trust-source/anchors",
                "crt",
                ("trust", &["extract-compat"]),
            ),
            // openSUSE
            SystemLayout::new(
                "/usr/share/pki/trust/anchors",
                "pem",
                ("update-ca-certificates", &[]),
            ),
        ])
    }

    pub fn with_layouts(layouts: Vec<SystemLayout>) -> Self {
        Self { layouts }
    }

    fn layout_for(&self, destination: &Path) -> Option<&SystemLayout> {
        self.layouts
            .iter()
            .find(|layout| destination.parent() == Some(layout.anchors.as_path()))
    }

    fn refresh(&self, env: &TrustEnv, destination: &Path) -> Result<(), TrustError> {
        if let Some(layout) = self.layout_for(destination) {
            env.run_checked(&layout.refresh_command())?;
        }
        Ok(())
    }
}

impl Default for LinuxSystemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrustTarget for LinuxSystemStore {
    fn kind(&self) -> TargetKind {
        TargetKind::LinuxSystem
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        if !cfg!(target_os = "linux") {
            return Discovery::skip("only available on Linux");
        }
        self.layouts
            .iter()
            .find(|layout| {
                layout.anchors.is_dir() && env.runner.find_program(layout.refresh.0).is_some()
            })
            .map(|layout| Discovery::Found(vec![Location::path(layout.destination())]))
            .unwrap_or_else(|| Discovery::skip("no supported system trust store layout found"))
    }

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        let destination = location.file();

        if fs::read_to_string(destination).is_ok_and(|existing| existing == env.ca.pem) {
            return Ok(Change::AlreadyPresent);
        }

        let destination_arg = destination.display().to_string();
        env.run_checked(
            &ToolCommand::new(
                "cp",
                [env.ca.path_arg().as_str(), destination_arg.as_str()],
            )
            .privileged(),
        )?;
        self.refresh(env, destination)?;
        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        let destination = location.file();
        if !destination.exists() {
            return Ok(Change::NotPresent);
        }

        let destination_arg = destination.display().to_string();
        env.run_checked(&ToolCommand::new("rm", ["-f", destination_arg.as_str()]).privileged())?;
        self.refresh(env, destination)?;
        Ok(Change::Applied)
    }
}

/// The Windows ROOT certificate store, via `certutil`.
pub struct WindowsRootStore;

impl TrustTarget for WindowsRootStore {
    fn kind(&self) -> TargetKind {
        TargetKind::WindowsRoot
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        if !cfg!(target_os = "windows") {
            return Discovery::skip("only available on Windows");
        }
        if env.runner.find_program("certutil").is_none() {
            return Discovery::skip("certutil not found on PATH");
        }
        Discovery::Found(vec![Location::named("ROOT")])
    }

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        env.run_checked(&ToolCommand::new(
            "certutil",
            [
                "-addstore",
                "-f",
                location.label.as_str(),
                env.ca.path_arg().as_str(),
            ],
        ))?;
        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.run_removal(
            &ToolCommand::new(
                "certutil",
                [
                    "-delstore",
                    location.label.as_str(),
                    env.ca.serial_hex.as_str(),
                ],
            ),
            |out| out.mentions("not found") || out.mentions("cannot find"),
        )
    }
}
