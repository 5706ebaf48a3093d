//! The `cacerts` keystore of the JDK named by `JAVA_HOME`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use super::{
    Change, Discovery, Location, TRUST_ALIAS, TargetKind, ToolCommand, TrustEnv, TrustError,
    TrustTarget,
};

/// Default password of the JDK `cacerts` store.
const STORE_PASSWORD: &str = "changeit";

pub struct JavaKeystore;

impl JavaKeystore {
    fn keytool(java_home: &Path) -> PathBuf {
        let name = if cfg!(windows) { "keytool.exe" } else { "keytool" };
        java_home.join("bin").join(name)
    }

    fn keystore(java_home: &Path) -> Option<PathBuf> {
        [
            java_home.join("lib").join("security").join("cacerts"),
            java_home
                .join("jre")
                .join("lib")
                .join("security")
                .join("cacerts"),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }

    /// keytool of the JDK that owns `keystore`, else whichever is on `PATH`.
    fn keytool_for(keystore: &Path) -> String {
        keystore
            .ancestors()
            .skip(1)
            .map(Self::keytool)
            .find(|keytool| keytool.is_file())
            .map(|keytool| keytool.display().to_string())
            .unwrap_or_else(|| "keytool".to_string())
    }

    fn command<'a>(keystore: &Path, args: impl IntoIterator<Item = &'a str>) -> ToolCommand {
        let keystore_arg = keystore.display().to_string();
        let mut command = ToolCommand::new(
            Self::keytool_for(keystore),
            args.into_iter().map(str::to_string).chain([
                "-alias".to_string(),
                TRUST_ALIAS.to_string(),
                "-keystore".to_string(),
                keystore_arg,
                "-storepass".to_string(),
                STORE_PASSWORD.to_string(),
            ]),
        );
        // JDKs installed system-wide keep cacerts root-owned.
        command.privileged = !is_writable(keystore);
        command
    }
}

fn is_writable(path: &Path) -> bool {
    OpenOptions::new().append(true).open(path).is_ok()
}

fn alias_missing(output: &super::ToolOutput) -> bool {
    output.mentions("does not exist")
}

impl TrustTarget for JavaKeystore {
    fn kind(&self) -> TargetKind {
        TargetKind::Java
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        let Some(java_home) = env.java_home.as_deref() else {
            return Discovery::skip("JAVA_HOME not set");
        };
        if !Self::keytool(java_home).is_file() {
            return Discovery::skip(format!(
                "keytool not found under {}",
                java_home.display()
            ));
        }
        match Self::keystore(java_home) {
            Some(keystore) => Discovery::Found(vec![Location::path(keystore)]),
            None => Discovery::skip(format!("cacerts not found under {}", java_home.display())),
        }
    }

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        let keystore = location.file();

        // Re-importing under an existing alias fails, so replace it.
        env.run_removal(&Self::command(keystore, ["-delete"]), alias_missing)?;

        let ca_path = env.ca.path_arg();
        env.run_checked(&Self::command(
            keystore,
            ["-importcert", "-noprompt", "-file", ca_path.as_str()],
        ))?;
        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.run_removal(&Self::command(location.file(), ["-delete"]), alias_missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truststore::testing::{ScriptedRunner, ca_file, env};
    use std::fs;
    use tempfile::TempDir;

    fn fake_jdk(root: &Path) -> PathBuf {
        let java_home = root.join("jdk");
        fs::create_dir_all(java_home.join("bin")).unwrap();
        fs::create_dir_all(java_home.join("lib/security")).unwrap();
        fs::write(JavaKeystore::keytool(&java_home), b"").unwrap();
        fs::write(java_home.join("lib/security/cacerts"), b"").unwrap();
        java_home
    }

    #[test]
    fn discovery_needs_java_home() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new();

        assert_eq!(
            JavaKeystore.discover(&env(&runner, &ca)),
            Discovery::Skip("JAVA_HOME not set".to_string())
        );
    }

    #[test]
    fn discovery_finds_modern_and_legacy_layouts() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new();

        let java_home = fake_jdk(dir.path());
        let mut trust_env = env(&runner, &ca);
        trust_env.java_home = Some(java_home.clone());
        assert_eq!(
            JavaKeystore.discover(&trust_env),
            Discovery::Found(vec![Location::path(java_home.join("lib/security/cacerts"))])
        );

        fs::remove_file(java_home.join("lib/security/cacerts")).unwrap();
        fs::create_dir_all(java_home.join("jre/lib/security")).unwrap();
        fs::write(java_home.join("jre/lib/security/cacerts"), b"").unwrap();
        assert_eq!(
            JavaKeystore.discover(&trust_env),
            Discovery::Found(vec![Location::path(
                java_home.join("jre/lib/security/cacerts")
            )])
        );
    }

    #[test]
    fn install_replaces_alias_then_imports() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let java_home = fake_jdk(dir.path());
        let keystore = java_home.join("lib/security/cacerts");
        let runner = ScriptedRunner::new().respond(
            "-delete",
            1,
            "keytool error: java.lang.Exception: Alias <apprecert-rootCA> does not exist",
            "",
        );
        let mut trust_env = env(&runner, &ca);
        trust_env.java_home = Some(java_home.clone());

        let change = JavaKeystore
            .install(&trust_env, &Location::path(&keystore))
            .unwrap();
        assert_eq!(change, Change::Applied);

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with(&JavaKeystore::keytool(&java_home).display().to_string()));
        assert!(calls[0].contains("-delete -alias apprecert-rootCA"));
        assert!(calls[1].contains(&format!(
            "-importcert -noprompt -file {} -alias apprecert-rootCA -keystore {} -storepass changeit",
            ca.path.display(),
            keystore.display()
        )));
        assert!(!calls[1].starts_with("sudo "), "writable keystore needs no sudo");
    }

    #[test]
    fn uninstall_of_missing_alias_succeeds() {
        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let java_home = fake_jdk(dir.path());
        let runner = ScriptedRunner::new().respond(
            "-delete",
            1,
            "keytool error: java.lang.Exception: Alias <apprecert-rootCA> does not exist",
            "",
        );
        let mut trust_env = env(&runner, &ca);
        trust_env.java_home = Some(java_home.clone());

        let change = JavaKeystore
            .uninstall(
                &trust_env,
                &Location::path(java_home.join("lib/security/cacerts")),
            )
            .unwrap();
        assert_eq!(change, Change::NotPresent);
    }
}
