//! `NODE_EXTRA_CA_CERTS` for Node.js processes started by this one.
//!
//! The variable only affects this process and its children; the shell that
//! launched apprecert is unchanged.

use std::ffi::OsString;

use super::{Change, Discovery, Location, TargetKind, TrustEnv, TrustError, TrustTarget};

pub const NODE_EXTRA_CA_CERTS: &str = "NODE_EXTRA_CA_CERTS";

pub struct NodeExtraCerts;

impl TrustTarget for NodeExtraCerts {
    fn kind(&self) -> TargetKind {
        TargetKind::NodeJs
    }

    fn discover(&self, _env: &TrustEnv) -> Discovery {
        Discovery::Found(vec![Location::named(NODE_EXTRA_CA_CERTS)])
    }

    fn install(&self, env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        let value = OsString::from(&env.ca.path);
        if std::env::var_os(NODE_EXTRA_CA_CERTS).as_ref() == Some(&value) {
            return Ok(Change::AlreadyPresent);
        }

        // SAFETY: trust targets run sequentially on the main thread and nothing
        // else reads the environment meanwhile.
        unsafe { std::env::set_var(NODE_EXTRA_CA_CERTS, &value) };
        Ok(Change::Applied)
    }

    fn uninstall(&self, _env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        if std::env::var_os(NODE_EXTRA_CA_CERTS).is_none() {
            return Ok(Change::NotPresent);
        }

        // SAFETY: see `install`.
        unsafe { std::env::remove_var(NODE_EXTRA_CA_CERTS) };
        Ok(Change::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::test_env_lock;
    use crate::truststore::testing::{ScriptedRunner, ca_file, env};
    use tempfile::TempDir;

    #[test]
    fn install_and_uninstall_toggle_variable() {
        let _lock = test_env_lock();
        let previous = std::env::var_os(NODE_EXTRA_CA_CERTS);
        unsafe { std::env::remove_var(NODE_EXTRA_CA_CERTS) };

        let dir = TempDir::new().unwrap();
        let ca = ca_file(dir.path());
        let runner = ScriptedRunner::new();
        let trust_env = env(&runner, &ca);
        let location = Location::named(NODE_EXTRA_CA_CERTS);

        let first = NodeExtraCerts.install(&trust_env, &location).unwrap();
        let value = std::env::var_os(NODE_EXTRA_CA_CERTS);
        let second = NodeExtraCerts.install(&trust_env, &location).unwrap();
        let removed = NodeExtraCerts.uninstall(&trust_env, &location).unwrap();
        let again = NodeExtraCerts.uninstall(&trust_env, &location).unwrap();

        match previous {
            Some(v) => unsafe { std::env::set_var(NODE_EXTRA_CA_CERTS, v) },
            None => unsafe { std::env::remove_var(NODE_EXTRA_CA_CERTS) },
        }

        assert_eq!(first, Change::Applied);
        assert_eq!(value, Some(OsString::from(&ca.path)));
        assert_eq!(second, Change::AlreadyPresent);
        assert_eq!(removed, Change::Applied);
        assert_eq!(again, Change::NotPresent);
        assert!(runner.calls().is_empty());
    }
}
