//! The Debian-style CA bundle that container base images build from.

use std::path::Path;

use super::{Change, Discovery, Location, TargetKind, ToolCommand, TrustEnv, TrustError, TrustTarget};

const BUNDLE_DESTINATION: &str = "/usr/local/share/ca-certificates/rootCA.crt";
const REFRESH_TOOL: &str = "update-ca-certificates";

pub struct DockerBundle;

impl DockerBundle {
    fn refresh(env: &TrustEnv) -> Result<(), TrustError> {
        env.run_checked(&ToolCommand::new(REFRESH_TOOL, Vec::<String>::new()).privileged())?;
        Ok(())
    }
}

impl TrustTarget for DockerBundle {
    fn kind(&self) -> TargetKind {
        TargetKind::Docker
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        if env.runner.find_program(REFRESH_TOOL).is_none() {
            return Discovery::skip(format!("{REFRESH_TOOL} not found on PATH"));
        }
        Discovery::Found(vec![Location::path(BUNDLE_DESTINATION)])
    }

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        let destination = location.file().display().to_string();
        env.run_checked(
            &ToolCommand::new("cp", [env.ca.path_arg().as_str(), destination.as_str()])
                .privileged(),
        )?;
        Self::refresh(env)?;
        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        let destination: &Path = location.file();
        let existed = destination.exists();

        let destination_arg = destination.display().to_string();
        env.run_checked(&ToolCommand::new("rm", ["-f", destination_arg.as_str()]).privileged())?;
        // Refresh regardless so a stale bundle entry is dropped too.
        Self::refresh(env)?;

        Ok(if existed {
            Change::Applied
        } else {
            Change::NotPresent
        })
    }
}
