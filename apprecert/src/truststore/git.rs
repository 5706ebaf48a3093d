use super::{Change, Discovery, Location, TargetKind, ToolCommand, TrustEnv, TrustError, TrustTarget};

const CA_INFO_KEY: &str = "http.sslCAInfo";

/// `git config --global --unset` exits with 5 when the key is not set.
const UNSET_MISSING_KEY: i32 = 5;

/// Git's global `http.sslCAInfo` setting.
pub struct GitConfig;

impl TrustTarget for GitConfig {
    fn kind(&self) -> TargetKind {
        TargetKind::Git
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        if env.runner.find_program("git").is_none() {
            return Discovery::skip("git not found on PATH");
        }
        Discovery::Found(vec![Location::named(format!("git config --global {CA_INFO_KEY}"))])
    }

    fn install(&self, env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        env.run_checked(&ToolCommand::new(
            "git",
            [
                "config",
                "--global",
                CA_INFO_KEY,
                env.ca.path_arg().as_str(),
            ],
        ))?;
        Ok(Change::Applied)
    }

    fn uninstall(&self, env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        env.run_removal(
            &ToolCommand::new("git", ["config", "--global", "--unset", CA_INFO_KEY]),
            |out| out.status == Some(UNSET_MISSING_KEY),
        )
    }
}
