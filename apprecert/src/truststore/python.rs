//! The CA bundle shipped by Python's `certifi` package.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use super::{Change, Discovery, Location, TargetKind, ToolCommand, TrustEnv, TrustError, TrustTarget};

const INTERPRETERS: &[&str] = &["python3", "python"];

pub struct PythonCertifi;

impl PythonCertifi {
    fn bundle_path(env: &TrustEnv, interpreter: &str) -> Option<PathBuf> {
        let output = env
            .runner
            .run(&ToolCommand::new(interpreter, ["-m", "certifi"]))
            .ok()
            .filter(|output| output.success())?;
        let path = PathBuf::from(output.stdout.trim());
        path.is_file().then_some(path)
    }
}

impl TrustTarget for PythonCertifi {
    fn kind(&self) -> TargetKind {
        TargetKind::Python
    }

    fn discover(&self, env: &TrustEnv) -> Discovery {
        let mut found_interpreter = false;
        for interpreter in INTERPRETERS {
            if env.runner.find_program(interpreter).is_none() {
                continue;
            }
            found_interpreter = true;
            if let Some(bundle) = Self::bundle_path(env, interpreter) {
                return Discovery::Found(vec![Location::path(bundle)]);
            }
        }

        if found_interpreter {
            Discovery::skip("certifi bundle not found")
        } else {
            Discovery::skip("python not found on PATH")
        }
    }

    fn install(&self, env: &TrustEnv, location: &Location) -> Result<Change, TrustError> {
        env.ca.ensure_exists()?;
        let bundle = location.file();

        let existing =
            fs::read_to_string(bundle).map_err(|e| TrustError::FileRead(bundle.to_path_buf(), e))?;
        let ca_pem = env.ca.pem.trim_end();
        if existing.contains(ca_pem) {
            return Ok(Change::AlreadyPresent);
        }

        let mut addition = String::new();
        if !existing.is_empty() && !existing.ends_with('\n') {
            addition.push('\n');
        }
        addition.push_str(ca_pem);
        addition.push('\n');

        OpenOptions::new()
            .append(true)
            .open(bundle)
            .and_then(|mut file| file.write_all(addition.as_bytes()))
            .map_err(|e| TrustError::FileWrite(bundle.to_path_buf(), e))?;

        tracing::debug!(bundle = %bundle.display(), "Appended CA to certifi bundle");
        Ok(Change::Applied)
    }

    fn uninstall(&self, _env: &TrustEnv, _location: &Location) -> Result<Change, TrustError> {
        Ok(Change::NotPresent)
    }

    fn supports_uninstall(&self) -> bool {
        false
    }
}
