use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Environment variable overriding the CA root directory.
pub const CAROOT_ENV: &str = "CAROOT";

/// Get the CA root directory.
///
/// - `CAROOT` wins when set to a non-empty value.
/// - Otherwise the per-user data directory for this platform.
pub fn caroot_dir() -> Result<PathBuf, std::io::Error> {
    if let Ok(v) = std::env::var(CAROOT_ENV)
        && !v.trim().is_empty()
    {
        return Ok(PathBuf::from(v));
    }

    let data_dir = dirs::data_local_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine local data directory",
        )
    })?;

    Ok(default_caroot_in(&data_dir))
}

/// Default CA root under a platform data directory.
///
/// macOS and Windows use a capitalized application folder, everything else
/// the lowercase name.
pub fn default_caroot_in(data_dir: &Path) -> PathBuf {
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        data_dir.join("Apprecert")
    } else {
        data_dir.join("apprecert")
    }
}

/// Current user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

#[cfg(test)]
pub(crate) fn test_env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
