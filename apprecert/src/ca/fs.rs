//! Atomic file persistence for CA material.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{CaError, Result};

/// Mode for private keys and bundles containing them.
pub const PRIVATE_MODE: u32 = 0o600;
/// Mode for certificates.
pub const PUBLIC_MODE: u32 = 0o644;

/// Write `contents` to `path` so that readers see either the old file, the new
/// file, or nothing. The data lands in a sibling temp file which is renamed
/// over the destination.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let tmp = temp_sibling(path);
    let _ = fs::remove_file(&tmp);

    let result = write_new(&tmp, contents, mode).and_then(|()| fs::rename(&tmp, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(CaError::PersistenceFailed {
            path: path.to_path_buf(),
            source,
        });
    }

    tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
    Ok(())
}

/// Create the CA root directory, owner-only on unix.
pub fn ensure_root_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| CaError::PersistenceFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(|source| {
            CaError::PersistenceFailed {
                path: dir.to_path_buf(),
                source,
            }
        })?;
    }

    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp-{}", std::process::id()))
}

fn write_new(path: &Path, contents: &[u8], mode: u32) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rootCA.pem");

        write_atomic(&path, b"first", PUBLIC_MODE).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        write_atomic(&path, b"second", PUBLIC_MODE).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn write_atomic_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("example.test-key.pem");
        write_atomic(&path, b"key", PRIVATE_MODE).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["example.test-key.pem".to_string()]);
    }

    #[test]
    fn write_atomic_into_missing_directory_fails_without_residue() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("rootCA.pem");

        let err = write_atomic(&path, b"data", PUBLIC_MODE).unwrap_err();
        assert!(matches!(err, CaError::PersistenceFailed { .. }));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn private_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rootCA-key.pem");
        write_atomic(&path, b"secret", PRIVATE_MODE).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn ensure_root_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path().join("caroot");
        ensure_root_dir(&root).unwrap();

        let mode = fs::metadata(&root).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }
}
