//! Local filesystem access for credential persistence.

use std::io::Write;
use std::path::Path;

use crate::error::FsError;

/// Owner read/write only.
pub const CREDENTIALS_MODE: u32 = 0o600;

/// Filesystem operations needed to save credentials.
pub trait LocalFs: Send + Sync {
    /// Create a directory and its parents. Existing directories are fine.
    ///
    /// # Errors
    /// Returns [`FsError::CreateDir`] on failure.
    fn ensure_dir(&self, path: &Path) -> Result<(), FsError>;

    /// Create or truncate a file and write `contents` with the given mode.
    ///
    /// # Errors
    /// Returns [`FsError::WriteFile`] on failure.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<(), FsError>;
}

/// [`LocalFs`] on top of `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFs;

impl LocalFs for StdFs {
    fn ensure_dir(&self, path: &Path) -> Result<(), FsError> {
        std::fs::create_dir_all(path).map_err(|source| FsError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<(), FsError> {
        let wrap = |source| FsError::WriteFile {
            path: path.to_path_buf(),
            source,
        };

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }

        let mut file = options.open(path).map_err(wrap)?;
        file.write_all(contents).map_err(wrap)?;

        // An existing file keeps its old mode through open().
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(wrap)?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(())
    }
}
