//! Run directory scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigResult, ExternalError};

/// Subdirectories every run directory needs.
pub const RUN_SUBDIRS: [&str; 3] = ["input", "output", "restart"];

/// Ensures `input/`, `output/` and `restart/` exist below `base`.
///
/// Returns `base`. Existing directories are left alone.
///
/// # Errors
///
/// `ExternalError::FileWrite` if `base` does not exist or a subdirectory
/// cannot be created.
pub fn create_subdirs(base: impl AsRef<Path>) -> ConfigResult<PathBuf> {
    let base = base.as_ref();
    if !base.is_dir() {
        return Err(ExternalError::FileWrite {
            path: base.to_path_buf(),
            message: "run directory does not exist".to_string(),
        }
        .into());
    }

    for name in RUN_SUBDIRS {
        let dir = base.join(name);
        if dir.is_dir() {
            continue;
        }
        fs::create_dir_all(&dir).map_err(|e| ExternalError::FileWrite {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        tracing::info!(path = %dir.display(), "created run subdirectory");
    }
    Ok(base.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use tempfile::tempdir;

    #[test]
    fn test_creates_missing_subdirs() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("output")).unwrap();
        fs::write(dir.path().join("output").join("keep.txt"), "x").unwrap();

        let base = create_subdirs(dir.path()).unwrap();
        assert_eq!(base, dir.path());
        for name in RUN_SUBDIRS {
            assert!(dir.path().join(name).is_dir(), "{name}");
        }
        assert!(dir.path().join("output/keep.txt").exists());
    }

    #[test]
    fn test_missing_base() {
        let dir = tempdir().unwrap();
        let err = create_subdirs(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::External(ExternalError::FileWrite { .. })));
    }
}
