//! Machine profile installation after a successful setup.

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Default profile file shipped alongside the binary.
pub const DEFAULT_PROFILE_FILE: &str = "shapeoko.json";

/// Default destination subdirectory under the local app-data directory.
pub const DEFAULT_DEST_SUBDIR: &str = "Carbide 3D/CarbideMotion6";

/// Copy the profile file into the destination directory, creating it first.
pub fn install_profile(file_name: &str, source_dir: &Path, dest_dir: &Path) -> Result<()> {
    let source = source_dir.join(file_name);
    let dest = dest_dir.join(file_name);

    fs::create_dir_all(dest_dir)
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;

    info!("copying '{file_name}' to '{}'", dest_dir.display());
    fs::copy(&source, &dest)
        .with_context(|| format!("failed to copy {}", source.display()))?;

    Ok(())
}

/// Destination directory for the profile: local app-data plus `subdir`.
pub fn default_dest_dir(subdir: &str) -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| {
        dirs.data_local_dir()
            .join(subdir)
    })
}

/// Directory the profile file ships in: next to the executable, with the
/// working directory as fallback.
pub fn profile_source_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| {
            exe.parent()
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_copies_and_creates_destination() {
        let source = tempfile::tempdir().unwrap();
        let dest_root = tempfile::tempdir().unwrap();
        let dest = dest_root
            .path()
            .join("Carbide 3D")
            .join("CarbideMotion6");

        fs::write(source.path().join("shapeoko.json"), b"{\"name\":\"shapeoko\"}").unwrap();

        install_profile("shapeoko.json", source.path(), &dest).unwrap();

        let copied = fs::read(dest.join("shapeoko.json")).unwrap();
        assert_eq!(copied, b"{\"name\":\"shapeoko\"}");
    }

    #[test]
    fn test_install_missing_source_fails() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        let err = install_profile("missing.json", source.path(), dest.path()).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_default_dest_dir_appends_subdir() {
        if let Some(dir) = default_dest_dir(DEFAULT_DEST_SUBDIR) {
            assert!(dir.ends_with("Carbide 3D/CarbideMotion6"));
        }
    }
}
