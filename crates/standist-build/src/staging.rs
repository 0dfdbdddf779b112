//! Staging directory lifecycle.
//!
//! The staging directory is owned by exactly one build run. `prepare`
//! removes whatever a previous or interrupted run left behind (the
//! directory and the output archive) before creating it fresh; `discard`
//! tears it down once the archive is written.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::Result;

#[derive(Debug)]
pub struct Staging {
    path: PathBuf,
}

impl Staging {
    /// Delete any stale staging directory and previous output archive, then
    /// create the staging directory fresh.
    pub fn prepare(path: &Path, previous_output: &Path) -> Result<Self> {
        if path.exists() {
            debug!("removing stale staging directory {}", path.display());
            fs::remove_dir_all(path)?;
        }
        if previous_output.exists() {
            debug!("removing previous archive {}", previous_output.display());
            fs::remove_file(previous_output)?;
        }
        fs::create_dir_all(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn discard(self) -> Result<()> {
        fs::remove_dir_all(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_creates_empty_directory() {
        let root = TempDir::new().unwrap();
        let staging_path = root.path().join("stage");
        let output = root.path().join("out.zip");

        let staging = Staging::prepare(&staging_path, &output).unwrap();
        assert!(staging.path().is_dir());
        assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_removes_stale_contents_and_archive() {
        let root = TempDir::new().unwrap();
        let staging_path = root.path().join("stage");
        let output = root.path().join("out.zip");

        fs::create_dir_all(staging_path.join("leftover-dir")).unwrap();
        fs::write(staging_path.join("leftover.tar.gz"), b"stale").unwrap();
        fs::write(&output, b"old archive").unwrap();

        let staging = Staging::prepare(&staging_path, &output).unwrap();
        assert_eq!(fs::read_dir(staging.path()).unwrap().count(), 0);
        assert!(!output.exists());
    }

    #[test]
    fn test_discard_removes_directory() {
        let root = TempDir::new().unwrap();
        let staging_path = root.path().join("stage");
        let output = root.path().join("out.zip");

        let staging = Staging::prepare(&staging_path, &output).unwrap();
        fs::write(staging.path().join("file"), b"x").unwrap();
        staging.discard().unwrap();
        assert!(!staging_path.exists());
    }
}
