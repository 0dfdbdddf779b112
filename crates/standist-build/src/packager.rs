//! Compresses the staging directory into the distributable archive.
//!
//! Entries are written in sorted path order with fixed modification times,
//! so two runs over identical trees produce byte-identical archives. The
//! staging directory is removed once the archive is written.

use std::fs::File;
use std::io;
use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::staging::Staging;
use crate::{BuildError, Result};

/// Write the archive, then tear the staging directory down.
pub fn package_and_discard(staging: Staging, output: &Path) -> Result<()> {
    write_archive(staging.path(), output)?;
    staging.discard()?;
    info!("wrote {}", output.display());
    Ok(())
}

/// Zip the tree under `root` into `output`, deterministically.
pub fn write_archive(root: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(output)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let name = rel.to_string_lossy().replace('\\', "/");

        let file_type = entry.file_type();
        if file_type.is_dir() {
            zip.add_directory(name, options)
                .map_err(|e| BuildError::Packaging(e.to_string()))?;
        } else if file_type.is_file() {
            let opts = match unix_mode(entry.path()) {
                Some(mode) => options.unix_permissions(mode),
                None => options,
            };
            zip.start_file(name, opts)
                .map_err(|e| BuildError::Packaging(e.to_string()))?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
        } else {
            debug!("skipping non-regular entry {}", entry.path().display());
        }
    }

    zip.finish().map_err(|e| BuildError::Packaging(e.to_string()))?;
    Ok(())
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .ok()
        .map(|m| m.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn unix_mode(_path: &Path) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn populate(root: &Path) {
        fs::create_dir_all(root.join("0_alpha-1.0")).unwrap();
        fs::write(root.join("0_alpha-1.0/alpha.py"), b"a = 1").unwrap();
        fs::create_dir_all(root.join("1_beta-2.0/data")).unwrap();
        fs::write(root.join("1_beta-2.0/beta.py"), b"b = 2").unwrap();
        fs::write(root.join("1_beta-2.0/data/table.csv"), b"1,2").unwrap();
    }

    fn archive_names(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn test_archive_holds_full_tree() {
        let root = TempDir::new().unwrap();
        let tree = root.path().join("stage");
        fs::create_dir_all(&tree).unwrap();
        populate(&tree);
        let output = root.path().join("out.zip");

        write_archive(&tree, &output).unwrap();

        let names = archive_names(&output);
        assert!(names.contains(&"0_alpha-1.0/alpha.py".to_string()));
        assert!(names.contains(&"1_beta-2.0/data/table.csv".to_string()));
    }

    #[test]
    fn test_two_runs_are_byte_identical() {
        let root = TempDir::new().unwrap();
        let tree = root.path().join("stage");
        fs::create_dir_all(&tree).unwrap();
        populate(&tree);
        let first = root.path().join("first.zip");
        let second = root.path().join("second.zip");

        write_archive(&tree, &first).unwrap();
        write_archive(&tree, &second).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn test_package_and_discard_removes_staging() {
        let root = TempDir::new().unwrap();
        let staging_path = root.path().join("stage");
        let output = root.path().join("dist/bundle.zip");

        let staging = Staging::prepare(&staging_path, &output).unwrap();
        populate(staging.path());

        package_and_discard(staging, &output).unwrap();

        assert!(output.is_file());
        assert!(!staging_path.exists());
    }
}
