//! Builds the project's own source distribution.
//!
//! The project tree is packaged as `<name>-<version>.tar.gz` directly into
//! the staging directory, with every entry under a single
//! `<name>-<version>/` top-level directory, mirroring the layout of the
//! fetched dependency tarballs.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use walkdir::WalkDir;

use crate::Result;

/// Directory names never included in a source distribution.
const SKIP_DIRS: &[&str] = &[".git", "target"];

/// Package the project tree rooted at `project_root` into
/// `staging/<name>-<version>.tar.gz`. The staging directory itself and any
/// `extra_excludes` paths are left out of the archive.
pub fn build_sdist(
    project_root: &Path,
    name: &str,
    version: &str,
    staging: &Path,
    extra_excludes: &[&Path],
) -> Result<PathBuf> {
    let top = format!("{}-{}", name, version);
    let out_path = staging.join(format!("{}.tar.gz", top));

    let file = File::create(&out_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let walker = WalkDir::new(project_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e.path(), staging, extra_excludes));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry.path().strip_prefix(project_root).unwrap_or(entry.path());
        let archive_name = Path::new(&top).join(rel);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            builder.append_dir(&archive_name, entry.path())?;
        } else if file_type.is_file() {
            builder.append_path_with_name(entry.path(), &archive_name)?;
        } else {
            debug!("skipping non-regular entry {}", entry.path().display());
        }
    }

    let encoder = builder.into_inner()?;
    encoder.finish()?;
    debug!("wrote source distribution {}", out_path.display());
    Ok(out_path)
}

fn is_excluded(path: &Path, staging: &Path, extra: &[&Path]) -> bool {
    if path == staging || extra.iter().any(|e| *e == path) {
        return true;
    }
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => SKIP_DIRS.contains(&name),
        None => false,
    }
}
