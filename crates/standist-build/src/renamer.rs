//! Renames unpacked package directories so lexical order is install order.
//!
//! Naming scheme: `{rank}_{name}-{version}`, with the rank zero-padded to
//! the decimal width of the highest rank. An installer that walks the
//! staging directory alphabetically then processes every package after all
//! of its dependencies, for any package count.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::manifest::Manifest;
use crate::{BuildError, Result};

/// Splits an unpacked directory name into package name and trailing
/// version (`python-dateutil-2.8.2` -> `python-dateutil`, `2.8.2`).
fn name_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>.+?)-(?P<version>[0-9][0-9A-Za-z.\-+]*)$")
            .expect("hard-coded regex")
    })
}

/// Rename every package directory in `staging` according to the install
/// order. Returns the renamed paths, dependencies first.
pub fn apply_install_order(
    staging: &Path,
    manifest: &Manifest,
    order: &[String],
) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            dirs.push(path);
        } else {
            // a surviving file means the unpack stage did not fully expand
            // the staging area
            return Err(BuildError::UnexpectedStagingEntry(
                path.display().to_string(),
            ));
        }
    }
    dirs.sort();

    let mut dir_for: HashMap<String, PathBuf> = HashMap::new();
    for dir in dirs {
        let dir_name = match dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                return Err(BuildError::UnexpectedStagingEntry(
                    dir.display().to_string(),
                ))
            }
        };
        let base = match name_version_re().captures(&dir_name) {
            Some(caps) => caps["name"].to_string(),
            None => dir_name.clone(),
        };
        let known = base == manifest.project.name || manifest.packages.contains_key(&base);
        if !known || dir_for.insert(base, dir.clone()).is_some() {
            return Err(BuildError::UnexpectedStagingEntry(
                dir.display().to_string(),
            ));
        }
    }

    let width = order.len().saturating_sub(1).to_string().len();
    let mut renamed = Vec::with_capacity(order.len());
    for (rank, name) in order.iter().enumerate() {
        let src = dir_for
            .remove(name)
            .ok_or_else(|| BuildError::MissingPackageDir { name: name.clone() })?;
        let version = if *name == manifest.project.name {
            manifest.project.version.clone()
        } else {
            match manifest.packages.get(name) {
                Some(spec) => spec.version.clone(),
                None => return Err(BuildError::MissingPackageDir { name: name.clone() }),
            }
        };
        let dst = staging.join(format!(
            "{rank:0width$}_{name}-{version}",
            rank = rank,
            width = width,
            name = name,
            version = version
        ));
        debug!("{} -> {}", src.display(), dst.display());
        fs::rename(&src, &dst)?;
        renamed.push(dst);
    }

    Ok(renamed)
}
