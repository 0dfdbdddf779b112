//! In-place expansion of every archive in the staging directory.
//!
//! Each tarball carries its own `<name>-<version>/` top-level directory, so
//! extraction does no prefix stripping. Consumed archive files are removed,
//! leaving the staging directory holding only unpacked package directories.
//! This stage runs exactly once per build; re-running it over an already
//! expanded staging directory is not supported.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use log::debug;
use xz2::read::XzDecoder;

use crate::{BuildError, Result};

/// Supported archive formats, detected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.to_string_lossy().to_lowercase();

        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(ArchiveKind::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(ArchiveKind::TarXz)
        } else if name.ends_with(".tar") {
            Some(ArchiveKind::Tar)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }
}

/// Expand every regular file in `staging` as an archive, removing each
/// consumed archive afterwards. Returns the top-level directories present
/// when done, sorted by name.
pub fn unpack_staging(staging: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            archives.push(entry.path());
        }
    }
    archives.sort();

    for archive in &archives {
        let kind = ArchiveKind::from_path(archive)
            .ok_or_else(|| BuildError::UnknownArchive(archive.display().to_string()))?;
        debug!("unpacking {}", archive.display());
        extract(archive, staging, kind)?;
        fs::remove_file(archive)?;
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(staging)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Extract one archive into `dest`.
pub fn extract(archive: &Path, dest: &Path, kind: ArchiveKind) -> Result<()> {
    if kind == ArchiveKind::Zip {
        return extract_zip(archive, dest);
    }

    let file = File::open(archive)?;
    let reader = BufReader::new(file);
    match kind {
        ArchiveKind::Tar => extract_tar(reader, dest),
        ArchiveKind::TarGz => extract_tar(GzDecoder::new(reader), dest),
        ArchiveKind::TarBz2 => extract_tar(BzDecoder::new(reader), dest),
        ArchiveKind::TarXz => extract_tar(XzDecoder::new(reader), dest),
        ArchiveKind::Zip => Ok(()),
    }
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    let entries = archive
        .entries()
        .map_err(|e| BuildError::Extraction(format!("failed to read tar: {}", e)))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| BuildError::Extraction(format!("failed to read tar entry: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| BuildError::Extraction(format!("invalid path in tar: {}", e)))?
            .into_owned();
        reject_unsafe(&path)?;
        entry.unpack_in(dest).map_err(|e| {
            BuildError::Extraction(format!("failed to extract {}: {}", path.display(), e))
        })?;
    }

    Ok(())
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| BuildError::Extraction(format!("failed to open zip: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| BuildError::Extraction(format!("failed to read zip entry: {}", e)))?;

        let rel = match entry.enclosed_name() {
            Some(rel) => rel,
            None => {
                return Err(BuildError::Extraction(format!(
                    "unsafe path in zip: {}",
                    entry.name()
                )))
            }
        };
        let outpath = dest.join(rel);

        if entry.is_dir() {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
                }
            }
        }
    }

    Ok(())
}

fn reject_unsafe(path: &Path) -> Result<()> {
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(())
    } else {
        Err(BuildError::Extraction(format!(
            "unsafe path in archive: {}",
            path.display()
        )))
    }
}
