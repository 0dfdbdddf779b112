//! Digest verification for fetched tarballs.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fs::File;
use std::io;
use std::path::Path;

use crate::Result;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl ChecksumKind {
    /// Detect the algorithm from the length of a hex digest string.
    pub fn from_hex_length(len: usize) -> Option<Self> {
        match len {
            32 => Some(ChecksumKind::Md5),
            40 => Some(ChecksumKind::Sha1),
            64 => Some(ChecksumKind::Sha256),
            96 => Some(ChecksumKind::Sha384),
            128 => Some(ChecksumKind::Sha512),
            _ => None,
        }
    }
}

/// Compare a file's digest against an expected hex string.
pub fn verify_file(path: &Path, expected: &str, kind: ChecksumKind) -> Result<bool> {
    let actual = match kind {
        ChecksumKind::Md5 => hex_digest::<Md5>(path)?,
        ChecksumKind::Sha1 => hex_digest::<Sha1>(path)?,
        ChecksumKind::Sha256 => hex_digest::<Sha256>(path)?,
        ChecksumKind::Sha384 => hex_digest::<Sha384>(path)?,
        ChecksumKind::Sha512 => hex_digest::<Sha512>(path)?,
    };
    Ok(actual.eq_ignore_ascii_case(expected))
}

/// SHA-256 digest of a file as lowercase hex.
pub fn file_sha256(path: &Path) -> Result<String> {
    hex_digest::<Sha256>(path)
}

fn hex_digest<D: Digest + io::Write>(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    io::copy(&mut file, &mut hasher)?;
    let digest = hasher.finalize();
    Ok(digest.iter().map(|byte| format!("{:02x}", byte)).collect())
}
