//! Resolves manifest packages into download links.
//!
//! One link per package, in manifest declaration order. The URL scheme is
//! the first-letter source layout:
//! `{base}/{n[0]}/{name}/{name}-{version}.tar.gz`. No network validation
//! happens here.

use url::Url;

use crate::manifest::Manifest;
use crate::{BuildError, Result};

/// An immutable (name, version, url) triple describing one tarball to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyLink {
    pub name: String,
    pub version: String,
    pub url: String,
    pub checksum: Option<String>,
}

impl DependencyLink {
    /// Filename the fetcher writes into staging, taken from the final URL
    /// path segment.
    pub fn filename(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

/// Produce the ordered link sequence for every package in the manifest.
pub fn resolve_links(manifest: &Manifest) -> Result<Vec<DependencyLink>> {
    let base = manifest.base_url.trim_end_matches('/');
    let mut links = Vec::with_capacity(manifest.packages.len());

    for (name, spec) in &manifest.packages {
        let first = name.chars().next().ok_or_else(|| BuildError::InvalidManifest {
            message: "empty package name".to_string(),
        })?;
        let raw = format!(
            "{base}/{first}/{name}/{name}-{version}.tar.gz",
            base = base,
            first = first,
            name = name,
            version = spec.version
        );
        let url = Url::parse(&raw).map_err(|e| BuildError::InvalidManifest {
            message: format!("cannot build link for {}: {}", name, e),
        })?;
        links.push(DependencyLink {
            name: name.clone(),
            version: spec.version.clone(),
            url: url.into(),
            checksum: spec.checksum.clone(),
        });
    }

    Ok(links)
}
