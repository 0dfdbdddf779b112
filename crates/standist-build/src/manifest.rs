//! Dist manifest loading and validation.
//!
//! The manifest (`dist.json`) is the single static input of a build: the
//! project's own distribution identity, the third-party packages to bundle,
//! the submodule layout, and the installer command. Package order in the
//! file is preserved and used as the deterministic tie-break when computing
//! install order.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumKind;
use crate::{BuildError, Result};

/// Default root of the source-tarball URL scheme.
pub const DEFAULT_BASE_URL: &str = "https://pypi.python.org/packages/source";

/// Default staging directory, relative to the project root.
pub const DEFAULT_STAGING_DIR: &str = "stand_alone_dist";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Manifest {
    /// The project's own distribution identity.
    pub project: ProjectSection,

    /// Root URL for dependency tarball links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Third-party packages to bundle, in declaration order.
    #[serde(default)]
    pub packages: IndexMap<String, PackageSpec>,

    /// Scratch directory for one build run, relative to the project root.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Output archive path, relative to the project root.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Submodule subtrees consumed by the project.
    #[serde(default)]
    pub submodules: Vec<SubmoduleSpec>,

    /// Command invoked by the install target, as argv.
    #[serde(default = "default_installer")]
    pub installer: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectSection {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageSpec {
    pub version: String,

    /// Manifest packages that must be installed before this one.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Optional hex digest of the tarball; the algorithm is selected by the
    /// digest length (md5/sha1/sha256/sha384/sha512).
    #[serde(default)]
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmoduleSpec {
    /// Submodule path as recorded in .gitmodules.
    pub path: String,

    /// Subtree inside the submodule worktree to copy ("." for the whole tree).
    #[serde(default = "default_subtree")]
    pub subtree: PathBuf,

    /// Consumption location inside the project.
    pub dest: PathBuf,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_DIR)
}

fn default_installer() -> Vec<String> {
    vec!["pip".to_string(), "install".to_string(), ".".to_string()]
}

fn default_subtree() -> PathBuf {
    PathBuf::from(".")
}

impl Manifest {
    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a manifest from a JSON string.
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: Manifest = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Output archive path, relative to the project root unless overridden
    /// with an absolute path.
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => PathBuf::from(format!(
                "{}-{}-standalone.zip",
                self.project.name, self.project.version
            )),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !valid_name(&self.project.name) {
            return Err(invalid(format!(
                "invalid project name {:?}",
                self.project.name
            )));
        }
        if self.project.version.trim().is_empty() {
            return Err(invalid("project version is empty"));
        }
        if self.packages.contains_key(&self.project.name) {
            return Err(invalid(format!(
                "project name {} collides with a package",
                self.project.name
            )));
        }
        for (name, spec) in &self.packages {
            if !valid_name(name) {
                return Err(invalid(format!("invalid package name {:?}", name)));
            }
            if spec.version.trim().is_empty() {
                return Err(invalid(format!("package {} has an empty version", name)));
            }
            if let Some(checksum) = &spec.checksum {
                let well_formed = ChecksumKind::from_hex_length(checksum.len()).is_some()
                    && checksum.chars().all(|c| c.is_ascii_hexdigit());
                if !well_formed {
                    return Err(invalid(format!("malformed checksum for {}", name)));
                }
            }
            for dep in &spec.requires {
                if dep == name {
                    return Err(invalid(format!("package {} requires itself", name)));
                }
                if !self.packages.contains_key(dep) {
                    return Err(invalid(format!(
                        "package {} requires unknown package {}",
                        name, dep
                    )));
                }
            }
        }
        if self.installer.is_empty() {
            return Err(invalid("installer command is empty"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> BuildError {
    BuildError::InvalidManifest {
        message: message.into(),
    }
}

/// Package and project names become URL segments and directory-name
/// prefixes, so they are restricted to a conservative character set.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(extra: &str) -> String {
        format!(
            r#"{{
                "project": {{ "name": "chartproj", "version": "3.1.0" }},
                "packages": {{
                    "alpha": {{ "version": "1.0" }},
                    "beta": {{ "version": "2.0", "requires": ["alpha"] }}
                }}{}
            }}"#,
            extra
        )
    }

    #[test]
    fn test_parse_minimal() {
        let manifest = Manifest::from_json(&minimal("")).unwrap();
        assert_eq!(manifest.project.name, "chartproj");
        assert_eq!(manifest.base_url, DEFAULT_BASE_URL);
        assert_eq!(manifest.staging_dir, PathBuf::from(DEFAULT_STAGING_DIR));
        assert_eq!(manifest.installer, vec!["pip", "install", "."]);
        assert_eq!(manifest.packages.len(), 2);
        assert_eq!(manifest.packages["beta"].requires, vec!["alpha"]);
    }

    #[test]
    fn test_package_order_preserved() {
        let text = r#"{
            "project": { "name": "p", "version": "1" },
            "packages": {
                "zeta": { "version": "1" },
                "alpha": { "version": "1" },
                "mid": { "version": "1" }
            }
        }"#;
        let manifest = Manifest::from_json(text).unwrap();
        let names: Vec<&str> = manifest.packages.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_default_output_path() {
        let manifest = Manifest::from_json(&minimal("")).unwrap();
        assert_eq!(
            manifest.output_path(),
            PathBuf::from("chartproj-3.1.0-standalone.zip")
        );
    }

    #[test]
    fn test_unknown_require_rejected() {
        let text = r#"{
            "project": { "name": "p", "version": "1" },
            "packages": { "a": { "version": "1", "requires": ["ghost"] } }
        }"#;
        let err = Manifest::from_json(text).unwrap_err();
        assert!(matches!(err, BuildError::InvalidManifest { .. }));
    }

    #[test]
    fn test_self_require_rejected() {
        let text = r#"{
            "project": { "name": "p", "version": "1" },
            "packages": { "a": { "version": "1", "requires": ["a"] } }
        }"#;
        assert!(Manifest::from_json(text).is_err());
    }

    #[test]
    fn test_project_package_collision_rejected() {
        let text = r#"{
            "project": { "name": "a", "version": "1" },
            "packages": { "a": { "version": "1" } }
        }"#;
        assert!(Manifest::from_json(text).is_err());
    }

    #[test]
    fn test_bad_name_rejected() {
        let text = r#"{
            "project": { "name": "p", "version": "1" },
            "packages": { "../etc": { "version": "1" } }
        }"#;
        assert!(Manifest::from_json(text).is_err());
    }

    #[test]
    fn test_malformed_checksum_rejected() {
        let text = r#"{
            "project": { "name": "p", "version": "1" },
            "packages": { "a": { "version": "1", "checksum": "zz" } }
        }"#;
        assert!(Manifest::from_json(text).is_err());
    }

    #[test]
    fn test_valid_checksum_accepted() {
        let sum = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
        let text = format!(
            r#"{{
                "project": {{ "name": "p", "version": "1" }},
                "packages": {{ "a": {{ "version": "1", "checksum": "{}" }} }}
            }}"#,
            sum
        );
        let manifest = Manifest::from_json(&text).unwrap();
        assert_eq!(manifest.packages["a"].checksum.as_deref(), Some(sum));
    }
}
