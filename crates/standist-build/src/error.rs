use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    // Manifest errors
    #[error("Failed to parse dist manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    #[error("Invalid dist manifest: {message}")]
    InvalidManifest { message: String },

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Fetch errors
    #[error("Download failed for {package}: {reason}")]
    DownloadFailed { package: String, reason: String },

    #[error("Checksum mismatch for {package}")]
    ChecksumMismatch { package: String },

    // Archive errors
    #[error("Unknown archive type: {0}")]
    UnknownArchive(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Packaging failed: {0}")]
    Packaging(String),

    // Ordering errors
    #[error("Dependency cycle among packages: {cycle}")]
    CyclicDependency { cycle: String },

    #[error("No unpacked directory found for package {name}")]
    MissingPackageDir { name: String },

    #[error("Unexpected entry in staging directory: {0}")]
    UnexpectedStagingEntry(String),

    // Submodule errors
    #[error("Submodule not present: {path}")]
    SubmoduleMissing { path: String },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    // Provisioning errors
    #[error("Provisioning failed: {0}")]
    Provision(String),

    #[error("Command {command} exited with status {status}")]
    CommandFailed { command: String, status: i32 },
}

pub type Result<T> = std::result::Result<T, BuildError>;
