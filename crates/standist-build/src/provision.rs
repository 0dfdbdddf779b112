//! CI environment provisioning.
//!
//! Bootstraps a Miniconda installation and a named test environment holding
//! a pinned interpreter plus the pinned rendering-engine package.
//! Provisioning is idempotent: an existing environment is left untouched.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use log::info;

use crate::http::HttpClient;
use crate::{BuildError, Result};

/// Installer for 2.7 interpreters.
pub const PY2_INSTALLER_URL: &str =
    "https://repo.continuum.io/miniconda/Miniconda2-latest-Linux-x86_64.sh";

/// Installer for everything else.
pub const PY3_INSTALLER_URL: &str =
    "https://repo.continuum.io/miniconda/Miniconda3-latest-Linux-x86_64.sh";

/// Rendering engine pinned into the test environment.
pub const RENDERER_SPEC: &str = "plotly-orca=1.2.1";

/// Conda channel providing the renderer.
const RENDERER_CHANNEL: &str = "plotly";

/// Pick the interpreter installer for a `PYTHON_VERSION` value.
pub fn installer_url(python_version: &str) -> &'static str {
    if python_version == "2.7" {
        PY2_INSTALLER_URL
    } else {
        PY3_INSTALLER_URL
    }
}

/// Default install prefix: `~/miniconda`.
pub fn default_prefix() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().join("miniconda"))
}

pub struct Provisioner {
    http: Arc<HttpClient>,
    prefix: PathBuf,
    env_name: String,
    python_version: String,
}

impl Provisioner {
    pub fn new(
        http: Arc<HttpClient>,
        prefix: PathBuf,
        env_name: String,
        python_version: String,
    ) -> Self {
        Self {
            http,
            prefix,
            env_name,
            python_version,
        }
    }

    pub fn env_dir(&self) -> PathBuf {
        self.prefix.join("envs").join(&self.env_name)
    }

    /// Install Miniconda if absent, then create the named environment if
    /// absent. Does nothing when the environment already exists.
    pub async fn provision(&self) -> Result<()> {
        if self.env_dir().exists() {
            info!("environment {} already provisioned", self.env_name);
            return Ok(());
        }

        if !self.prefix.exists() {
            self.install_miniconda().await?;
        }
        self.create_env()?;
        Ok(())
    }

    async fn install_miniconda(&self) -> Result<()> {
        let url = installer_url(&self.python_version);
        let scratch = tempfile::tempdir()?;
        let script = scratch.path().join("miniconda.sh");

        info!("downloading {}", url);
        self.http
            .download(url, &script, None::<fn(u64, u64)>)
            .await
            .map_err(|e| BuildError::Provision(format!("installer download failed: {}", e)))?;

        run_checked(
            Command::new("bash")
                .arg(&script)
                .arg("-b")
                .arg("-p")
                .arg(&self.prefix),
        )
    }

    fn create_env(&self) -> Result<()> {
        let conda = self.prefix.join("bin").join("conda");
        run_checked(
            Command::new(&conda)
                .arg("create")
                .arg("--yes")
                .arg("--name")
                .arg(&self.env_name)
                .arg("--channel")
                .arg(RENDERER_CHANNEL)
                .arg(format!("python={}", self.python_version))
                .arg(RENDERER_SPEC),
        )
    }
}

fn run_checked(command: &mut Command) -> Result<()> {
    let rendered = format!("{:?}", command);
    let status = command
        .status()
        .map_err(|e| BuildError::Provision(format!("{}: {}", rendered, e)))?;
    if status.success() {
        Ok(())
    } else {
        Err(BuildError::CommandFailed {
            command: rendered,
            status: status.code().unwrap_or(-1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_installer_url_selects_python2() {
        assert_eq!(installer_url("2.7"), PY2_INSTALLER_URL);
    }

    #[test]
    fn test_installer_url_defaults_to_python3() {
        assert_eq!(installer_url("3.7"), PY3_INSTALLER_URL);
        assert_eq!(installer_url("3.11"), PY3_INSTALLER_URL);
        assert_eq!(installer_url(""), PY3_INSTALLER_URL);
        assert_eq!(installer_url("2.6"), PY3_INSTALLER_URL);
    }

    #[test]
    fn test_provision_is_idempotent_when_env_exists() {
        let prefix = TempDir::new().unwrap();
        let env_dir = prefix.path().join("envs/standalone-test");
        std::fs::create_dir_all(&env_dir).unwrap();

        let provisioner = Provisioner::new(
            Arc::new(HttpClient::new().unwrap()),
            prefix.path().to_path_buf(),
            "standalone-test".to_string(),
            "3.7".to_string(),
        );

        // no network, no subprocesses: the existing env short-circuits
        tokio_test::block_on(provisioner.provision()).unwrap();
        assert!(env_dir.exists());
    }

    #[test]
    fn test_env_dir_layout() {
        let provisioner = Provisioner::new(
            Arc::new(HttpClient::new().unwrap()),
            PathBuf::from("/opt/miniconda"),
            "ci".to_string(),
            "2.7".to_string(),
        );
        assert_eq!(
            provisioner.env_dir(),
            PathBuf::from("/opt/miniconda/envs/ci")
        );
    }

    #[test]
    fn test_run_checked_reports_exit_status() {
        let err = run_checked(&mut Command::new("false")).unwrap_err();
        match err {
            BuildError::CommandFailed { status, .. } => assert_eq!(status, 1),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }
}
