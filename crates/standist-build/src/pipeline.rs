//! The linear distribution-assembly pipeline.
//!
//! resolve -> fetch -> sdist -> unpack -> rename -> package. Strictly
//! sequential: each stage's postcondition is the next stage's precondition,
//! and the first error aborts the run. The staging path and output path are
//! explicit configuration threaded through every stage; no stage consults
//! ambient working-directory state.

use std::path::PathBuf;
use std::sync::Arc;

use log::info;

use crate::cli::ProgressManager;
use crate::fetcher::TarballFetcher;
use crate::http::HttpClient;
use crate::manifest::Manifest;
use crate::staging::Staging;
use crate::{graph, packager, renamer, resolver, sdist, unpacker, Result};

/// Summary of a completed build.
#[derive(Debug)]
pub struct BuildReport {
    pub archive: PathBuf,
    pub packages: usize,
}

pub struct DistPipeline {
    project_root: PathBuf,
    manifest: Manifest,
    http: Arc<HttpClient>,
    progress: ProgressManager,
    staging_override: Option<PathBuf>,
    output_override: Option<PathBuf>,
}

impl DistPipeline {
    pub fn new(project_root: PathBuf, manifest: Manifest) -> Result<Self> {
        let http = Arc::new(HttpClient::new()?);
        Ok(Self {
            project_root,
            manifest,
            http,
            progress: ProgressManager::new(false),
            staging_override: None,
            output_override: None,
        })
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = ProgressManager::new(enabled);
        self
    }

    pub fn with_staging_dir(mut self, path: PathBuf) -> Self {
        self.staging_override = Some(path);
        self
    }

    pub fn with_output(mut self, path: PathBuf) -> Self {
        self.output_override = Some(path);
        self
    }

    pub fn staging_path(&self) -> PathBuf {
        let dir = self
            .staging_override
            .as_ref()
            .unwrap_or(&self.manifest.staging_dir);
        self.project_root.join(dir)
    }

    pub fn output_path(&self) -> PathBuf {
        let output = match &self.output_override {
            Some(path) => path.clone(),
            None => self.manifest.output_path(),
        };
        self.project_root.join(output)
    }

    /// Run the full assembly pipeline.
    pub async fn run(&self) -> Result<BuildReport> {
        let manifest = &self.manifest;
        manifest.validate()?;

        let links = resolver::resolve_links(manifest)?;
        // install order is computed before any network traffic so a cyclic
        // manifest fails the build immediately
        let order = graph::install_order(manifest)?;

        let staging_path = self.staging_path();
        let output_path = self.output_path();
        let staging = Staging::prepare(&staging_path, &output_path)?;

        info!("fetching {} dependency tarballs", links.len());
        let fetcher = TarballFetcher::new(Arc::clone(&self.http));
        fetcher
            .fetch_all(&links, staging.path(), &self.progress)
            .await?;

        info!("building source distribution for {}", manifest.project.name);
        sdist::build_sdist(
            &self.project_root,
            &manifest.project.name,
            &manifest.project.version,
            staging.path(),
            &[output_path.as_path()],
        )?;

        info!("unpacking archives");
        unpacker::unpack_staging(staging.path())?;

        info!("applying install order");
        renamer::apply_install_order(staging.path(), manifest, &order)?;

        info!("packaging {}", output_path.display());
        packager::package_and_discard(staging, &output_path)?;

        Ok(BuildReport {
            archive: output_path,
            packages: links.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest::from_json(
            r#"{
                "project": { "name": "chartproj", "version": "3.1.0" },
                "packages": { "alpha": { "version": "1.0" } },
                "staging_dir": "stage",
                "output": "dist/bundle.zip"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_paths_resolve_under_project_root() {
        let pipeline = DistPipeline::new(PathBuf::from("/work/proj"), manifest()).unwrap();
        assert_eq!(pipeline.staging_path(), PathBuf::from("/work/proj/stage"));
        assert_eq!(
            pipeline.output_path(),
            PathBuf::from("/work/proj/dist/bundle.zip")
        );
    }

    #[test]
    fn test_overrides_win() {
        let pipeline = DistPipeline::new(PathBuf::from("/work/proj"), manifest())
            .unwrap()
            .with_staging_dir(PathBuf::from("elsewhere"))
            .with_output(PathBuf::from("/tmp/out.zip"));
        assert_eq!(
            pipeline.staging_path(),
            PathBuf::from("/work/proj/elsewhere")
        );
        // absolute override replaces the project root entirely
        assert_eq!(pipeline.output_path(), PathBuf::from("/tmp/out.zip"));
    }
}
