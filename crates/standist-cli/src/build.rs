//! Build command - run the full assembly pipeline.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};

use standist_build::{DistPipeline, Manifest};

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Override the staging directory (also honours STANDIST_STAGING)
    #[arg(long)]
    staging: Option<PathBuf>,

    /// Override the output archive path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,
}

pub async fn execute(project_root: &Path, manifest_path: &Path, args: BuildArgs) -> Result<i32> {
    let manifest = Manifest::load(&project_root.join(manifest_path))
        .with_context(|| format!("failed to load {}", manifest_path.display()))?;

    let mut pipeline = DistPipeline::new(project_root.to_path_buf(), manifest)?
        .with_progress(!args.no_progress);

    let staging = args
        .staging
        .or_else(|| std::env::var_os("STANDIST_STAGING").map(PathBuf::from));
    if let Some(staging) = staging {
        pipeline = pipeline.with_staging_dir(staging);
    }
    if let Some(output) = args.output {
        pipeline = pipeline.with_output(output);
    }

    let report = pipeline.run().await?;

    println!(
        "{} Wrote {} ({} dependency packages + project distribution)",
        style("Success:").green().bold(),
        report.archive.display(),
        report.packages
    );

    Ok(0)
}
