//! Submodule commands: setup, sync, pull.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use standist_build::{submodule, Manifest};

fn load(project_root: &Path, manifest_path: &Path) -> Result<Manifest> {
    Manifest::load(&project_root.join(manifest_path))
        .with_context(|| format!("failed to load {}", manifest_path.display()))
}

pub fn setup(project_root: &Path, manifest_path: &Path) -> Result<i32> {
    let manifest = load(project_root, manifest_path)?;
    submodule::setup(project_root, &manifest.submodules)?;
    println!(
        "{} {} submodules initialized",
        style("Success:").green().bold(),
        manifest.submodules.len()
    );
    Ok(0)
}

pub fn sync(project_root: &Path, manifest_path: &Path) -> Result<i32> {
    let manifest = load(project_root, manifest_path)?;
    submodule::sync(project_root, &manifest.submodules)?;
    println!(
        "{} {} subtrees synced",
        style("Success:").green().bold(),
        manifest.submodules.len()
    );
    Ok(0)
}

pub fn pull(project_root: &Path, manifest_path: &Path) -> Result<i32> {
    let manifest = load(project_root, manifest_path)?;
    submodule::pull(project_root, &manifest.submodules)?;
    println!(
        "{} {} submodules updated",
        style("Success:").green().bold(),
        manifest.submodules.len()
    );
    Ok(0)
}
