//! Install command - sync submodules, then run the configured installer.

use anyhow::{bail, Context, Result};
use console::style;
use std::path::Path;
use std::process::Command;

use standist_build::{submodule, Manifest};

pub fn execute(project_root: &Path, manifest_path: &Path) -> Result<i32> {
    let manifest = Manifest::load(&project_root.join(manifest_path))
        .with_context(|| format!("failed to load {}", manifest_path.display()))?;

    submodule::sync(project_root, &manifest.submodules)?;

    let Some((program, rest)) = manifest.installer.split_first() else {
        bail!("manifest has an empty installer command");
    };
    let status = Command::new(program)
        .args(rest)
        .current_dir(project_root)
        .status()
        .with_context(|| format!("failed to run {}", program))?;

    if !status.success() {
        let code = status.code().unwrap_or(1);
        eprintln!(
            "{} installer exited with status {}",
            style("Error:").red().bold(),
            code
        );
        return Ok(code);
    }

    println!("{} installed", style("Success:").green().bold());
    Ok(0)
}
