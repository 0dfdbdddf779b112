//! Git submodule lifecycle: setup, subtree sync, upstream pull.

use std::fs;
use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::Repository;
use log::{debug, info};
use walkdir::WalkDir;

use crate::manifest::SubmoduleSpec;
use crate::{BuildError, Result};

/// Initialize, update and sync every configured submodule, removing stale
/// consumption directories first.
pub fn setup(project_root: &Path, specs: &[SubmoduleSpec]) -> Result<()> {
    let repo = Repository::open(project_root)?;
    for spec in specs {
        let dest = project_root.join(&spec.dest);
        if dest.exists() {
            debug!("removing stale {}", dest.display());
            fs::remove_dir_all(&dest)?;
        }

        let mut submodule = repo.find_submodule(&spec.path)?;
        submodule.init(false)?;
        submodule.update(true, None)?;
        submodule.sync()?;
        info!("submodule {} ready", spec.path);
    }
    Ok(())
}

/// Copy each submodule's subtree into its consumption location, replacing
/// whatever was there.
pub fn sync(project_root: &Path, specs: &[SubmoduleSpec]) -> Result<()> {
    for spec in specs {
        let worktree = project_root.join(&spec.path);
        if !worktree.is_dir() {
            return Err(BuildError::SubmoduleMissing {
                path: spec.path.clone(),
            });
        }
        let source = worktree.join(&spec.subtree);
        if !source.is_dir() {
            return Err(BuildError::SubmoduleMissing {
                path: source.display().to_string(),
            });
        }

        let dest = project_root.join(&spec.dest);
        if dest.exists() {
            fs::remove_dir_all(&dest)?;
        }
        copy_tree(&source, &dest)?;
        info!("synced {} -> {}", source.display(), dest.display());
    }
    Ok(())
}

/// Fetch each submodule's origin and check out the upstream head, detached.
pub fn pull(project_root: &Path, specs: &[SubmoduleSpec]) -> Result<()> {
    for spec in specs {
        let worktree = project_root.join(&spec.path);
        if !worktree.is_dir() {
            return Err(BuildError::SubmoduleMissing {
                path: spec.path.clone(),
            });
        }
        let repo = Repository::open(&worktree)?;
        advance_to_upstream(&repo)?;
        info!("pulled {}", spec.path);
    }
    Ok(())
}

fn advance_to_upstream(repo: &Repository) -> Result<()> {
    let mut remote = repo.find_remote("origin")?;
    remote.fetch(&["refs/heads/*:refs/remotes/origin/*"], None, None)?;

    // submodule worktrees are usually detached, so resolve the remote's
    // default branch rather than an upstream of HEAD
    let target = [
        "refs/remotes/origin/HEAD",
        "refs/remotes/origin/master",
        "refs/remotes/origin/main",
    ]
    .iter()
    .find_map(|name| repo.find_reference(name).ok())
    .ok_or_else(|| BuildError::Git(git2::Error::from_str("no upstream branch found")))?;

    let commit = target.peel_to_commit()?;
    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    let walker = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
