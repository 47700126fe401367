//! Build artifact store

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// External registry of build outputs available for copying into dependents.
///
/// Written only by the build pipeline and read synchronously within the same
/// call, so it needs no interior locking.
pub trait ArtifactStore: Send + Sync {
    /// Copy everything currently available into `dest`, returning the number
    /// of files copied
    fn copy_available_to(&self, dest: &Path) -> io::Result<usize>;

    /// Register a module's own outputs so later modules see them, returning
    /// the number of files registered
    fn register_outputs(&self, source: &Path) -> io::Result<usize>;
}

/// `ArtifactStore` staging files in a flat directory.
///
/// Registration copies a module's output tree in; a later registration of
/// the same relative path wins, which is exactly the "latest available"
/// contract.
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    store_dir: PathBuf,
}

impl DirArtifactStore {
    /// Create a store staging into `store_dir`, creating it if needed
    pub fn new(store_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let store_dir = store_dir.into();
        fs::create_dir_all(&store_dir)?;
        Ok(Self { store_dir })
    }

    /// Staging directory of this store
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Remove every staged artifact
    pub fn clear(&self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.store_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
            removed += 1;
        }
        Ok(removed)
    }
}

fn copy_tree(source: &Path, dest: &Path) -> io::Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source)
            .expect("walkdir yields paths under its root");
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied += 1;
    }

    Ok(copied)
}

impl ArtifactStore for DirArtifactStore {
    fn copy_available_to(&self, dest: &Path) -> io::Result<usize> {
        fs::create_dir_all(dest)?;

        let copied = copy_tree(&self.store_dir, dest)?;
        debug!("Copied {copied} artifacts into {}", dest.display());
        Ok(copied)
    }

    fn register_outputs(&self, source: &Path) -> io::Result<usize> {
        if !source.exists() {
            debug!("No outputs at {}, nothing to register", source.display());
            return Ok(0);
        }

        let registered = copy_tree(source, &self.store_dir)?;
        debug!("Registered {registered} artifacts from {}", source.display());
        Ok(registered)
    }
}
