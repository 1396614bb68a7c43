use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

const RUN_PREFIX: &str = "safe2tiff-";

/// Scratch area the archives are expanded into.
#[derive(Debug)]
pub enum Staging {
    /// A fixed directory shared by every run; nothing isolates concurrent runs.
    Shared(PathBuf),
    /// A unique directory for this run, removed on drop.
    Scoped(TempDir),
    /// A per-run directory kept after the run.
    Kept(PathBuf),
}

impl Staging {
    pub fn shared(path: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(path)?;
        Ok(Staging::Shared(path.to_path_buf()))
    }

    pub fn scoped(root: &Path, keep: bool) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new().prefix(RUN_PREFIX).tempdir_in(root)?;
        if keep {
            let path = dir.keep();
            info!("Keeping staging directory {}", path.display());
            return Ok(Staging::Kept(path));
        }
        Ok(Staging::Scoped(dir))
    }

    pub fn path(&self) -> &Path {
        match self {
            Staging::Shared(path) | Staging::Kept(path) => path,
            Staging::Scoped(dir) => dir.path(),
        }
    }
}
