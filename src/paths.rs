//! Derives the on-disk layout consumed by the downstream frame-creation step:
//! `<working-directory>/<dataset>/<GUID>/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct PathPlanner {
    working_dir: PathBuf,
    dataset: String,
}

impl PathPlanner {
    pub fn new<P: AsRef<Path>>(working_dir: P, dataset: &str) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            dataset: dataset.to_string(),
        }
    }

    pub fn working_dir(self: &Self) -> &Path {
        &self.working_dir
    }

    /// Target directory for one product. Pure derivation, no filesystem access.
    pub fn product_dir(self: &Self, guid: &str) -> PathBuf {
        self.working_dir.join(&self.dataset).join(guid)
    }

    /// Create the product directory and any missing parents. Idempotent;
    /// an existing directory is never an error.
    pub fn ensure_product_dir(self: &Self, guid: &str) -> Result<PathBuf> {
        let dir = self.product_dir(guid);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Unable to create product directory {}", dir.display()))?;
        Ok(dir)
    }
}
