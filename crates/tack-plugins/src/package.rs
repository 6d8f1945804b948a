//! Location of an installed plugin package.

use std::path::{Path, PathBuf};

use crate::error::PluginError;
use crate::manifest::PluginManifest;

/// Where the package installer placed a plugin and which directories it
/// contributes to the module search path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLocation {
    root: PathBuf,
    load_paths: Vec<PathBuf>,
}

impl PackageLocation {
    /// Creates a location from a root and absolute load paths.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, load_paths: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            load_paths,
        }
    }

    /// Builds a location from the manifest found under `root`, resolving the
    /// manifest's load paths against the root.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MalformedPlugin`] if the manifest is missing or
    /// invalid.
    pub fn from_manifest(root: impl Into<PathBuf>) -> Result<Self, PluginError> {
        let root = root.into();
        let manifest = PluginManifest::read(&root)?;
        let load_paths = manifest
            .load_paths()
            .iter()
            .map(|path| root.join(path))
            .collect();
        Ok(Self { root, load_paths })
    }

    /// Returns the package root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the module search paths the package contributes.
    #[must_use]
    pub fn load_paths(&self) -> &[PathBuf] {
        &self.load_paths
    }
}
