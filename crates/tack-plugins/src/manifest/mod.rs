//! Plugin manifest file describing how a package registers itself.
//!
//! Every plugin package carries a [`MANIFEST_FILE_NAME`] file at its root.
//! The manifest names the registration function the package exposes (its
//! *entry point*) and the directories, relative to the package root, that the
//! package contributes to the module search path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Fixed name of the manifest file at the root of every plugin package.
pub const MANIFEST_FILE_NAME: &str = "tack-plugin.json";

/// Load path used when a manifest does not declare any.
const DEFAULT_LOAD_PATH: &str = "lib";

/// Declarative description of a plugin package.
///
/// # Example
///
/// ```
/// use tack_plugins::PluginManifest;
/// use std::path::PathBuf;
///
/// let manifest = PluginManifest::new("greeter::register");
/// assert_eq!(manifest.entry(), "greeter::register");
/// assert_eq!(manifest.load_paths(), &[PathBuf::from("lib")]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    entry: String,
    #[serde(default = "default_load_paths")]
    load_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

fn default_load_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(DEFAULT_LOAD_PATH)]
}

impl PluginManifest {
    /// Creates a manifest for `entry` with the default load path.
    #[must_use]
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            load_paths: default_load_paths(),
            version: None,
        }
    }

    /// Replaces the declared load paths.
    #[must_use]
    pub fn with_load_paths(mut self, load_paths: Vec<PathBuf>) -> Self {
        self.load_paths = load_paths;
        self
    }

    /// Records the package version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Reads and validates the manifest of the package rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MalformedPlugin`] when the manifest is missing,
    /// unreadable, not valid JSON, or fails [`PluginManifest::validate`].
    pub fn read(root: &Path) -> Result<Self, PluginError> {
        validate_package(root)?;
        let path = manifest_path(root);
        let text = fs::read_to_string(&path).map_err(|error| PluginError::MalformedPlugin {
            message: format!("cannot read {}: {error}", path.display()),
        })?;
        let manifest: Self =
            serde_json::from_str(&text).map_err(|error| PluginError::MalformedPlugin {
                message: format!("{MANIFEST_FILE_NAME} is not valid: {error}"),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Writes the manifest into the package rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the file cannot be written.
    pub fn write(&self, root: &Path) -> Result<(), PluginError> {
        let path = manifest_path(root);
        let text = serde_json::to_string_pretty(self).map_err(|error| PluginError::MalformedPlugin {
            message: format!("cannot serialise manifest: {error}"),
        })?;
        fs::write(&path, text).map_err(|error| PluginError::io(path, error))
    }

    /// Validates the manifest, returning an error if it is malformed.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MalformedPlugin`] if the entry point is empty
    /// or a load path escapes the package root.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.entry.trim().is_empty() {
            return Err(PluginError::MalformedPlugin {
                message: String::from("manifest entry point must not be empty"),
            });
        }
        if let Some(path) = self.load_paths.iter().find(|path| path.is_absolute()) {
            return Err(PluginError::MalformedPlugin {
                message: format!(
                    "load paths must be relative to the package root, got '{}'",
                    path.display()
                ),
            });
        }
        Ok(())
    }

    /// Returns the name of the registration function.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Returns the declared load paths, relative to the package root.
    #[must_use]
    pub fn load_paths(&self) -> &[PathBuf] {
        &self.load_paths
    }

    /// Returns the package version, if recorded.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Returns the manifest location for the package rooted at `root`.
#[must_use]
pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE_NAME)
}

/// Checks that a package directory contains its manifest file.
///
/// The check is purely structural: the manifest's content is not read.
///
/// # Errors
///
/// Returns [`PluginError::MalformedPlugin`] when the manifest file is absent.
pub fn validate_package(root: &Path) -> Result<(), PluginError> {
    if manifest_path(root).is_file() {
        Ok(())
    } else {
        Err(PluginError::MalformedPlugin {
            message: format!("{MANIFEST_FILE_NAME} was not found in the plugin"),
        })
    }
}
