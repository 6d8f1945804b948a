//! Local-directory package installer.
//!
//! Copies plugin packages from a directory on disk into the plugin root. Any
//! other origin is rejected, since fetching packages is left to embedders.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tack_plugins::manifest::validate_package;
use tack_plugins::{Dependency, InstallOptions, PackageInstaller, PackageLocation, PluginError};
use tracing::debug;

const INSTALLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::installer");

/// Installs packages from `--path` directories into `<plugin root>/<name>`.
///
/// The path names either the package itself or a directory holding one
/// package per plugin name.
#[derive(Debug, Clone)]
pub struct PathInstaller {
    plugin_root: PathBuf,
}

impl PathInstaller {
    /// Creates an installer writing below `plugin_root`.
    #[must_use]
    pub fn new(plugin_root: impl Into<PathBuf>) -> Self {
        Self {
            plugin_root: plugin_root.into(),
        }
    }

    fn install_from(
        &self,
        name: &str,
        options: &InstallOptions,
    ) -> Result<PackageLocation, PluginError> {
        let Some(path) = options.path.as_deref() else {
            return Err(PluginError::Installer {
                message: format!("'{name}' can only be installed from a local path"),
            });
        };
        let nested = path.join(name);
        let origin = if nested.is_dir() {
            nested
        } else if validate_package(path).is_ok() {
            path.to_path_buf()
        } else {
            return Err(PluginError::Installer {
                message: format!("no plugin package named '{name}' at '{}'", path.display()),
            });
        };

        let destination = self.plugin_root.join(name);
        match fs::remove_dir_all(&destination) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => return Err(PluginError::io(&destination, error)),
        }
        copy_tree(&origin, &destination)?;
        debug!(
            target: INSTALLER_TARGET,
            plugin = name,
            from = %origin.display(),
            to = %destination.display(),
            "copied plugin package"
        );
        // Structural problems are reported by the host's validation.
        Ok(PackageLocation::from_manifest(&destination)
            .unwrap_or_else(|_| PackageLocation::new(&destination, vec![destination.join("lib")])))
    }
}

impl PackageInstaller for PathInstaller {
    fn install(
        &self,
        names: &[String],
        options: &InstallOptions,
    ) -> Result<BTreeMap<String, PackageLocation>, PluginError> {
        names
            .iter()
            .map(|name| Ok((name.clone(), self.install_from(name, options)?)))
            .collect()
    }

    fn install_dependencies(
        &self,
        dependencies: &[Dependency],
    ) -> Result<BTreeMap<String, PackageLocation>, PluginError> {
        dependencies
            .iter()
            .map(|dependency| {
                let location = self.install_from(&dependency.name, &dependency.options)?;
                Ok((dependency.name.clone(), location))
            })
            .collect()
    }
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), PluginError> {
    fs::create_dir_all(to).map_err(|error| PluginError::io(to, error))?;
    let entries = fs::read_dir(from).map_err(|error| PluginError::io(from, error))?;
    for entry in entries {
        let entry = entry.map_err(|error| PluginError::io(from, error))?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|error| PluginError::io(&source, error))?;
        if file_type.is_dir() {
            copy_tree(&source, &target)?;
        } else {
            fs::copy(&source, &target).map_err(|error| PluginError::io(&source, error))?;
        }
    }
    Ok(())
}
