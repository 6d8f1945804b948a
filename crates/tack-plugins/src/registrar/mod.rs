//! Dual-mode plugin registration.
//!
//! A plugin's manifest runs in one of two modes:
//!
//! - **Discovery** ([`PluginHost::register_discovery`]) runs at install time.
//!   The manifest declares into a fresh scratch ledger owned by the call; the
//!   declared names are then checked for conflicts and committed to the
//!   registry store. The live ledger is never handed to discovery, so it is
//!   identical before and after the call whatever the outcome.
//! - **Dispatch** ([`PluginHost::load_plugin`]) runs the first time a
//!   capability of an installed plugin is requested. Declarations are staged
//!   and merged into the live ledger once the manifest has finished, so a
//!   failing plugin never leaves handlers behind.
//!
//! Both modes share one execution routine that extends the module search path
//! with the package's load paths and always re-runs the manifest.

use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::error::{PluginError, RaisedError};
use crate::host::{HOST_TARGET, PluginHost};
use crate::ledger::CapabilityLedger;
use crate::manifest::manifest_path;
use crate::package::PackageLocation;
use crate::registry::{PluginRecord, RegistryStore};
use crate::runner::{ManifestContext, ManifestRunner};
use crate::search_path::ModuleSearchPath;

/// Outcome of a discovery registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The plugin was committed to the registry store.
    Installed,
    /// An optional plugin declared sources already served by another plugin;
    /// its package was removed and nothing was recorded.
    Skipped {
        /// Source names that were already owned elsewhere.
        conflicts: Vec<String>,
    },
}

impl Registration {
    /// Returns `true` when the plugin was recorded.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        matches!(self, Self::Installed)
    }
}

impl<S, R> PluginHost<S, R>
where
    S: RegistryStore,
    R: ManifestRunner,
{
    /// Registers a freshly installed package by running its manifest in
    /// isolation.
    ///
    /// When `optional` is set and the manifest declares a source type already
    /// owned by a different plugin, the package directory is deleted and
    /// [`Registration::Skipped`] is returned without touching the store.
    /// Non-optional plugins are committed unconditionally and take over any
    /// names they share with earlier registrations.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MalformedPlugin`] when the manifest raises, or
    /// a store or filesystem error if committing or cleanup fails.
    pub fn register_discovery(
        &mut self,
        name: &str,
        package: &PackageLocation,
        optional: bool,
    ) -> Result<Registration, PluginError> {
        let mut scratch = CapabilityLedger::new();
        self.search_path.extend(package.load_paths());
        execute_manifest(&self.runner, &self.search_path, &mut scratch, package.root()).map_err(
            |failure| {
                warn!(
                    target: HOST_TARGET,
                    plugin = name,
                    error = %failure,
                    "plugin manifest raised during registration"
                );
                PluginError::malformed(&failure)
            },
        )?;

        if optional {
            let conflicts = self.foreign_sources(name, &scratch);
            if !conflicts.is_empty() {
                remove_package(package.root())?;
                info!(
                    target: HOST_TARGET,
                    plugin = name,
                    conflicts = ?conflicts,
                    "skipping optional plugin whose sources are already provided"
                );
                return Ok(Registration::Skipped { conflicts });
            }
        }

        let record = PluginRecord::new(name, package.root(), package.load_paths().to_vec())
            .with_commands(scratch.command_names())
            .with_sources(scratch.source_names())
            .with_hooks(scratch.hook_events());
        self.store.register(record)?;
        // A loaded plugin is reloaded on its next request so new names route.
        self.loaded.remove(name);
        debug!(
            target: HOST_TARGET,
            plugin = name,
            commands = ?scratch.command_names(),
            sources = ?scratch.source_names(),
            "registered plugin"
        );
        Ok(Registration::Installed)
    }

    /// Loads an installed plugin into the live ledger, at most once per host
    /// unless the plugin is registered again in the meantime.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NotInstalled`] when the store has no record of
    /// `name`, or [`PluginError::LoadFailed`] when its manifest raises.
    pub fn load_plugin(&mut self, name: &str) -> Result<(), PluginError> {
        if self.loaded.contains_key(name) {
            return Ok(());
        }
        let path = self
            .store
            .path_of(name)
            .ok_or_else(|| PluginError::NotInstalled {
                name: name.to_owned(),
            })?;
        let load_paths = self.store.load_paths_of(name);
        self.search_path.extend(&load_paths);

        let mut staged = CapabilityLedger::new();
        if let Err(failure) = execute_manifest(&self.runner, &self.search_path, &mut staged, &path)
        {
            error!(
                target: HOST_TARGET,
                plugin = name,
                error = %failure,
                "failed loading plugin"
            );
            return Err(PluginError::LoadFailed {
                name: name.to_owned(),
                message: failure.to_string(),
            });
        }

        self.loaded.insert(name.to_owned(), staged.clone());
        self.live.absorb(staged);
        debug!(target: HOST_TARGET, plugin = name, "loaded plugin");
        Ok(())
    }

    fn foreign_sources(&self, name: &str, scratch: &CapabilityLedger) -> Vec<String> {
        scratch
            .source_names()
            .into_iter()
            .filter(|source| {
                self.store
                    .source_owner(source)
                    .is_some_and(|owner| owner != name)
            })
            .collect()
    }
}

/// Runs the manifest of the package at `root`, directing its declarations
/// into `ledger`. Panics raised by plugin code are reported as failures.
fn execute_manifest<R: ManifestRunner>(
    runner: &R,
    search_path: &ModuleSearchPath,
    ledger: &mut CapabilityLedger,
    root: &Path,
) -> Result<(), RaisedError> {
    let manifest = manifest_path(root);
    let mut context = ManifestContext::new(ledger, search_path, root);
    panic::catch_unwind(AssertUnwindSafe(|| runner.run(&manifest, &mut context)))
        .unwrap_or_else(|payload| Err(RaisedError::from_panic(payload.as_ref())))
}

/// Deletes an installed package directory. A directory that is already gone
/// counts as removed.
pub(crate) fn remove_package(root: &Path) -> Result<(), PluginError> {
    match fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(PluginError::io(root, error)),
    }
}
