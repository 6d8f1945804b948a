//! Install orchestration.
//!
//! Package acquisition and declaration evaluation belong to external
//! collaborators, modelled here as the [`PackageInstaller`] and
//! [`DeclarationParser`] traits. The host validates what they return and
//! registers each package in discovery mode.
//!
//! The two entry points differ in how they surface failures.
//! [`PluginHost::install`] is best-effort: a package that fails validation or
//! registration causes every package from the same call to be removed and the
//! failure is logged rather than returned. [`PluginHost::install_from_declaration`]
//! logs and returns every failure and removes nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::PluginError;
use crate::host::{HOST_TARGET, PluginHost};
use crate::manifest::validate_package;
use crate::package::PackageLocation;
use crate::registrar::{Registration, remove_package};
use crate::registry::{PluginRecord, RegistryStore};
use crate::runner::ManifestRunner;

/// Where a plugin package should be fetched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Package repository to fetch from.
    pub source: Option<String>,
    /// Version requirement.
    pub version: Option<String>,
    /// Git repository URL.
    pub git: Option<String>,
    /// Git branch to check out.
    pub branch: Option<String>,
    /// Git revision to check out.
    pub git_ref: Option<String>,
    /// Local directory containing the package.
    pub path: Option<PathBuf>,
}

impl InstallOptions {
    /// Checks that the options describe a single unambiguous origin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidOption`] when both a branch and a ref
    /// are given, when either is given without a git repository, or when a
    /// git repository and a local path are both given.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.branch.is_some() && self.git_ref.is_some() {
            return Err(invalid("a branch and a ref cannot both be specified"));
        }
        if self.git.is_none() && (self.branch.is_some() || self.git_ref.is_some()) {
            return Err(invalid("a branch or ref requires a git repository"));
        }
        if self.git.is_some() && self.path.is_some() {
            return Err(invalid("a git repository and a local path are exclusive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> PluginError {
    PluginError::InvalidOption {
        message: message.to_owned(),
    }
}

/// One plugin requested by an install declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Plugin name.
    pub name: String,
    /// Where to fetch it from.
    pub options: InstallOptions,
}

impl Dependency {
    /// Creates a dependency with default options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: InstallOptions::default(),
        }
    }
}

/// Result of evaluating an install declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declaration {
    /// Declared plugins, in declaration order.
    pub dependencies: Vec<Dependency>,
    /// Names the parser inferred as default source providers. These register
    /// as optional and yield to plugins already serving their sources.
    pub inferred: BTreeSet<String>,
}

/// Input handed to a [`DeclarationParser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationSource {
    /// Declaration text held in memory.
    Inline(String),
    /// File containing the declaration.
    File(PathBuf),
}

/// Evaluates install declarations into dependency lists.
pub trait DeclarationParser {
    /// Evaluates `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Declaration`] when the declaration cannot be
    /// read or evaluated.
    fn evaluate(&self, source: &DeclarationSource) -> Result<Declaration, PluginError>;
}

/// Acquires plugin packages and places them on disk.
pub trait PackageInstaller {
    /// Installs the packages `names` from the origin described by `options`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Installer`] when a package cannot be acquired.
    fn install(
        &self,
        names: &[String],
        options: &InstallOptions,
    ) -> Result<BTreeMap<String, PackageLocation>, PluginError>;

    /// Installs the packages for a declaration's dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Installer`] when a package cannot be acquired.
    fn install_dependencies(
        &self,
        dependencies: &[Dependency],
    ) -> Result<BTreeMap<String, PackageLocation>, PluginError>;
}

impl<S, R> PluginHost<S, R>
where
    S: RegistryStore,
    R: ManifestRunner,
{
    /// Installs and registers the plugins `names`, in the order given.
    ///
    /// Validation and registration failures are logged, not returned. After
    /// such a failure every package acquired by this call is removed, while
    /// plugins registered before the failure stay recorded.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidOption`] for contradictory options and
    /// any error reported by `installer`.
    pub fn install<I>(
        &mut self,
        installer: &I,
        names: &[String],
        options: &InstallOptions,
    ) -> Result<(), PluginError>
    where
        I: PackageInstaller + ?Sized,
    {
        options.validate()?;
        let packages = installer.install(names, options)?;
        if let Err(failure) = self.register_packages(names, &packages, &BTreeSet::new()) {
            error!(
                target: HOST_TARGET,
                plugins = ?names,
                error = %failure,
                "failed to install plugin"
            );
            for package in packages.values() {
                if let Err(cleanup) = remove_package(package.root()) {
                    warn!(
                        target: HOST_TARGET,
                        path = %package.root().display(),
                        error = %cleanup,
                        "failed to remove plugin package"
                    );
                }
            }
        }
        Ok(())
    }

    /// Installs and registers the plugins named by an install declaration.
    ///
    /// An empty declaration does nothing. Plugins already present in the
    /// registry store are skipped, and names the parser inferred register as
    /// optional.
    ///
    /// # Errors
    ///
    /// Every failure from the parser, the installer, validation, or
    /// registration is logged and returned. Nothing is cleaned up.
    pub fn install_from_declaration<P, I>(
        &mut self,
        parser: &P,
        installer: &I,
        source: &DeclarationSource,
    ) -> Result<(), PluginError>
    where
        P: DeclarationParser + ?Sized,
        I: PackageInstaller + ?Sized,
    {
        let result = self.install_declared(parser, installer, source);
        if let Err(failure) = &result {
            error!(
                target: HOST_TARGET,
                error = %failure,
                "failed to install plugins from declaration"
            );
        }
        result
    }

    fn install_declared<P, I>(
        &mut self,
        parser: &P,
        installer: &I,
        source: &DeclarationSource,
    ) -> Result<(), PluginError>
    where
        P: DeclarationParser + ?Sized,
        I: PackageInstaller + ?Sized,
    {
        let declaration = parser.evaluate(source)?;
        if declaration.dependencies.is_empty() {
            return Ok(());
        }
        let pending: Vec<Dependency> = declaration
            .dependencies
            .into_iter()
            .filter(|dependency| self.store.installed(&dependency.name).is_none())
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        let packages = installer.install_dependencies(&pending)?;
        let names: Vec<String> = pending.into_iter().map(|dependency| dependency.name).collect();
        self.register_packages(&names, &packages, &declaration.inferred)
    }

    /// Registers `packages` in the order of `names`, so a later name takes
    /// over sources it shares with an earlier one.
    fn register_packages(
        &mut self,
        names: &[String],
        packages: &BTreeMap<String, PackageLocation>,
        optional: &BTreeSet<String>,
    ) -> Result<(), PluginError> {
        for name in names {
            let package = packages.get(name).ok_or_else(|| PluginError::Installer {
                message: format!("no package was installed for '{name}'"),
            })?;
            validate_package(package.root())?;
            let outcome = self.register_discovery(name, package, optional.contains(name))?;
            if outcome == Registration::Installed {
                info!(target: HOST_TARGET, plugin = %name, "installed plugin");
            }
        }
        Ok(())
    }
}

impl<S, R> PluginHost<S, R>
where
    S: RegistryStore,
{
    /// Removes the plugins `names` from disk and from the registry store.
    /// Names that are not installed are reported and skipped.
    ///
    /// Handlers this host already loaded stay routable until it is dropped.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a package directory cannot be removed, or a
    /// store error if the index cannot be updated.
    pub fn uninstall(&mut self, names: &[String]) -> Result<(), PluginError> {
        for name in names {
            let Some(record) = self.store.record(name) else {
                warn!(target: HOST_TARGET, plugin = %name, "plugin is not installed");
                continue;
            };
            remove_package(&record.path)?;
            self.store.unregister(name)?;
            info!(target: HOST_TARGET, plugin = %name, "uninstalled plugin");
        }
        Ok(())
    }

    /// Removes every installed plugin.
    ///
    /// # Errors
    ///
    /// See [`PluginHost::uninstall`].
    pub fn uninstall_all(&mut self) -> Result<(), PluginError> {
        let names = self.store.installed_plugins();
        if names.is_empty() {
            info!(target: HOST_TARGET, "no plugins installed");
            return Ok(());
        }
        self.uninstall(&names)
    }

    /// Returns the record of every installed plugin, ordered by name.
    #[must_use]
    pub fn list(&self) -> Vec<PluginRecord> {
        let mut records: Vec<PluginRecord> = self
            .store
            .installed_plugins()
            .iter()
            .filter_map(|name| self.store.record(name))
            .collect();
        records.sort_by(|left, right| left.name.cmp(&right.name));
        records
    }
}

#[cfg(test)]
mod tests;
