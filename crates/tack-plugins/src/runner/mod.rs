//! Manifest execution: running a package's registration function.
//!
//! A plugin package registers itself by exposing a registration function (an
//! [`EntryPoint`]) named in its manifest. Running the manifest means invoking
//! that function with a [`ManifestContext`], through which the plugin
//! declares its commands, sources, and hooks.
//!
//! The [`ManifestRunner`] abstraction decides how a manifest path becomes a
//! call. The production implementation is [`EntryCatalog`], which resolves
//! entry names against functions linked into the embedding tool. Test code can
//! implement the trait to count or fail executions.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::RaisedError;
use crate::events::HookEvent;
use crate::ledger::{CapabilityLedger, CommandType, Hook, SourceType};
use crate::manifest::PluginManifest;
use crate::search_path::ModuleSearchPath;

/// Registration function exposed by a plugin package.
pub type EntryPoint = fn(&mut ManifestContext<'_>) -> Result<(), RaisedError>;

/// View handed to manifest code while it runs.
///
/// Declarations land in whichever ledger the host supplied: a scratch ledger
/// during discovery, a staging ledger bound for the live one during dispatch.
#[derive(Debug)]
pub struct ManifestContext<'a> {
    ledger: &'a mut CapabilityLedger,
    search_path: &'a ModuleSearchPath,
    package_root: &'a Path,
}

impl<'a> ManifestContext<'a> {
    /// Creates a context targeting `ledger`.
    pub fn new(
        ledger: &'a mut CapabilityLedger,
        search_path: &'a ModuleSearchPath,
        package_root: &'a Path,
    ) -> Self {
        Self {
            ledger,
            search_path,
            package_root,
        }
    }

    /// Declares a command provided by the plugin.
    pub fn declare_command(&mut self, name: impl Into<String>, handler: CommandType) {
        self.ledger.declare_command(name, handler);
    }

    /// Declares a source type provided by the plugin.
    pub fn declare_source(&mut self, name: impl Into<String>, handler: SourceType) {
        self.ledger.declare_source(name, handler);
    }

    /// Registers a hook for a lifecycle event.
    pub fn declare_hook(&mut self, event: HookEvent, hook: Hook) {
        self.ledger.declare_hook(event, hook);
    }

    /// Returns the module search path as extended for this plugin.
    #[must_use]
    pub const fn search_path(&self) -> &ModuleSearchPath {
        self.search_path
    }

    /// Returns the root directory of the package being run.
    #[must_use]
    pub const fn package_root(&self) -> &Path {
        self.package_root
    }
}

/// Trait abstracting manifest execution for testability.
pub trait ManifestRunner {
    /// Executes the manifest at `manifest_path` against `context`.
    ///
    /// Implementations must run the manifest on every call, even if the same
    /// path was run before.
    ///
    /// # Errors
    ///
    /// Returns the [`RaisedError`] produced by the manifest code, or one
    /// describing why the manifest could not be run at all.
    fn run(
        &self,
        manifest_path: &Path,
        context: &mut ManifestContext<'_>,
    ) -> Result<(), RaisedError>;
}

/// Registration functions linked into the embedding tool, keyed by the entry
/// name plugin manifests refer to.
///
/// # Example
///
/// ```
/// use tack_plugins::{EntryCatalog, ManifestContext, RaisedError};
///
/// fn register(_context: &mut ManifestContext<'_>) -> Result<(), RaisedError> {
///     Ok(())
/// }
///
/// let catalog = EntryCatalog::new().with_entry("greeter::register", register);
/// assert!(catalog.contains("greeter::register"));
/// ```
#[derive(Clone, Default)]
pub struct EntryCatalog {
    entries: HashMap<String, EntryPoint>,
}

impl EntryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry point, returning the catalog for chaining.
    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>, entry: EntryPoint) -> Self {
        self.register(name, entry);
        self
    }

    /// Adds or replaces an entry point.
    pub fn register(&mut self, name: impl Into<String>, entry: EntryPoint) {
        self.entries.insert(name.into(), entry);
    }

    /// Returns `true` when `name` resolves to an entry point.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl fmt::Debug for EntryCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("EntryCatalog")
            .field("entries", &names)
            .finish()
    }
}

impl ManifestRunner for EntryCatalog {
    fn run(
        &self,
        manifest_path: &Path,
        context: &mut ManifestContext<'_>,
    ) -> Result<(), RaisedError> {
        let root = manifest_path.parent().unwrap_or(context.package_root());
        let manifest = PluginManifest::read(root)?;
        let entry = self.entries.get(manifest.entry()).ok_or_else(|| {
            RaisedError::new(
                "UnknownEntryPoint",
                format!("no registration function named '{}'", manifest.entry()),
            )
        })?;
        entry(context)
    }
}
