//! The plugin host: owner of the live capability ledger.
//!
//! [`PluginHost`] ties together the registry store, the manifest runner, the
//! live [`CapabilityLedger`] used for routing, and the module search path.
//! Registration, dispatch, and installation are implemented on it in the
//! `registrar`, `dispatch`, and `installer` modules respectively.
//!
//! The host assumes strictly sequential use. It is not `Sync`-guarded and a
//! discovery registration must not interleave with a dispatch.

use std::collections::HashMap;

use crate::ledger::CapabilityLedger;
use crate::search_path::ModuleSearchPath;

/// Tracing target for plugin host operations.
pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// Routes capability requests to installed plugins.
///
/// # Example
///
/// ```
/// use tack_plugins::{EntryCatalog, IndexStore, PluginHost};
///
/// let host = PluginHost::new(IndexStore::in_memory(), EntryCatalog::new());
/// assert!(!host.has_command("greet"));
/// assert!(host.ledger().is_empty());
/// ```
#[derive(Debug)]
pub struct PluginHost<S, R> {
    pub(crate) store: S,
    pub(crate) runner: R,
    pub(crate) live: CapabilityLedger,
    pub(crate) search_path: ModuleSearchPath,
    /// Declarations made by each plugin loaded for dispatch.
    pub(crate) loaded: HashMap<String, CapabilityLedger>,
}

impl<S, R> PluginHost<S, R> {
    /// Creates a host with an empty live ledger and search path.
    #[must_use]
    pub fn new(store: S, runner: R) -> Self {
        Self {
            store,
            runner,
            live: CapabilityLedger::new(),
            search_path: ModuleSearchPath::new(),
            loaded: HashMap::new(),
        }
    }

    /// Returns the registry store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Returns the manifest runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns the live capability ledger.
    #[must_use]
    pub const fn ledger(&self) -> &CapabilityLedger {
        &self.live
    }

    /// Returns the module search path.
    #[must_use]
    pub const fn search_path(&self) -> &ModuleSearchPath {
        &self.search_path
    }

    /// Returns `true` once `plugin` has been loaded for dispatch.
    #[must_use]
    pub fn is_loaded(&self, plugin: &str) -> bool {
        self.loaded.contains_key(plugin)
    }
}
