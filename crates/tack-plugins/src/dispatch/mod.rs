//! Routing of command, source, and hook requests to installed plugins.
//!
//! Whether a capability exists is answered by the registry store alone. The
//! owning plugin is only loaded, through
//! [`PluginHost::load_plugin`], when a request actually needs its handler,
//! and at most once per host until it is registered again.

use tracing::debug;

use crate::error::PluginError;
use crate::events::HookEvent;
use crate::host::{HOST_TARGET, PluginHost};
use crate::ledger::{SourceHandler, SourceType};
use crate::registry::RegistryStore;
use crate::runner::ManifestRunner;
use crate::source::SourceOptions;

impl<S, R> PluginHost<S, R>
where
    S: RegistryStore,
{
    /// Returns `true` when an installed plugin declares the command `name`.
    #[must_use]
    pub fn has_command(&self, name: &str) -> bool {
        self.store.command_owner(name).is_some()
    }

    /// Returns `true` when an installed plugin declares the source type
    /// `name`.
    #[must_use]
    pub fn has_source(&self, name: &str) -> bool {
        self.store.source_owner(name).is_some()
    }
}

impl<S, R> PluginHost<S, R>
where
    S: RegistryStore,
    R: ManifestRunner,
{
    /// Runs the plugin command `name` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UndefinedCommand`] when no plugin declares the
    /// command, any error from loading the owning plugin, or
    /// [`PluginError::CommandFailed`] when the handler fails.
    pub fn dispatch_command(&mut self, name: &str, args: &[String]) -> Result<(), PluginError> {
        let undefined = || PluginError::UndefinedCommand {
            name: name.to_owned(),
        };
        if !self.live.has_command(name) {
            let owner = self.store.command_owner(name).ok_or_else(undefined)?;
            self.load_plugin(&owner)?;
        }
        let handler_type = self.live.command(name).ok_or_else(undefined)?;
        debug!(target: HOST_TARGET, command = name, "dispatching plugin command");
        handler_type
            .instantiate()
            .exec(name, args)
            .map_err(|failure| PluginError::CommandFailed {
                name: name.to_owned(),
                message: failure.to_string(),
            })
    }

    /// Returns the handler type serving the source type `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownSource`] when no plugin declares the
    /// source type, or any error from loading the owning plugin.
    pub fn resolve_source(&mut self, name: &str) -> Result<SourceType, PluginError> {
        let unknown = || PluginError::UnknownSource {
            name: name.to_owned(),
        };
        if !self.live.has_source(name) {
            let owner = self.store.source_owner(name).ok_or_else(unknown)?;
            self.load_plugin(&owner)?;
        }
        self.live.source(name).cloned().ok_or_else(unknown)
    }

    /// Rebuilds a source handler from the options recorded in a lockfile.
    ///
    /// The handler type is chosen by the `type` option and the handler is
    /// constructed with the locked `remote` available as its `uri`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MissingSourceType`] when the options do not
    /// name a type, or any error from [`PluginHost::resolve_source`].
    pub fn source_from_lock(
        &mut self,
        locked: &SourceOptions,
    ) -> Result<Box<dyn SourceHandler>, PluginError> {
        let source_type = locked.source_type().ok_or(PluginError::MissingSourceType)?;
        let handler_type = self.resolve_source(source_type)?;
        Ok(handler_type.instantiate(locked.for_handler()))
    }

    /// Runs every hook registered for `event`, loading the plugins that
    /// declared them first. Plugins run in the order the registry store
    /// lists them, each plugin's hooks in declaration order, and the first
    /// failure stops the rest. Plugins no longer in the store are not run.
    ///
    /// # Errors
    ///
    /// Returns any error from loading a hooking plugin, or
    /// [`PluginError::HookFailed`] when a hook fails.
    pub fn run_hook(&mut self, event: HookEvent, args: &[String]) -> Result<(), PluginError> {
        let owners = self.store.hook_owners(event);
        if owners.is_empty() {
            return Ok(());
        }
        for owner in &owners {
            self.load_plugin(owner)?;
        }
        debug!(
            target: HOST_TARGET,
            event = event.as_str(),
            plugins = ?owners,
            "running plugin hooks"
        );
        let hooks = owners
            .iter()
            .filter_map(|owner| self.loaded.get(owner))
            .flat_map(|declared| declared.hooks(event));
        for hook in hooks {
            hook.call(args).map_err(|failure| PluginError::HookFailed {
                event: event.to_string(),
                message: failure.to_string(),
            })?;
        }
        Ok(())
    }
}
