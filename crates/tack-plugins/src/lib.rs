//! Capability registration and dispatch for `tack` plugins.
//!
//! A plugin is a package whose manifest (`tack-plugin.json`) names a
//! registration function. Running that function declares the commands,
//! source types, and lifecycle hooks the plugin provides. The host runs it in
//! two modes:
//!
//! - **Discovery**, at install time, into a scratch [`CapabilityLedger`]
//!   whose names are then committed to the durable [`RegistryStore`].
//! - **Dispatch**, the first time a capability is requested, into the live
//!   ledger that routes requests for the rest of the host's life.
//!
//! # Architecture
//!
//! [`PluginHost`] owns the live ledger and the module search path. Questions
//! such as [`PluginHost::has_command`] are answered from the store alone;
//! [`PluginHost::dispatch_command`] and [`PluginHost::resolve_source`] load
//! the owning plugin on demand. Package acquisition and install declarations
//! are delegated to the [`PackageInstaller`] and [`DeclarationParser`] traits.
//!
//! # Example
//!
//! ```
//! use tack_plugins::{
//!     CommandHandler, CommandType, EntryCatalog, IndexStore, ManifestContext, PackageLocation,
//!     PluginHost, PluginManifest, RaisedError,
//! };
//!
//! #[derive(Default)]
//! struct Hello;
//!
//! impl CommandHandler for Hello {
//!     fn exec(&mut self, _command: &str, _args: &[String]) -> Result<(), RaisedError> {
//!         Ok(())
//!     }
//! }
//!
//! fn register(context: &mut ManifestContext<'_>) -> Result<(), RaisedError> {
//!     context.declare_command("hello", CommandType::of::<Hello>());
//!     Ok(())
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let root = dir.path().join("hello");
//! std::fs::create_dir_all(root.join("lib"))?;
//! PluginManifest::new("hello::register").write(&root)?;
//!
//! let catalog = EntryCatalog::new().with_entry("hello::register", register);
//! let mut host = PluginHost::new(IndexStore::in_memory(), catalog);
//! host.register_discovery("hello", &PackageLocation::from_manifest(&root)?, false)?;
//!
//! assert!(host.has_command("hello"));
//! host.dispatch_command("hello", &[])?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod host;
pub mod installer;
pub mod ledger;
pub mod manifest;
pub mod package;
pub mod registrar;
pub mod registry;
pub mod runner;
pub mod search_path;
pub mod source;

mod dispatch;

#[cfg(test)]
mod tests;

pub use self::error::{PluginError, RaisedError};
pub use self::events::HookEvent;
pub use self::host::PluginHost;
pub use self::installer::{
    Declaration, DeclarationParser, DeclarationSource, Dependency, InstallOptions,
    PackageInstaller,
};
pub use self::ledger::{
    CapabilityLedger, CommandHandler, CommandType, Hook, LOCK_SECTION, SourceHandler, SourceType,
};
pub use self::manifest::{MANIFEST_FILE_NAME, PluginManifest};
pub use self::package::PackageLocation;
pub use self::registrar::Registration;
pub use self::registry::{IndexStore, PluginRecord, RegistryStore};
pub use self::runner::{EntryCatalog, EntryPoint, ManifestContext, ManifestRunner};
pub use self::search_path::ModuleSearchPath;
pub use self::source::SourceOptions;
