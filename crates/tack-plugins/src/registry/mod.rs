//! Durable registry of installed plugins and the capabilities they declare.
//!
//! The [`RegistryStore`] trait is the interface the host consumes: point
//! lookups from a command, source, or hook event to the plugin that owns it,
//! plus registration by plugin name. [`IndexStore`] implements it over a JSON
//! index file that is rewritten atomically on every change.
//!
//! Registration overwrites by name. A command or source declared by two
//! plugins is owned by whichever registered last; no conflict check is made
//! here.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::PluginError;
use crate::events::HookEvent;

/// Durable description of an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginRecord {
    /// Unique plugin name.
    pub name: String,
    /// Package root directory.
    pub path: PathBuf,
    /// Module search paths the package contributes, in order.
    pub load_paths: Vec<PathBuf>,
    /// Commands the plugin declared.
    pub commands: BTreeSet<String>,
    /// Source types the plugin declared.
    pub sources: BTreeSet<String>,
    /// Lifecycle events the plugin hooks.
    pub hooks: BTreeSet<HookEvent>,
}

impl PluginRecord {
    /// Creates a record with no declared capabilities.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, load_paths: Vec<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            load_paths,
            commands: BTreeSet::new(),
            sources: BTreeSet::new(),
            hooks: BTreeSet::new(),
        }
    }

    /// Sets the declared commands.
    #[must_use]
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the declared source types.
    #[must_use]
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the hooked events.
    #[must_use]
    pub fn with_hooks(mut self, hooks: impl IntoIterator<Item = HookEvent>) -> Self {
        self.hooks = hooks.into_iter().collect();
        self
    }
}

/// Persisted plugin registry consumed by the host.
pub trait RegistryStore {
    /// Returns the package path of `name` when it is installed.
    fn installed(&self, name: &str) -> Option<PathBuf>;

    /// Returns the plugin that owns `command`.
    fn command_owner(&self, command: &str) -> Option<String>;

    /// Returns the plugin that owns the source type `source`.
    fn source_owner(&self, source: &str) -> Option<String>;

    /// Returns the plugins hooking `event`, in registration order.
    fn hook_owners(&self, event: HookEvent) -> Vec<String>;

    /// Returns the full record for `name`.
    fn record(&self, name: &str) -> Option<PluginRecord>;

    /// Returns the names of every installed plugin, sorted.
    fn installed_plugins(&self) -> Vec<String>;

    /// Stores `record`, replacing any earlier record of the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be persisted.
    fn register(&mut self, record: PluginRecord) -> Result<(), PluginError>;

    /// Removes the record for `name`, returning it when it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be persisted.
    fn unregister(&mut self, name: &str) -> Result<Option<PluginRecord>, PluginError>;

    /// Returns the package path of `name`.
    fn path_of(&self, name: &str) -> Option<PathBuf> {
        self.installed(name)
    }

    /// Returns the module search paths of `name`.
    fn load_paths_of(&self, name: &str) -> Vec<PathBuf> {
        self.record(name)
            .map(|record| record.load_paths)
            .unwrap_or_default()
    }
}

/// On-disk layout of the plugin index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct IndexData {
    commands: BTreeMap<String, String>,
    sources: BTreeMap<String, String>,
    hooks: BTreeMap<String, Vec<String>>,
    load_paths: BTreeMap<String, Vec<PathBuf>>,
    plugin_paths: BTreeMap<String, PathBuf>,
}

impl IndexData {
    fn remove_plugin(&mut self, name: &str) -> bool {
        let existed = self.plugin_paths.remove(name).is_some();
        self.load_paths.remove(name);
        self.commands.retain(|_, owner| owner.as_str() != name);
        self.sources.retain(|_, owner| owner.as_str() != name);
        for owners in self.hooks.values_mut() {
            owners.retain(|owner| owner.as_str() != name);
        }
        self.hooks.retain(|_, owners| !owners.is_empty());
        existed
    }

    fn insert_plugin(&mut self, record: PluginRecord) {
        for command in record.commands {
            self.commands.insert(command, record.name.clone());
        }
        for source in record.sources {
            self.sources.insert(source, record.name.clone());
        }
        for event in record.hooks {
            self.hooks
                .entry(event.to_string())
                .or_default()
                .push(record.name.clone());
        }
        self.load_paths.insert(record.name.clone(), record.load_paths);
        self.plugin_paths.insert(record.name, record.path);
    }

    fn record(&self, name: &str) -> Option<PluginRecord> {
        let path = self.plugin_paths.get(name)?;
        let owned_by = |map: &BTreeMap<String, String>| -> BTreeSet<String> {
            map.iter()
                .filter(|(_, owner)| owner.as_str() == name)
                .map(|(key, _)| key.clone())
                .collect()
        };
        let hooks = self
            .hooks
            .iter()
            .filter(|(_, owners)| owners.iter().any(|owner| owner.as_str() == name))
            .filter_map(|(event, _)| event.parse::<HookEvent>().ok())
            .collect();
        Some(PluginRecord {
            name: name.to_owned(),
            path: path.clone(),
            load_paths: self.load_paths.get(name).cloned().unwrap_or_default(),
            commands: owned_by(&self.commands),
            sources: owned_by(&self.sources),
            hooks,
        })
    }
}

/// Plugin registry backed by a JSON index file.
///
/// # Example
///
/// ```
/// use tack_plugins::{IndexStore, PluginRecord, RegistryStore};
///
/// let mut store = IndexStore::in_memory();
/// let record = PluginRecord::new("greeter", "/plugins/greeter", vec![])
///     .with_commands(["greet"]);
/// store.register(record).expect("registration succeeds");
/// assert_eq!(store.command_owner("greet").as_deref(), Some("greeter"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    path: Option<PathBuf>,
    data: IndexData,
}

impl IndexStore {
    /// Creates a store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the index at `path`. A missing file yields an empty index that
    /// will be created on the first change.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Io`] if the file exists but cannot be read, or
    /// [`PluginError::Index`] if it is not a valid index.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PluginError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|error| PluginError::Index {
                path: path.clone(),
                message: String::from("failed to parse index"),
                source: Some(Arc::new(error)),
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => IndexData::default(),
            Err(error) => return Err(PluginError::io(path, error)),
        };
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    /// Returns the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self) -> Result<(), PluginError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(directory).map_err(|error| PluginError::io(directory, error))?;
        let json = serde_json::to_vec_pretty(&self.data).map_err(|error| PluginError::Index {
            path: path.to_path_buf(),
            message: String::from("failed to serialise index"),
            source: Some(Arc::new(error)),
        })?;
        let mut file =
            NamedTempFile::new_in(directory).map_err(|error| PluginError::io(directory, error))?;
        file.write_all(&json)
            .map_err(|error| PluginError::io(file.path(), error))?;
        file.persist(path)
            .map_err(|error| PluginError::io(path, error.error))?;
        Ok(())
    }

    /// Applies `change`, rolling back the in-memory index if it cannot be
    /// persisted.
    fn update<T>(&mut self, change: impl FnOnce(&mut IndexData) -> T) -> Result<T, PluginError> {
        let previous = self.data.clone();
        let outcome = change(&mut self.data);
        if let Err(error) = self.persist() {
            self.data = previous;
            return Err(error);
        }
        Ok(outcome)
    }
}

impl RegistryStore for IndexStore {
    fn installed(&self, name: &str) -> Option<PathBuf> {
        self.data.plugin_paths.get(name).cloned()
    }

    fn command_owner(&self, command: &str) -> Option<String> {
        self.data.commands.get(command).cloned()
    }

    fn source_owner(&self, source: &str) -> Option<String> {
        self.data.sources.get(source).cloned()
    }

    fn hook_owners(&self, event: HookEvent) -> Vec<String> {
        self.data
            .hooks
            .get(event.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, name: &str) -> Option<PluginRecord> {
        self.data.record(name)
    }

    fn installed_plugins(&self) -> Vec<String> {
        self.data.plugin_paths.keys().cloned().collect()
    }

    fn register(&mut self, record: PluginRecord) -> Result<(), PluginError> {
        self.update(|data| {
            data.remove_plugin(&record.name);
            data.insert_plugin(record);
        })
    }

    fn unregister(&mut self, name: &str) -> Result<Option<PluginRecord>, PluginError> {
        let Some(record) = self.data.record(name) else {
            return Ok(None);
        };
        self.update(|data| {
            data.remove_plugin(name);
        })?;
        Ok(Some(record))
    }
}
