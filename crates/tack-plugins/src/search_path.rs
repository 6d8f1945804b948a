//! Ordered module search path shared by every loaded plugin.
//!
//! Plugins contribute directories when they are registered or loaded. Entries
//! are only ever appended; extending twice with the same directories records
//! them twice.

use std::path::{Path, PathBuf};

/// Directories searched, in order, for plugin support files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSearchPath {
    entries: Vec<PathBuf>,
}

impl ModuleSearchPath {
    /// Creates an empty search path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `paths` in order.
    pub fn extend<'a>(&mut self, paths: impl IntoIterator<Item = &'a PathBuf>) {
        self.entries.extend(paths.into_iter().cloned());
    }

    /// Returns the entries in search order.
    #[must_use]
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no directory has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the first entry under which `relative` exists.
    #[must_use]
    pub fn resolve(&self, relative: &Path) -> Option<PathBuf> {
        self.entries
            .iter()
            .map(|entry| entry.join(relative))
            .find(|candidate| candidate.exists())
    }
}
