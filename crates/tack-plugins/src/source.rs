//! Options handed to source handlers.
//!
//! A lockfile records each plugin-provided source as a flat list of string
//! options. The `type` key names the source handler and `remote` records where
//! the source lives; handlers read the location back through `uri`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Option naming the source handler that owns a locked source.
pub const TYPE_KEY: &str = "type";
/// Option recording the source's location in a lockfile.
pub const REMOTE_KEY: &str = "remote";
/// Option a source handler reads its location from.
pub const URI_KEY: &str = "uri";

/// Ordered string options describing a source.
///
/// # Example
///
/// ```
/// use tack_plugins::SourceOptions;
///
/// let locked = SourceOptions::from_iter([("type", "git"), ("remote", "u")]);
/// let options = locked.for_handler();
/// assert_eq!(options.uri(), Some("u"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceOptions {
    values: BTreeMap<String, String>,
}

impl SourceOptions {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the source type named by the options.
    #[must_use]
    pub fn source_type(&self) -> Option<&str> {
        self.get(TYPE_KEY)
    }

    /// Returns the recorded remote location.
    #[must_use]
    pub fn remote(&self) -> Option<&str> {
        self.get(REMOTE_KEY)
    }

    /// Returns the location a handler should read from.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.get(URI_KEY)
    }

    /// Iterates over the options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `true` when no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds the options a handler is constructed from, copying the locked
    /// `remote` into `uri`.
    #[must_use]
    pub fn for_handler(&self) -> Self {
        let mut options = self.clone();
        if let Some(remote) = self.remote() {
            options.insert(URI_KEY, remote);
        }
        options
    }
}

impl<K, V> FromIterator<(K, V)> for SourceOptions
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
