//! Domain errors raised by plugin operations.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O errors are wrapped in `Arc`
//! to satisfy the `result_large_err` Clippy lint.
//!
//! Failures raised by plugin-supplied code (manifest entry points, command
//! handlers, hooks) are carried as [`RaisedError`], which records the
//! descriptive type name of the original failure alongside its message.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors arising from plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin package is missing its manifest, or executing the manifest
    /// raised an error.
    #[error("malformed plugin: {message}")]
    MalformedPlugin {
        /// Description of the failure, `"<type>: <message>"` when the
        /// manifest raised.
        message: String,
    },

    /// No installed plugin provides the requested command.
    #[error("command '{name}' is not provided by any installed plugin")]
    UndefinedCommand {
        /// Command that was requested.
        name: String,
    },

    /// No installed plugin provides the requested source type.
    #[error("source type '{name}' is not provided by any installed plugin")]
    UnknownSource {
        /// Source type that was requested.
        name: String,
    },

    /// A registered plugin failed to load at dispatch time.
    #[error("failed loading plugin '{name}': {message}")]
    LoadFailed {
        /// Plugin name.
        name: String,
        /// Description of the raised failure.
        message: String,
    },

    /// A command handler returned an error.
    #[error("command '{name}' failed: {message}")]
    CommandFailed {
        /// Command that was executed.
        name: String,
        /// Description of the raised failure.
        message: String,
    },

    /// A hook callback returned an error.
    #[error("hook '{event}' failed: {message}")]
    HookFailed {
        /// Event whose hooks were running.
        event: String,
        /// Description of the raised failure.
        message: String,
    },

    /// Locked source options did not name a source type.
    #[error("locked source options are missing the 'type' key")]
    MissingSourceType,

    /// The named plugin is not installed.
    #[error("plugin '{name}' is not installed")]
    NotInstalled {
        /// Plugin name.
        name: String,
    },

    /// Install options were contradictory or incomplete.
    #[error("invalid install option: {message}")]
    InvalidOption {
        /// Description of the problem.
        message: String,
    },

    /// The package installer failed to acquire a plugin package.
    #[error("plugin installer failed: {message}")]
    Installer {
        /// Description of the failure.
        message: String,
    },

    /// The install declaration could not be evaluated.
    #[error("failed to evaluate install declaration: {message}")]
    Declaration {
        /// Description of the failure.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin index could not be read or written.
    #[error("plugin index '{path}' is unusable: {message}")]
    Index {
        /// Location of the index file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<Arc<serde_json::Error>>,
    },
}

impl PluginError {
    /// Wraps a failure raised while executing a manifest.
    #[must_use]
    pub fn malformed(failure: &RaisedError) -> Self {
        Self::MalformedPlugin {
            message: failure.to_string(),
        }
    }

    /// Wraps an I/O error together with the path that produced it.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

/// A failure raised by plugin-supplied code.
///
/// Any [`std::error::Error`] converts into a `RaisedError` through `?`, which
/// records the error's type name so diagnostics can say *what* was raised as
/// well as *why*.
///
/// # Example
///
/// ```
/// use tack_plugins::RaisedError;
///
/// let io = std::io::Error::other("disk on fire");
/// let raised = RaisedError::from(io);
/// assert!(raised.type_name().ends_with("Error"));
/// assert_eq!(raised.message(), "disk on fire");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaisedError {
    type_name: String,
    message: String,
}

impl RaisedError {
    /// Type name recorded for panics caught while running plugin code.
    pub const PANIC: &'static str = "panic";

    /// Creates a raised error with an explicit type name.
    #[must_use]
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Converts a caught panic payload into a raised error.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|text| (*text).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| String::from("non-string panic payload"));
        Self::new(Self::PANIC, message)
    }

    /// Returns the descriptive type name of the original failure.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the original failure's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

impl<E: std::error::Error> From<E> for RaisedError {
    fn from(error: E) -> Self {
        Self::new(std::any::type_name::<E>(), error.to_string())
    }
}
