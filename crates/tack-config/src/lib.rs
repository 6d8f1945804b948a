//! Layered configuration for the `tack` plugin host.
//!
//! Values are merged from built-in defaults, an optional TOML configuration
//! file, `TACK_*` environment variables, and command-line flags, in
//! increasing order of precedence. The file is discovered through
//! `--config-path` or `TACK_CONFIG_PATH`.

use std::ffi::OsString;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, INDEX_FILE_NAME, default_log_filter, default_log_filter_string,
    default_log_format, default_plugin_root,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration shared by the CLI and embedders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TACK")]
pub struct Config {
    /// Directory plugin packages and the plugin index live in.
    #[serde(default = "default_plugin_root")]
    #[ortho_config(default = default_plugin_root())]
    plugin_root: Utf8PathBuf,
    /// Tracing filter directive, e.g. `info` or `tack_plugins=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    log_filter: String,
    /// Output format of log records.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugin_root: default_plugin_root(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the loader error when a layer cannot be read or merged.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration using `args` in place of the process arguments.
    /// The first item is the program name.
    ///
    /// # Errors
    ///
    /// Returns the loader error when a layer cannot be read or merged.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Returns a copy of the configuration rooted at `plugin_root`.
    #[must_use]
    pub fn with_plugin_root(mut self, plugin_root: impl Into<Utf8PathBuf>) -> Self {
        self.plugin_root = plugin_root.into();
        self
    }

    /// Returns a copy of the configuration using `log_filter`.
    #[must_use]
    pub fn with_log_filter(mut self, log_filter: impl Into<String>) -> Self {
        self.log_filter = log_filter.into();
        self
    }

    /// Returns a copy of the configuration using `log_format`.
    #[must_use]
    pub const fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    /// Directory plugin packages are installed into.
    #[must_use]
    pub fn plugin_root(&self) -> &Utf8Path {
        &self.plugin_root
    }

    /// Location of the plugin index.
    #[must_use]
    pub fn index_path(&self) -> Utf8PathBuf {
        self.plugin_root.join(INDEX_FILE_NAME)
    }

    /// Tracing filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format of log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
