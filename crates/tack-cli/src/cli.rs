//! CLI argument definitions for `tack`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tack_plugins::InstallOptions;

/// Command-line interface for the `tack` plugin host.
#[derive(Parser, Debug)]
#[command(name = "tack", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Manages installed plugins.
    Plugin {
        /// The plugin management action.
        #[command(subcommand)]
        action: PluginAction,
    },
    /// Runs a command provided by an installed plugin.
    Exec {
        /// Name of the plugin command.
        #[arg(value_name = "COMMAND")]
        command: String,
        /// Arguments passed to the command.
        #[arg(
            value_name = "ARG",
            num_args = 0..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        arguments: Vec<String>,
    },
}

/// Plugin management actions.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum PluginAction {
    /// Installs plugins and records the capabilities they declare.
    Install {
        /// Plugins to install.
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
        /// Where to fetch the plugins from.
        #[command(flatten)]
        origin: OriginArgs,
    },
    /// Removes installed plugins.
    Uninstall {
        /// Plugins to remove.
        #[arg(value_name = "NAME", required_unless_present = "all")]
        names: Vec<String>,
        /// Removes every installed plugin.
        #[arg(long, conflicts_with = "names")]
        all: bool,
    },
    /// Lists installed plugins and their capabilities.
    List {
        /// Emits the plugin records as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Origin flags shared by install requests.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct OriginArgs {
    /// Local directory holding the plugin package.
    #[arg(long, value_name = "DIR")]
    pub(crate) path: Option<PathBuf>,
    /// Git repository URL.
    #[arg(long, value_name = "URL")]
    pub(crate) git: Option<String>,
    /// Git branch to check out.
    #[arg(long)]
    pub(crate) branch: Option<String>,
    /// Git revision to check out.
    #[arg(long = "ref", value_name = "REF")]
    pub(crate) git_ref: Option<String>,
    /// Package repository to fetch from.
    #[arg(long)]
    pub(crate) source: Option<String>,
    /// Version requirement.
    #[arg(long)]
    pub(crate) version: Option<String>,
}

impl From<OriginArgs> for InstallOptions {
    fn from(origin: OriginArgs) -> Self {
        Self {
            source: origin.source,
            version: origin.version,
            git: origin.git,
            branch: origin.branch,
            git_ref: origin.git_ref,
            path: origin.path,
        }
    }
}
