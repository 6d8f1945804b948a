//! Command-line runtime for the `tack` plugin host.
//!
//! The runtime splits leading configuration flags off for the configuration
//! loader, parses the remaining tokens as a subcommand, installs telemetry,
//! and drives a [`PluginHost`] backed by the on-disk plugin index.
//!
//! Plugin registration functions are linked into the binary that embeds
//! this crate. The stock `tack` binary knows none, so embedders call
//! [`run_with_catalog`] with their own [`EntryCatalog`].

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use tack_config::Config;
use tack_plugins::{EntryCatalog, IndexStore, PluginHost};
use tracing::debug;

mod cli;
mod commands;
mod config;
mod errors;
pub mod installer;
pub mod telemetry;

use cli::{Cli, CliCommand, PluginAction};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::split_config_arguments;
pub(crate) use errors::AppError;
use installer::PathInstaller;

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// Runs the CLI using the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_catalog(args, EntryCatalog::new(), stdout, stderr)
}

/// Runs the CLI with the plugin registration functions in `catalog`.
#[must_use]
pub fn run_with_catalog<I, W, E>(
    args: I,
    catalog: EntryCatalog,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, &OrthoConfigLoader, catalog, stdout, stderr)
}

pub(crate) fn run_with_loader<I, L, W, E>(
    args: I,
    loader: &L,
    catalog: EntryCatalog,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    L: ConfigLoader,
    W: Write,
    E: Write,
{
    match execute(args, loader, catalog, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<I, L, W>(
    args: I,
    loader: &L,
    catalog: EntryCatalog,
    stdout: &mut W,
) -> Result<(), AppError>
where
    I: IntoIterator<Item = OsString>,
    L: ConfigLoader,
    W: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&args);
    let cli = Cli::try_parse_from(&split.command_arguments).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;
    debug!(
        target: CLI_TARGET,
        plugin_root = %config.plugin_root(),
        "loaded configuration"
    );

    let store = IndexStore::open(config.index_path())?;
    let mut host = PluginHost::new(store, catalog);
    dispatch(cli.command, &config, &mut host, stdout)
}

fn dispatch<W: Write>(
    command: CliCommand,
    config: &Config,
    host: &mut PluginHost<IndexStore, EntryCatalog>,
    stdout: &mut W,
) -> Result<(), AppError> {
    match command {
        CliCommand::Plugin { action } => match action {
            PluginAction::Install { names, origin } => {
                let installer = PathInstaller::new(config.plugin_root().as_std_path());
                commands::install(host, &installer, &names, &origin.into(), stdout)
            }
            PluginAction::Uninstall { names, all } => commands::uninstall(host, &names, all, stdout),
            PluginAction::List { json } => commands::list(host, json, stdout),
        },
        CliCommand::Exec { command, arguments } => {
            host.dispatch_command(&command, &arguments)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
