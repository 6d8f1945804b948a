//! Handlers for the `plugin` and `exec` subcommands.

use std::collections::BTreeSet;
use std::io::Write;

use tack_plugins::{
    InstallOptions, ManifestRunner, PackageInstaller, PluginHost, PluginRecord, RegistryStore,
};

use crate::AppError;

pub(crate) fn install<S, R, I, W>(
    host: &mut PluginHost<S, R>,
    installer: &I,
    names: &[String],
    options: &InstallOptions,
    stdout: &mut W,
) -> Result<(), AppError>
where
    S: RegistryStore,
    R: ManifestRunner,
    I: PackageInstaller,
    W: Write,
{
    host.install(installer, names, options)?;
    let (installed, missing): (Vec<&String>, Vec<&String>) = names
        .iter()
        .partition(|name| host.store().installed(name).is_some());
    for name in installed {
        writeln!(stdout, "Installed plugin {name}")?;
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::NotInstalled(missing.into_iter().cloned().collect()))
    }
}

pub(crate) fn uninstall<S, R, W>(
    host: &mut PluginHost<S, R>,
    names: &[String],
    all: bool,
    stdout: &mut W,
) -> Result<(), AppError>
where
    S: RegistryStore,
    W: Write,
{
    let before = installed_names(host);
    if all {
        host.uninstall_all()?;
    } else {
        host.uninstall(names)?;
    }
    let after = installed_names(host);

    if all && before.is_empty() {
        writeln!(stdout, "No plugins installed")?;
    }
    for name in names.iter().filter(|name| !before.contains(*name)) {
        writeln!(stdout, "Plugin {name} is not installed")?;
    }
    for name in before.difference(&after) {
        writeln!(stdout, "Uninstalled plugin {name}")?;
    }
    Ok(())
}

pub(crate) fn list<S, R, W>(host: &PluginHost<S, R>, json: bool, stdout: &mut W) -> Result<(), AppError>
where
    S: RegistryStore,
    W: Write,
{
    let records = host.list();
    if json {
        serde_json::to_writer_pretty(&mut *stdout, &records).map_err(AppError::SerialiseList)?;
        writeln!(stdout)?;
        return Ok(());
    }
    if records.is_empty() {
        writeln!(stdout, "No plugins installed")?;
        return Ok(());
    }
    for record in &records {
        write_record(record, stdout)?;
    }
    Ok(())
}

fn write_record<W: Write>(record: &PluginRecord, stdout: &mut W) -> Result<(), AppError> {
    writeln!(stdout, "{} ({})", record.name, record.path.display())?;
    write_names(stdout, "commands", record.commands.iter().map(String::as_str))?;
    write_names(stdout, "sources", record.sources.iter().map(String::as_str))?;
    write_names(stdout, "hooks", record.hooks.iter().map(|event| event.as_str()))?;
    Ok(())
}

fn write_names<'a, W: Write>(
    stdout: &mut W,
    label: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), AppError> {
    let names: Vec<&str> = names.collect();
    if !names.is_empty() {
        writeln!(stdout, "  {label}: {}", names.join(", "))?;
    }
    Ok(())
}

fn installed_names<S: RegistryStore, R>(host: &PluginHost<S, R>) -> BTreeSet<String> {
    host.list().into_iter().map(|record| record.name).collect()
}
