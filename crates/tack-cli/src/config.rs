//! Routing of leading configuration flags to the configuration loader.
//!
//! Flags listed in [`CONFIG_CLI_FLAGS`] must precede the subcommand. They are
//! handed to `ortho_config` together with the program name, while the
//! remaining tokens are parsed by the `tack` command grammar.

use std::ffi::{OsStr, OsString};

use tack_config::Config;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Keep in sync with the fields of [`tack_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--plugin-root",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the filtered configuration arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

/// Loader backed by [`Config::load_from_iter`].
pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

/// How a leading argument is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    /// A configuration flag, possibly followed by its value.
    Include { needs_value: bool },
    /// The first token of the command proper.
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let Some(rest) = text.strip_prefix("--") else {
        return FlagAction::Stop;
    };
    let (name, inline_value) = match rest.split_once('=') {
        Some((name, _)) => (name, true),
        None => (rest, false),
    };
    let known = CONFIG_CLI_FLAGS
        .iter()
        .any(|flag| flag.strip_prefix("--") == Some(name));
    if known {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments split into the configuration loader's share and the command
/// grammar's share. Both keep the program name first.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit::default();
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter().peekable();
    while let Some(argument) = remaining.peek() {
        let FlagAction::Include { needs_value } = classify(argument) else {
            break;
        };
        config_arguments.extend(remaining.next().cloned());
        if needs_value {
            config_arguments.extend(remaining.next().cloned());
        }
    }

    let mut command_arguments = vec![program.clone()];
    command_arguments.extend(remaining.cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}
