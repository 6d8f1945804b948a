//! Test support for the CLI runtime.

use std::cell::RefCell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rstest::fixture;
use tack_config::Config;
use tack_plugins::{
    CommandHandler, CommandType, EntryCatalog, ManifestContext, PluginManifest, RaisedError,
};
use tempfile::TempDir;

use crate::{AppError, ConfigLoader, run_with_loader};


/// Loader returning a fixed configuration rooted in a temporary directory.
pub(crate) struct FixedConfigLoader {
    config: Config,
}

impl ConfigLoader for FixedConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

#[derive(Default)]
struct Hello;

impl CommandHandler for Hello {
    fn exec(&mut self, _command: &str, args: &[String]) -> Result<(), RaisedError> {
        if args.iter().any(|arg| arg == "--fail") {
            return Err(RaisedError::new("HelloError", "asked to fail"));
        }
        Ok(())
    }
}

fn register_hello(context: &mut ManifestContext<'_>) -> Result<(), RaisedError> {
    context.declare_command("hello", CommandType::of::<Hello>());
    Ok(())
}

/// Catalog linking the `hello::register` entry point.
pub(crate) fn hello_catalog() -> EntryCatalog {
    EntryCatalog::new().with_entry("hello::register", register_hello)
}

/// Writes a plugin package named `name` whose manifest uses `entry`.
pub(crate) fn write_package(parent: &Path, name: &str, entry: &str) -> PathBuf {
    let root = parent.join(name);
    std::fs::create_dir_all(root.join("lib")).expect("create package");
    PluginManifest::new(entry).write(&root).expect("write manifest");
    root
}

/// Captured result of one CLI invocation.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) exit: ExitCode,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

pub(crate) struct TestWorld {
    pub(crate) packages: TempDir,
    plugin_root: TempDir,
    pub(crate) last: Option<Outcome>,
}

impl TestWorld {
    pub(crate) fn new() -> Self {
        Self {
            packages: TempDir::new().expect("packages dir"),
            plugin_root: TempDir::new().expect("plugin root"),
            last: None,
        }
    }

    pub(crate) fn plugin_root(&self) -> &Path {
        self.plugin_root.path()
    }

    /// Runs `tack` with `args` against this world's plugin root.
    pub(crate) fn run(&mut self, args: &[&str]) -> &Outcome {
        let loader = FixedConfigLoader {
            config: Config::default()
                .with_plugin_root(self.plugin_root().to_string_lossy().into_owned())
                .with_log_filter("off"),
        };
        let argv: Vec<OsString> = std::iter::once("tack")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect();
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with_loader(argv, &loader, hello_catalog(), &mut stdout, &mut stderr);
        self.last.insert(Outcome {
            exit,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    }

    pub(crate) fn outcome(&self) -> &Outcome {
        self.last.as_ref().expect("the CLI has not been run")
    }

    /// Writes and installs the `hello` plugin.
    pub(crate) fn install_hello(&mut self) -> PathBuf {
        let package = write_package(self.packages.path(), "hello", "hello::register");
        let path = package.to_string_lossy().into_owned();
        let outcome = self.run(&["plugin", "install", "hello", "--path", &path]);
        assert_eq!(outcome.exit, ExitCode::SUCCESS, "{}", outcome.stderr);
        package
    }
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
