//! Crate-level test support and behaviour tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::error::RaisedError;
use crate::ledger::{CommandHandler, CommandType, SourceHandler, SourceType};
use crate::manifest::PluginManifest;
use crate::package::PackageLocation;
use crate::runner::{ManifestContext, ManifestRunner};
use crate::source::SourceOptions;


type Script = Box<dyn Fn(&mut ManifestContext<'_>) -> Result<(), RaisedError>>;

/// Manifest runner whose behaviour is scripted per package root and which
/// records every execution.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    scripts: HashMap<PathBuf, Script>,
    runs: RefCell<Vec<PathBuf>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script<F>(&mut self, root: &Path, script: F)
    where
        F: Fn(&mut ManifestContext<'_>) -> Result<(), RaisedError> + 'static,
    {
        self.scripts.insert(root.to_path_buf(), Box::new(script));
    }

    /// Total number of manifest executions.
    pub(crate) fn runs(&self) -> usize {
        self.runs.borrow().len()
    }

    /// Number of executions of the manifest under `root`.
    pub(crate) fn runs_for(&self, root: &Path) -> usize {
        self.runs.borrow().iter().filter(|run| run.as_path() == root).count()
    }
}

impl ManifestRunner for ScriptedRunner {
    fn run(
        &self,
        manifest_path: &Path,
        context: &mut ManifestContext<'_>,
    ) -> Result<(), RaisedError> {
        let root = manifest_path
            .parent()
            .unwrap_or_else(|| context.package_root())
            .to_path_buf();
        self.runs.borrow_mut().push(root.clone());
        let script = self.scripts.get(&root).ok_or_else(|| {
            RaisedError::new("UnknownEntryPoint", format!("no script for {}", root.display()))
        })?;
        script(context)
    }
}

/// Shared log of command invocations: `(command, args)`.
pub(crate) type Invocations = Arc<Mutex<Vec<(String, Vec<String>)>>>;

struct RecordingCommand {
    log: Invocations,
}

impl CommandHandler for RecordingCommand {
    fn exec(&mut self, command: &str, args: &[String]) -> Result<(), RaisedError> {
        self.log
            .lock()
            .map_err(|_| RaisedError::new("PoisonError", "invocation log poisoned"))?
            .push((command.to_owned(), args.to_vec()));
        Ok(())
    }
}

/// Command handler type that appends each invocation to `log`.
pub(crate) fn recording_command(log: &Invocations) -> CommandType {
    let log = Arc::clone(log);
    CommandType::new(move || -> Box<dyn CommandHandler> {
        Box::new(RecordingCommand {
            log: Arc::clone(&log),
        })
    })
}

/// Minimal source handler that exposes its options.
pub(crate) struct StubSource {
    options: SourceOptions,
}

impl From<SourceOptions> for StubSource {
    fn from(options: SourceOptions) -> Self {
        Self { options }
    }
}

impl SourceHandler for StubSource {
    fn options(&self) -> &SourceOptions {
        &self.options
    }
}

pub(crate) fn stub_source() -> SourceType {
    SourceType::of::<StubSource>()
}

/// Creates an on-disk plugin package named `name` under `parent`.
pub(crate) fn make_package(parent: &TempDir, name: &str) -> PackageLocation {
    let root = parent.path().join(name);
    std::fs::create_dir_all(root.join("lib")).expect("create package dir");
    PluginManifest::new(format!("{name}::register"))
        .write(&root)
        .expect("write manifest");
    PackageLocation::new(&root, vec![root.join("lib")])
}

#[derive(Default)]
struct Greeter;

impl CommandHandler for Greeter {
    fn exec(&mut self, _command: &str, args: &[String]) -> Result<(), RaisedError> {
        if args.is_empty() {
            return Err(RaisedError::new("ArgumentError", "nobody to greet"));
        }
        Ok(())
    }
}

fn register_greeter(context: &mut ManifestContext<'_>) -> Result<(), RaisedError> {
    context.declare_command("greet", CommandType::of::<Greeter>());
    Ok(())
}

#[test]
fn end_to_end_with_entry_catalog() {
    use crate::error::PluginError;
    use crate::host::PluginHost;
    use crate::registry::IndexStore;
    use crate::runner::EntryCatalog;

    let dir = TempDir::new().expect("temp dir");
    let package = make_package(&dir, "greeter");
    let catalog = EntryCatalog::new().with_entry("greeter::register", register_greeter);
    let mut host = PluginHost::new(
        IndexStore::open(dir.path().join("index.json")).expect("open index"),
        catalog,
    );

    host.register_discovery("greeter", &package, false)
        .expect("register greeter");
    assert!(host.has_command("greet"));
    assert!(host.ledger().is_empty());

    host.dispatch_command("greet", &["world".to_owned()])
        .expect("greet succeeds");
    let err = host
        .dispatch_command("greet", &[])
        .expect_err("greet without args fails");
    assert!(matches!(err, PluginError::CommandFailed { .. }));
    assert!(host.is_loaded("greeter"));
}

#[test]
fn entry_catalog_rejects_unknown_entry() {
    use crate::host::PluginHost;
    use crate::registry::IndexStore;
    use crate::runner::EntryCatalog;

    let dir = TempDir::new().expect("temp dir");
    let package = make_package(&dir, "stranger");
    let mut host = PluginHost::new(IndexStore::in_memory(), EntryCatalog::new());

    let err = host
        .register_discovery("stranger", &package, false)
        .expect_err("entry is not linked in");

    assert!(err.to_string().contains("UnknownEntryPoint"), "{err}");
}
