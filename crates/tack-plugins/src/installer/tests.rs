//! Unit tests for install orchestration.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use mockall::mock;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::error::RaisedError;
use crate::registry::IndexStore;
use crate::tests::{Invocations, ScriptedRunner, make_package, recording_command, stub_source};

mock! {
    Installer {}
    impl PackageInstaller for Installer {
        fn install(
            &self,
            names: &[String],
            options: &InstallOptions,
        ) -> Result<BTreeMap<String, PackageLocation>, PluginError>;
        fn install_dependencies(
            &self,
            dependencies: &[Dependency],
        ) -> Result<BTreeMap<String, PackageLocation>, PluginError>;
    }
}

mock! {
    Parser {}
    impl DeclarationParser for Parser {
        fn evaluate(&self, source: &DeclarationSource) -> Result<Declaration, PluginError>;
    }
}

#[derive(Debug)]
struct NameError;

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("uninitialized constant")
    }
}

impl std::error::Error for NameError {}

struct World {
    dir: TempDir,
    runner: ScriptedRunner,
}

#[fixture]
fn world() -> World {
    World {
        dir: TempDir::new().expect("temp dir"),
        runner: ScriptedRunner::new(),
    }
}

impl World {
    fn command_package(&mut self, name: &str, command: &'static str) -> PackageLocation {
        let package = make_package(&self.dir, name);
        let handler = recording_command(&Invocations::default());
        self.runner.script(package.root(), move |context| {
            context.declare_command(command, handler.clone());
            Ok(())
        });
        package
    }

    fn source_package(&mut self, name: &str, source: &'static str) -> PackageLocation {
        let package = make_package(&self.dir, name);
        self.runner.script(package.root(), move |context| {
            context.declare_source(source, stub_source());
            Ok(())
        });
        package
    }

    fn broken_package(&mut self, name: &str) -> PackageLocation {
        let package = make_package(&self.dir, name);
        self.runner
            .script(package.root(), |_| Err(RaisedError::from(NameError)));
        package
    }

    fn host(self) -> (TempDir, PluginHost<IndexStore, ScriptedRunner>) {
        (self.dir, PluginHost::new(IndexStore::in_memory(), self.runner))
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn packages(locations: &[(&str, &PackageLocation)]) -> BTreeMap<String, PackageLocation> {
    locations
        .iter()
        .map(|(name, location)| ((*name).to_owned(), (*location).clone()))
        .collect()
}

fn installer_returning(result: BTreeMap<String, PackageLocation>) -> MockInstaller {
    let mut installer = MockInstaller::new();
    installer
        .expect_install()
        .times(1)
        .return_once(move |_, _| Ok(result));
    installer
}

fn parser_returning(declaration: Declaration) -> MockParser {
    let mut parser = MockParser::new();
    parser
        .expect_evaluate()
        .times(1)
        .return_once(move |_| Ok(declaration));
    parser
}

fn declaration(dependencies: &[&str], inferred: &[&str]) -> Declaration {
    Declaration {
        dependencies: dependencies.iter().copied().map(Dependency::new).collect(),
        inferred: inferred.iter().map(|name| (*name).to_owned()).collect(),
    }
}

fn inline() -> DeclarationSource {
    DeclarationSource::Inline("plugin 'alpha'".to_owned())
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[rstest]
#[case::branch_and_ref(Some("main"), Some("abc123"), Some("https://example.test/p.git"), None)]
#[case::branch_without_git(Some("main"), None, None, None)]
#[case::ref_without_git(None, Some("abc123"), None, None)]
#[case::git_and_path(None, None, Some("https://example.test/p.git"), Some("vendor/p"))]
fn contradictory_options_are_rejected(
    #[case] branch: Option<&str>,
    #[case] git_ref: Option<&str>,
    #[case] git: Option<&str>,
    #[case] path: Option<&str>,
) {
    let options = InstallOptions {
        branch: branch.map(str::to_owned),
        git_ref: git_ref.map(str::to_owned),
        git: git.map(str::to_owned),
        path: path.map(PathBuf::from),
        ..InstallOptions::default()
    };
    let err = options.validate().expect_err("options conflict");
    assert!(matches!(err, PluginError::InvalidOption { .. }));
}

#[test]
fn git_with_branch_is_valid() {
    let options = InstallOptions {
        git: Some("https://example.test/p.git".to_owned()),
        branch: Some("main".to_owned()),
        ..InstallOptions::default()
    };
    assert!(options.validate().is_ok());
}

// ---------------------------------------------------------------------------
// install
// ---------------------------------------------------------------------------

#[rstest]
fn install_registers_every_package(mut world: World) {
    let alpha = world.command_package("alpha", "foo");
    let beta = world.source_package("beta", "bar");
    let installer = installer_returning(packages(&[("alpha", &alpha), ("beta", &beta)]));
    let (_dir, mut host) = world.host();

    host.install(&installer, &names(&["alpha", "beta"]), &InstallOptions::default())
        .expect("install succeeds");

    assert!(host.has_command("foo"));
    assert!(host.has_source("bar"));
    assert!(!host.has_command("bar"));
    let listed: Vec<String> = host.list().into_iter().map(|record| record.name).collect();
    assert_eq!(listed, names(&["alpha", "beta"]));
    assert!(host.ledger().is_empty());
}

#[rstest]
fn install_registers_in_requested_order(mut world: World) {
    let zeta = world.source_package("zeta", "git");
    let alpha = world.source_package("alpha", "git");
    let installer = installer_returning(packages(&[("zeta", &zeta), ("alpha", &alpha)]));
    let (_dir, mut host) = world.host();

    host.install(&installer, &names(&["zeta", "alpha"]), &InstallOptions::default())
        .expect("install succeeds");

    assert_eq!(host.store().source_owner("git").as_deref(), Some("alpha"));
}

#[rstest]
fn install_treats_unreturned_package_as_failure(mut world: World) {
    let alpha = world.command_package("alpha", "foo");
    let installer = installer_returning(packages(&[("alpha", &alpha)]));
    let (_dir, mut host) = world.host();

    host.install(&installer, &names(&["alpha", "ghost"]), &InstallOptions::default())
        .expect("failure is not propagated");

    assert!(host.store().installed("alpha").is_some());
    assert!(host.store().installed("ghost").is_none());
    assert!(!alpha.root().exists());
}

#[rstest]
fn install_validates_options_before_installing(world: World) {
    let mut installer = MockInstaller::new();
    installer.expect_install().never();
    let (_dir, mut host) = world.host();
    let options = InstallOptions {
        git: Some("https://example.test/p.git".to_owned()),
        branch: Some("main".to_owned()),
        git_ref: Some("abc123".to_owned()),
        ..InstallOptions::default()
    };

    let err = host
        .install(&installer, &names(&["alpha"]), &options)
        .expect_err("options conflict");

    assert!(matches!(err, PluginError::InvalidOption { .. }));
}

#[rstest]
fn install_returns_installer_failures(world: World) {
    let mut installer = MockInstaller::new();
    installer.expect_install().return_once(|_, _| {
        Err(PluginError::Installer {
            message: "no such package".to_owned(),
        })
    });
    let (_dir, mut host) = world.host();

    let err = host
        .install(&installer, &names(&["ghost"]), &InstallOptions::default())
        .expect_err("installer fails");

    assert!(matches!(err, PluginError::Installer { .. }));
}

#[rstest]
fn install_swallows_registration_failure_and_cleans_up(mut world: World) {
    let alpha = world.command_package("alpha", "foo");
    let broken = world.broken_package("broken");
    let installer = installer_returning(packages(&[("alpha", &alpha), ("broken", &broken)]));
    let (_dir, mut host) = world.host();

    host.install(&installer, &names(&["alpha", "broken"]), &InstallOptions::default())
        .expect("failure is not propagated");

    assert!(!alpha.root().exists());
    assert!(!broken.root().exists());
    assert!(host.store().installed("alpha").is_some());
    assert!(host.store().installed("broken").is_none());
    assert!(host.ledger().is_empty());
}

#[rstest]
fn install_treats_missing_manifest_as_failure(world: World) {
    let root = world.dir.path().join("bare");
    std::fs::create_dir_all(root.join("lib")).expect("create package");
    let bare = PackageLocation::new(&root, vec![root.join("lib")]);
    let installer = installer_returning(packages(&[("bare", &bare)]));
    let (_dir, mut host) = world.host();

    host.install(&installer, &names(&["bare"]), &InstallOptions::default())
        .expect("failure is not propagated");

    assert!(!root.exists());
    assert!(host.store().installed("bare").is_none());
    assert_eq!(host.runner().runs(), 0);
}

// ---------------------------------------------------------------------------
// install_from_declaration
// ---------------------------------------------------------------------------

#[rstest]
fn empty_declaration_is_a_no_op(world: World) {
    let parser = parser_returning(Declaration::default());
    let mut installer = MockInstaller::new();
    installer.expect_install_dependencies().never();
    let (_dir, mut host) = world.host();

    host.install_from_declaration(&parser, &installer, &inline())
        .expect("nothing to do");

    assert!(host.list().is_empty());
}

#[rstest]
fn declaration_skips_installed_plugins(mut world: World) {
    let alpha = world.command_package("alpha", "foo");
    let beta = world.command_package("beta", "bar");
    let parser = parser_returning(declaration(&["alpha", "beta"], &[]));
    let mut installer = MockInstaller::new();
    let beta_only = packages(&[("beta", &beta)]);
    installer
        .expect_install_dependencies()
        .withf(|dependencies| {
            dependencies
                .iter()
                .map(|dependency| dependency.name.as_str())
                .eq(["beta"])
        })
        .times(1)
        .return_once(move |_| Ok(beta_only));
    let (_dir, mut host) = world.host();
    host.register_discovery("alpha", &alpha, false)
        .expect("pre-install alpha");

    host.install_from_declaration(&parser, &installer, &inline())
        .expect("declaration installs");

    assert!(host.has_command("bar"));
    assert_eq!(host.runner().runs_for(alpha.root()), 1);
}

#[rstest]
fn declaration_registers_in_declared_order(mut world: World) {
    let zeta = world.source_package("zeta", "git");
    let alpha = world.source_package("alpha", "git");
    let parser = parser_returning(declaration(&["zeta", "alpha"], &[]));
    let mut installer = MockInstaller::new();
    let pending = packages(&[("zeta", &zeta), ("alpha", &alpha)]);
    installer
        .expect_install_dependencies()
        .return_once(move |_| Ok(pending));
    let (_dir, mut host) = world.host();

    host.install_from_declaration(&parser, &installer, &inline())
        .expect("declaration installs");

    assert_eq!(host.store().source_owner("git").as_deref(), Some("alpha"));
}

#[rstest]
fn declaration_with_only_installed_plugins_installs_nothing(mut world: World) {
    let alpha = world.command_package("alpha", "foo");
    let parser = parser_returning(declaration(&["alpha"], &[]));
    let mut installer = MockInstaller::new();
    installer.expect_install_dependencies().never();
    let (_dir, mut host) = world.host();
    host.register_discovery("alpha", &alpha, false)
        .expect("pre-install alpha");

    host.install_from_declaration(&parser, &installer, &inline())
        .expect("nothing pending");
}

#[rstest]
fn inferred_plugins_register_as_optional(mut world: World) {
    let incumbent = world.source_package("incumbent", "git");
    let fallback = world.source_package("fallback", "git");
    let parser = parser_returning(declaration(&["fallback"], &["fallback"]));
    let mut installer = MockInstaller::new();
    let pending = packages(&[("fallback", &fallback)]);
    installer
        .expect_install_dependencies()
        .return_once(move |_| Ok(pending));
    let (_dir, mut host) = world.host();
    host.register_discovery("incumbent", &incumbent, false)
        .expect("pre-install incumbent");

    host.install_from_declaration(&parser, &installer, &inline())
        .expect("conflict is not an error");

    assert_eq!(host.store().source_owner("git").as_deref(), Some("incumbent"));
    assert!(host.store().installed("fallback").is_none());
    assert!(!fallback.root().exists());
}

#[rstest]
fn declaration_failures_are_returned_without_cleanup(mut world: World) {
    let broken = world.broken_package("broken");
    let parser = parser_returning(declaration(&["broken"], &[]));
    let mut installer = MockInstaller::new();
    let pending = packages(&[("broken", &broken)]);
    installer
        .expect_install_dependencies()
        .return_once(move |_| Ok(pending));
    let (_dir, mut host) = world.host();

    let err = host
        .install_from_declaration(&parser, &installer, &inline())
        .expect_err("registration fails");

    assert!(matches!(err, PluginError::MalformedPlugin { .. }));
    assert!(err.to_string().contains("NameError"), "{err}");
    assert!(broken.root().exists());
}

#[rstest]
fn declaration_parse_errors_are_returned(world: World) {
    let mut parser = MockParser::new();
    parser.expect_evaluate().return_once(|_| {
        Err(PluginError::Declaration {
            message: "unexpected token".to_owned(),
        })
    });
    let mut installer = MockInstaller::new();
    installer.expect_install_dependencies().never();
    let (_dir, mut host) = world.host();

    let err = host
        .install_from_declaration(&parser, &installer, &DeclarationSource::File("Pluginfile".into()))
        .expect_err("parse fails");

    assert!(matches!(err, PluginError::Declaration { .. }));
}

// ---------------------------------------------------------------------------
// uninstall and list
// ---------------------------------------------------------------------------

#[rstest]
fn uninstall_removes_package_and_record(mut world: World) {
    let alpha = world.command_package("alpha", "foo");
    let beta = world.command_package("beta", "bar");
    let (_dir, mut host) = world.host();
    host.register_discovery("alpha", &alpha, false)
        .expect("register alpha");
    host.register_discovery("beta", &beta, false)
        .expect("register beta");

    host.uninstall(&names(&["alpha", "ghost"]))
        .expect("unknown names are skipped");

    assert!(!alpha.root().exists());
    assert!(!host.has_command("foo"));
    assert!(host.has_command("bar"));
    assert_eq!(
        host.list().into_iter().map(|record| record.name).collect::<BTreeSet<_>>(),
        BTreeSet::from(["beta".to_owned()])
    );
}

#[rstest]
fn uninstall_all_empties_the_store(mut world: World) {
    let alpha = world.command_package("alpha", "foo");
    let beta = world.source_package("beta", "bar");
    let (_dir, mut host) = world.host();
    host.register_discovery("alpha", &alpha, false)
        .expect("register alpha");
    host.register_discovery("beta", &beta, false)
        .expect("register beta");

    host.uninstall_all().expect("uninstall all");

    assert!(host.list().is_empty());
    assert!(!alpha.root().exists());
    assert!(!beta.root().exists());
    host.uninstall_all().expect("nothing left is not an error");
}
