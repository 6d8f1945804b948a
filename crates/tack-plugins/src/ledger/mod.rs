//! Capability ledger mapping command, source, and hook names to handlers.
//!
//! Plugins declare what they provide by filling a [`CapabilityLedger`] with
//! handler-type references: a [`CommandType`] per command name, a
//! [`SourceType`] per source type, and any number of [`Hook`]s per
//! [`HookEvent`]. The ledger only stores references; handler instances are
//! created on demand when a request is routed to them.
//!
//! The host keeps one live ledger for routing. Discovery runs each manifest
//! against its own scratch ledger so an in-progress registration can never
//! leak entries into the live one.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::RaisedError;
use crate::events::HookEvent;
use crate::source::SourceOptions;

/// Heading written at the top of a plugin source's lockfile stanza.
pub const LOCK_SECTION: &str = "PLUGIN SOURCE";

/// Contract implemented by plugin-provided commands.
pub trait CommandHandler {
    /// Runs the command.
    ///
    /// `command` is the name the user invoked, allowing one handler type to
    /// serve several command names.
    ///
    /// # Errors
    ///
    /// Returns a [`RaisedError`] describing why the command failed.
    fn exec(&mut self, command: &str, args: &[String]) -> Result<(), RaisedError>;
}

/// Contract implemented by plugin-provided dependency sources.
pub trait SourceHandler {
    /// Returns the options the handler was constructed from.
    fn options(&self) -> &SourceOptions;

    /// Returns where the source lives.
    fn uri(&self) -> &str {
        self.options().uri().unwrap_or_default()
    }

    /// Returns the source type this handler was registered under.
    fn source_type(&self) -> &str {
        self.options().source_type().unwrap_or_default()
    }

    /// Extra options to record in the lockfile next to `remote` and `type`.
    fn options_to_lock(&self) -> SourceOptions {
        SourceOptions::new()
    }

    /// Renders the lockfile stanza for this source.
    ///
    /// # Example
    ///
    /// ```
    /// use tack_plugins::{SourceHandler, SourceOptions};
    ///
    /// struct Git(SourceOptions);
    /// impl SourceHandler for Git {
    ///     fn options(&self) -> &SourceOptions {
    ///         &self.0
    ///     }
    /// }
    ///
    /// let git = Git(SourceOptions::from_iter([("type", "git"), ("uri", "u")]));
    /// assert_eq!(git.to_lock(), "PLUGIN SOURCE\n  remote: u\n  type: git\n  specs:\n");
    /// ```
    fn to_lock(&self) -> String {
        let mut out = format!("{LOCK_SECTION}\n");
        out.push_str(&format!("  remote: {}\n", self.uri()));
        out.push_str(&format!("  type: {}\n", self.source_type()));
        for (key, value) in self.options_to_lock().iter() {
            out.push_str(&format!("  {key}: {value}\n"));
        }
        out.push_str("  specs:\n");
        out
    }
}

type CommandFactory = dyn Fn() -> Box<dyn CommandHandler> + Send + Sync;
type SourceFactory = dyn Fn(SourceOptions) -> Box<dyn SourceHandler> + Send + Sync;
type HookCallback = dyn Fn(&[String]) -> Result<(), RaisedError> + Send + Sync;

/// Reference to a command handler type.
#[derive(Clone)]
pub struct CommandType(Arc<CommandFactory>);

impl CommandType {
    /// Wraps a factory producing handler instances.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Box<dyn CommandHandler> + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    /// Reference to a handler type constructed through [`Default`].
    #[must_use]
    pub fn of<H>() -> Self
    where
        H: CommandHandler + Default + 'static,
    {
        Self::new(|| -> Box<dyn CommandHandler> { Box::new(H::default()) })
    }

    /// Creates a fresh handler instance.
    #[must_use]
    pub fn instantiate(&self) -> Box<dyn CommandHandler> {
        (self.0)()
    }

    /// Returns `true` when both references share one factory.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandType").finish_non_exhaustive()
    }
}

/// Reference to a source handler type.
#[derive(Clone)]
pub struct SourceType(Arc<SourceFactory>);

impl SourceType {
    /// Wraps a factory producing handler instances from options.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(SourceOptions) -> Box<dyn SourceHandler> + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    /// Reference to a handler type constructed from its options.
    #[must_use]
    pub fn of<H>() -> Self
    where
        H: SourceHandler + From<SourceOptions> + 'static,
    {
        Self::new(|options| -> Box<dyn SourceHandler> { Box::new(H::from(options)) })
    }

    /// Creates a handler instance from `options`.
    #[must_use]
    pub fn instantiate(&self, options: SourceOptions) -> Box<dyn SourceHandler> {
        (self.0)(options)
    }

    /// Returns `true` when both references share one factory.
    #[must_use]
    pub fn same_type(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceType").finish_non_exhaustive()
    }
}

/// Callback run when a lifecycle event fires.
#[derive(Clone)]
pub struct Hook(Arc<HookCallback>);

impl Hook {
    /// Wraps a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[String]) -> Result<(), RaisedError> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Runs the callback.
    ///
    /// # Errors
    ///
    /// Propagates the callback's failure.
    pub fn call(&self, args: &[String]) -> Result<(), RaisedError> {
        (self.0)(args)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").finish_non_exhaustive()
    }
}

/// Name-indexed capability declarations.
///
/// # Example
///
/// ```
/// use tack_plugins::{CapabilityLedger, CommandHandler, CommandType, RaisedError};
///
/// #[derive(Default)]
/// struct Greet;
/// impl CommandHandler for Greet {
///     fn exec(&mut self, _command: &str, _args: &[String]) -> Result<(), RaisedError> {
///         Ok(())
///     }
/// }
///
/// let mut ledger = CapabilityLedger::new();
/// ledger.declare_command("greet", CommandType::of::<Greet>());
/// assert!(ledger.has_command("greet"));
/// assert!(!ledger.has_source("greet"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapabilityLedger {
    commands: HashMap<String, CommandType>,
    sources: HashMap<String, SourceType>,
    hooks: BTreeMap<HookEvent, Vec<Hook>>,
}

impl CapabilityLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` as a command served by `handler`, replacing any
    /// earlier declaration of the same name.
    pub fn declare_command(&mut self, name: impl Into<String>, handler: CommandType) {
        self.commands.insert(name.into(), handler);
    }

    /// Declares `name` as a source type served by `handler`, replacing any
    /// earlier declaration of the same name.
    pub fn declare_source(&mut self, name: impl Into<String>, handler: SourceType) {
        self.sources.insert(name.into(), handler);
    }

    /// Appends a hook for `event`.
    pub fn declare_hook(&mut self, event: HookEvent, hook: Hook) {
        self.hooks.entry(event).or_default().push(hook);
    }

    /// Looks up the handler type for a command.
    #[must_use]
    pub fn command(&self, name: &str) -> Option<&CommandType> {
        self.commands.get(name)
    }

    /// Looks up the handler type for a source type.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceType> {
        self.sources.get(name)
    }

    /// Returns the hooks declared for `event`, in declaration order.
    #[must_use]
    pub fn hooks(&self, event: HookEvent) -> &[Hook] {
        self.hooks.get(&event).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` when `name` is a declared command.
    #[must_use]
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Returns `true` when `name` is a declared source type.
    #[must_use]
    pub fn has_source(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Returns the declared command names, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        sorted_keys(&self.commands)
    }

    /// Returns the declared source names, sorted.
    #[must_use]
    pub fn source_names(&self) -> Vec<String> {
        sorted_keys(&self.sources)
    }

    /// Returns the events with at least one hook, in event order.
    #[must_use]
    pub fn hook_events(&self) -> Vec<HookEvent> {
        self.hooks
            .iter()
            .filter(|(_, hooks)| !hooks.is_empty())
            .map(|(event, _)| *event)
            .collect()
    }

    /// Moves every declaration from `other` into this ledger. Commands and
    /// sources from `other` win on name clashes; hooks are appended.
    pub fn absorb(&mut self, other: Self) {
        self.commands.extend(other.commands);
        self.sources.extend(other.sources);
        for (event, hooks) in other.hooks {
            self.hooks.entry(event).or_default().extend(hooks);
        }
    }

    /// Returns `true` when nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.sources.is_empty() && self.hook_events().is_empty()
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}
