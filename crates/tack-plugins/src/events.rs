//! Lifecycle events that plugins may hook into.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Point in the package manager's lifecycle at which hooks run.
///
/// # Example
///
/// ```
/// use std::str::FromStr;
/// use tack_plugins::HookEvent;
///
/// let event = HookEvent::from_str("before-install-all").expect("known event");
/// assert_eq!(event, HookEvent::BeforeInstallAll);
/// assert_eq!(event.to_string(), "before-install-all");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HookEvent {
    /// Before any dependency of the current install is installed.
    BeforeInstallAll,
    /// Before each individual dependency is installed.
    BeforeInstall,
    /// After each individual dependency is installed.
    AfterInstall,
    /// After every dependency of the current install has been installed.
    AfterInstallAll,
    /// Before any dependency is required.
    BeforeRequireAll,
    /// Before each individual dependency is required.
    BeforeRequire,
    /// After each individual dependency is required.
    AfterRequire,
    /// After every dependency has been required.
    AfterRequireAll,
}

impl HookEvent {
    /// Returns the canonical kebab-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}
