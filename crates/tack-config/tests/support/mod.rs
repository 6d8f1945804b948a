//! Environment isolation shared by the configuration integration tests.

use std::ffi::OsString;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Variables the loader reads, cleared while a guard is held.
const TACK_VARIABLES: &[&str] = &[
    "TACK_CONFIG_PATH",
    "TACK_PLUGIN_ROOT",
    "TACK_LOG_FILTER",
    "TACK_LOG_FORMAT",
];

/// Serialises environment access and restores every touched variable on drop.
pub struct EnvGuard {
    saved: Vec<(String, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Acquires the environment and clears every `TACK_*` variable.
    pub fn acquire() -> Self {
        let lock = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut guard = Self {
            saved: Vec::new(),
            _lock: lock,
        };
        for key in TACK_VARIABLES {
            guard.remove(key);
        }
        guard
    }

    /// Sets `key` to `value` until the guard drops.
    pub fn set(&mut self, key: &str, value: impl Into<OsString>) {
        self.saved.push((key.to_owned(), std::env::var_os(key)));
        // Environment mutation is unsafe in edition 2024; the mutex keeps
        // tests in this binary from racing on it.
        unsafe { std::env::set_var(key, value.into()) };
    }

    fn remove(&mut self, key: &str) {
        self.saved.push((key.to_owned(), std::env::var_os(key)));
        unsafe { std::env::remove_var(key) };
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        while let Some((key, value)) = self.saved.pop() {
            match value {
                Some(value) => unsafe { std::env::set_var(&key, value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}
