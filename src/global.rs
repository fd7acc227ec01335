//! Process-wide default registry
//!
//! Most code should construct a [`Registry`] and pass it around. This
//! module exists for callers that want one shared instance: it is built at
//! most once and never replaced while the process lives.

use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::registry::{Registry, RegistryState};

static DEFAULT: OnceLock<Mutex<Registry>> = OnceLock::new();

/// Build the default registry, or return the existing one
///
/// Repeated calls are no-ops; `config` is only used by the first call that
/// succeeds.
pub fn init(config: Config) -> Result<&'static Mutex<Registry>> {
    if let Some(registry) = DEFAULT.get() {
        return Ok(registry);
    }

    let registry = Registry::new(config)?;
    Ok(DEFAULT.get_or_init(|| Mutex::new(registry)))
}

/// The default registry, if `init` has run
pub fn registry() -> Option<&'static Mutex<Registry>> {
    DEFAULT.get()
}

/// Aggregate state of the default registry
///
/// Locks the registry: calling this while holding its guard deadlocks.
pub fn state() -> RegistryState {
    match DEFAULT.get() {
        Some(registry) => registry.lock().state(),
        None => RegistryState::Uninitialized,
    }
}
