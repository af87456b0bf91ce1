//! Process-wide singletons the §6.3 controllers need (storage adapter,
//! durable queue) that loco's `AppContext` has no slot for, since they are
//! core-specific abstractions (C1, C3) rather than framework-level
//! concerns. `initializers::core_initializer::CoreInitializer` builds these
//! once at boot and publishes them here; everything after that reads the
//! same `Arc`s the background workers run against.

use crate::cdn::purge::CdnPurger;
use crate::common::settings::Settings;
use crate::queue::JobQueue;
use crate::storage::StorageAdapter;
use std::sync::{Arc, OnceLock};

pub struct CoreServices {
    pub storage: Arc<dyn StorageAdapter>,
    pub queue: Arc<dyn JobQueue>,
    pub cdn_purger: Arc<CdnPurger>,
    pub settings: Settings,
}

static CORE: OnceLock<Arc<CoreServices>> = OnceLock::new();

/// Called exactly once, from `CoreInitializer::before_run`.
///
/// # Panics
/// if called more than once.
pub fn init(services: Arc<CoreServices>) {
    CORE.set(services)
        .unwrap_or_else(|_| panic!("core services already initialized"));
}

/// # Panics
/// if called before `init` (i.e. outside a fully booted process — never
/// true once `CoreInitializer` has run).
#[must_use]
pub fn get() -> Arc<CoreServices> {
    CORE.get().expect("core services not initialized").clone()
}
