//! Process-wide gateway instance.
//!
//! At most one shared gateway exists per process. The first successful
//! initialisation wins; concurrent first accesses all observe the same
//! instance and the constructor runs exactly once.

use std::sync::OnceLock;
use tracing::debug;

use crate::error::{IdentityError, IdentityResult};
use crate::gateway::IdentityGateway;

static SHARED: OnceLock<IdentityGateway> = OnceLock::new();

/// Install `gateway` as the shared instance.
///
/// # Errors
/// Returns `IdentityError::AlreadyInitialized` if an instance exists; the
/// passed gateway is dropped.
pub fn install(gateway: IdentityGateway) -> IdentityResult<&'static IdentityGateway> {
    let mut installed = false;
    let shared = SHARED.get_or_init(|| {
        installed = true;
        gateway
    });

    if installed {
        debug!("Shared identity gateway installed");
        Ok(shared)
    } else {
        Err(IdentityError::AlreadyInitialized)
    }
}

/// The shared instance.
///
/// # Errors
/// Returns `IdentityError::NotInitialized` before `install` or `get_or_init`.
pub fn get() -> IdentityResult<&'static IdentityGateway> {
    SHARED.get().ok_or(IdentityError::NotInitialized)
}

/// The shared instance, built by `init` on first access.
///
/// Concurrent callers block until the single `init` call returns.
pub fn get_or_init(init: impl FnOnce() -> IdentityGateway) -> &'static IdentityGateway {
    SHARED.get_or_init(init)
}
