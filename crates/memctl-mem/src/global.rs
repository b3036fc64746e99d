//! Process-wide access point for the active controller.
//!
//! Engines that pass the controller explicitly (and all tests) should build
//! their own `SharedController`. This cell exists for call sites that cannot be
//! threaded through, and it is set at most once per process.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use memctl_core::config::MemControlConfig;
use memctl_core::error::{Error, Result};

use crate::controller::SharedController;

static GLOBAL: OnceCell<Arc<SharedController>> = OnceCell::new();

/// Build the controller for `cfg` and install it. Fails if one is already installed.
pub fn install(cfg: &MemControlConfig) -> Result<Arc<SharedController>> {
    let controller = Arc::new(SharedController::from_config(cfg)?);
    GLOBAL
        .set(Arc::clone(&controller))
        .map_err(|_| Error::AlreadyInitialized)?;
    Ok(controller)
}

/// The installed controller, if any.
pub fn get() -> Option<Arc<SharedController>> {
    GLOBAL.get().cloned()
}

/// The installed controller, building it from the environment on first use.
pub fn get_or_init() -> Result<Arc<SharedController>> {
    GLOBAL
        .get_or_try_init(|| SharedController::from_config(&MemControlConfig::from_env()).map(Arc::new))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use memctl_core::controller::MemoryController;

    // The cell is process-global, so everything lives in one test.
    #[test]
    fn install_once_then_share() {
        let cfg = MemControlConfig::with_byte_thresholds(1000, 100, 200);
        let first = install(&cfg).unwrap();
        assert!(matches!(install(&cfg), Err(Error::AlreadyInitialized)));

        let again = get().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert!(Arc::ptr_eq(&first, &get_or_init().unwrap()));

        let user = again.register_user();
        first.acquire_usage(user, 10);
        assert_eq!(again.total_usage(), 10);
        first.clear();
    }
}
