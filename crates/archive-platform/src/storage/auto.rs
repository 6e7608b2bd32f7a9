//! Backend selection.
//!
//! Priority for `Auto`: localStorage → Memory (fallback)

use std::rc::Rc;
use archive_core::ports::StoragePort;
use archive_types::config::StorageBackendType;
use super::{LocalStorage, MemoryStorage};

/// Open the configured backend, falling back to memory when it is
/// unavailable. Returns a trait object so callers are backend-agnostic.
pub fn open_storage(backend: StorageBackendType) -> Rc<dyn StoragePort> {
    match backend {
        StorageBackendType::Memory => {
            log::info!("Storage backend: memory");
            Rc::new(MemoryStorage::new())
        }
        StorageBackendType::Auto | StorageBackendType::LocalStorage => match LocalStorage::open() {
            Ok(local) => {
                log::info!("Storage backend: localStorage");
                Rc::new(local)
            }
            Err(e) => {
                log::warn!("localStorage unavailable ({}), falling back to memory", e);
                Rc::new(MemoryStorage::new())
            }
        },
    }
}
