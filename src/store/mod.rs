pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use anyhow::Result;
pub use disk::DiskStore;
pub use memory::MemoryStore;

/// Opens the persistent reference store under the configured data path.
pub fn open_store(config: &AppConfig) -> Result<DiskStore> {
    let path = config.default_data_path()?.join("store");
    DiskStore::open(&path)
}
