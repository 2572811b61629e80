// Cache module.
// Stale-while-revalidate serving over pluggable entry stores.

pub mod paths;
pub mod store;
pub mod swr;
pub mod tasks;

pub use paths::cache_dir;
pub use store::{
    CacheEntry, CacheStore, DEFAULT_REVALIDATE, DEFAULT_STALE_FOR, FileStore, MemoryStore,
    Payload, TtlPolicy,
};
pub use swr::{CacheStatus, DEFAULT_SWEEP_INTERVAL, Served, SwrCache};
pub use tasks::{BackgroundTasks, TokioTasks};

#[cfg(test)]
pub use tasks::ManualTasks;
