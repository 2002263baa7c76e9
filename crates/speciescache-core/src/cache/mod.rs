//! Asset cache controller and its cache storage.
//!
//! The controller keeps application assets available offline: it precaches
//! a manifest into a named generation, prunes stale generations, and answers
//! same-origin requests cache-first with network and offline fallbacks.
//!
//! Storage backends:
//! - `MemoryCacheStorage`: in-process, for tests
//! - `DiskCacheStorage`: one directory per generation

pub mod controller;
pub mod disk;
pub mod error;
pub mod memory;
pub mod message;
pub mod storage;

pub use controller::{
    ActivateReport, AssetCacheController, ControllerConfig, FetchDecision, InstallReport,
    LifecyclePhase, ResponseSource, WarmReport,
};
pub use disk::DiskCacheStorage;
pub use error::CacheError;
pub use memory::{MemoryCache, MemoryCacheStorage};
pub use message::{spawn_message_loop, CacheMessage, ControllerHandle};
pub use storage::{AssetCache, CacheStorage};
