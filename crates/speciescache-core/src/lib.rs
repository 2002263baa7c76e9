//! Offline mirror of the species bundle.
//!
//! Two cooperating pieces keep the species app usable without a network:
//!
//! - [`sync::SyncEngine`] pulls the versioned bundle, replaces the species
//!   records in the [`store::LocalStore`], and downloads media payloads
//!   through the bounded executor in [`pool`]. Per-item download failures
//!   are recorded, not fatal.
//! - [`cache::AssetCacheController`] precaches the application shell and
//!   serves requests cache-first, falling back to the network and then to
//!   offline substitutes.
//!
//! Network, storage and cache access are injected as traits
//! ([`http::HttpTransport`], [`store::LocalStore`], [`cache::CacheStorage`]),
//! so both pieces run against in-memory fakes in tests.

pub mod cache;
pub mod config;
pub mod http;
pub mod models;
pub mod pool;
pub mod store;
pub mod sync;

pub use cache::{AssetCacheController, CacheMessage, ControllerConfig, ControllerHandle};
pub use config::Config;
pub use http::{FetchError, HttpTransport, ReqwestTransport};
pub use store::{JsonFileStore, LocalStore, MemoryStore, Partition, StoreError};
pub use sync::{SyncEngine, SyncError, SyncOptions, SyncProgress, SyncReport};
