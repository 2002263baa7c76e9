//! Local store contract and implementations.
//!
//! Four partitions make up the offline mirror:
//! - `species_en`, `species_tet`: species records keyed by `species_id`
//! - `media`: media descriptors plus downloaded blobs, keyed by `media_id`
//! - `metadata`: scalar values keyed by `key` (`bundle_version`)

pub mod error;
pub mod file;
pub mod local;
pub mod memory;
pub mod partition;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use partition::{canonical_key, Partition};
