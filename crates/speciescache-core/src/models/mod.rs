//! Data models for the species bundle.
//!
//! - `Bundle`: the remote payload and its version rules
//! - `MediaItem`, `MediaRecord`: normalized media descriptors and their
//!   persisted form
//! - `RecordId`: integer-or-string identifiers used upstream

pub mod bundle;
pub mod id;
pub mod media;

pub use bundle::{parse_version, Bundle, BUNDLE_VERSION_KEY, DEFAULT_BUNDLE_VERSION};
pub use id::RecordId;
pub use media::{has_cached_blob, MediaItem, MediaRecord, FALLBACK_CONTENT_TYPE};
