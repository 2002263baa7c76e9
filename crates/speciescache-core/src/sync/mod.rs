//! Bundle synchronization.
//!
//! [`SyncEngine`] mirrors the remote species bundle into a [`LocalStore`]:
//! species records in both locales, plus media payloads downloaded with
//! bounded concurrency. The bundle version is the only change signal; there
//! is no per-record diffing.
//!
//! [`LocalStore`]: crate::store::LocalStore

pub mod engine;
pub mod error;
pub mod options;
pub mod progress;
pub mod status;
pub mod warmer;

pub use engine::{SyncEngine, SyncOutcome, SyncReport};
pub use error::SyncError;
pub use options::SyncOptions;
pub(crate) use progress::ProgressReporter;
pub use progress::{ProgressCallback, SyncPhase, SyncProgress};
pub use status::{local_status, LocalStatus};
pub use warmer::MediaWarmer;
