//! HTTP access for bundle, media and asset fetches.
//!
//! The sync engine and the asset cache controller never talk to reqwest
//! directly; they go through the [`HttpTransport`] trait so tests can
//! substitute `testing::FakeTransport` (built for tests and with the
//! `testing` feature).

pub mod client;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod types;

pub use client::ReqwestTransport;
pub use error::FetchError;
pub use transport::HttpTransport;
pub use types::{AssetRequest, AssetResponse, CacheMode, Destination, RequestMode};
