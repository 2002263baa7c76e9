use thiserror::Error;

use crate::http::FetchError;
use crate::store::StoreError;

/// Fatal sync failures. Anything here aborts the sync before the bundle
/// version is committed.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Bundle fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Local store failed: {0}")]
    Store(#[from] StoreError),
}
