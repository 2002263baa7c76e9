use async_trait::async_trait;

use super::{AssetRequest, AssetResponse, FetchError};

/// Network access used by the sync engine and the asset cache controller.
///
/// A transport-level failure (no connection, reset, unreadable body) is an
/// `Err`. Any response the server actually produced, including 4xx and 5xx,
/// is returned as `Ok` and the caller decides what a bad status means.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError>;
}
