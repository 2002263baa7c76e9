//! Page → controller messaging.
//!
//! The sync engine reaches the controller through a [`ControllerHandle`],
//! which implements [`MediaWarmer`] by pushing a [`CacheMessage`] onto a
//! bounded channel. The controller side drains it in
//! [`spawn_message_loop`]. Sending never blocks and never fails the sender.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::AssetCacheController;
use crate::sync::MediaWarmer;

/// Buffer size for the controller message channel.
pub const MESSAGE_CHANNEL_CAPACITY: usize = 16;

/// Wire shape: `{"type": "CACHE_MEDIA", "urls": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheMessage {
    #[serde(rename = "CACHE_MEDIA")]
    CacheMedia { urls: Vec<String> },
}

/// Sending half of the controller's message channel.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<CacheMessage>,
}

impl ControllerHandle {
    pub fn new(tx: mpsc::Sender<CacheMessage>) -> Self {
        Self { tx }
    }

    /// Queue `message` without waiting. Returns false if it was dropped
    /// because the channel is full or the controller has gone away.
    pub fn post(&self, message: CacheMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Controller message queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Controller not running, dropping message");
                false
            }
        }
    }
}

impl MediaWarmer for ControllerHandle {
    fn warm(&self, urls: Vec<String>) {
        self.post(CacheMessage::CacheMedia { urls });
    }
}

/// Run the controller's message loop on the current runtime until every
/// handle is dropped.
pub fn spawn_message_loop(controller: Arc<AssetCacheController>) -> (ControllerHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = controller.handle_message(message).await {
                error!(error = %e, "Failed to handle controller message");
            }
        }
        debug!("Controller message loop finished");
    });
    (ControllerHandle::new(tx), task)
}
