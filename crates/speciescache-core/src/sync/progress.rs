use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Version,
    Media,
    Done,
}

/// One progress notification, shaped like
/// `{ phase, message?, current?, total? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SyncProgress {
    pub phase: SyncPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl SyncProgress {
    pub fn message(phase: SyncPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: Some(message.into()),
            current: None,
            total: None,
        }
    }

    pub fn media(current: usize, total: usize) -> Self {
        Self {
            phase: SyncPhase::Media,
            message: Some("Cached".to_string()),
            current: Some(current),
            total: Some(total),
        }
    }
}

/// Caller-supplied progress observer.
pub type ProgressCallback = Arc<dyn Fn(&SyncProgress) + Send + Sync>;

/// Delivers progress to an optional callback. A panicking callback is
/// caught and logged; it never unwinds into the sync.
#[derive(Clone, Default)]
pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    pub(crate) fn emit(&self, event: SyncProgress) {
        let Some(ref callback) = self.callback else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
            warn!(phase = ?event.phase, "Progress callback panicked; ignoring");
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}
