use thiserror::Error;

use super::Partition;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected by {partition}: {reason}")]
    Rejected { partition: Partition, reason: String },

    #[error("Value for {partition} is missing key field `{field}`")]
    MissingKey {
        partition: Partition,
        field: &'static str,
    },

    #[error("Value for {partition} has non-scalar key field `{field}`")]
    InvalidKey {
        partition: Partition,
        field: &'static str,
    },

    #[error("Store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization failure: {0}")]
    Json(#[from] serde_json::Error),
}
