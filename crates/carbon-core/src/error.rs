use thiserror::Error;

/// Raised when a cache would end up inconsistent with the entities it holds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Identity mismatch: requested {requested:?} but loader returned {actual:?}")]
    IdentityMismatch { requested: String, actual: String },

    #[error("Fetch task did not complete: {0}")]
    Interrupted(String),
}

/// A partition predicate returned a bucket index past
/// [`MAX_PARTITION_BUCKETS`](crate::collection::MAX_PARTITION_BUCKETS).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Bucket index {index} is out of range (limit {limit})")]
pub struct BucketOutOfRange {
    pub index: usize,
    pub limit: usize,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize storage content: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not find data directory")]
    NoDataDir,
}
