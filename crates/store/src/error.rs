//! Storage-layer error type.

use uuid::Uuid;

/// Errors produced by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A job with this id is already stored.
    #[error("Job {0} already exists")]
    AlreadyExists(Uuid),

    /// The backing file could not be read or written.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be serialized for writing.
    ///
    /// Note that the read path never produces this: a document that fails
    /// to parse loads as the empty default (see
    /// [`JsonFileStore`](crate::file_store::JsonFileStore)).
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operation was canceled while waiting (lock wait, queue wait).
    #[error("Operation canceled")]
    Canceled,
}
