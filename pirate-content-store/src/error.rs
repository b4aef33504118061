use thiserror::Error;

pub type ContentStoreResult<T> = Result<T, ContentStoreError>;

#[derive(Error, Debug)]
pub enum ContentStoreError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("content hash {0} does not look like hex-encoded SHA-256")]
    MalformedHash(String),
}
