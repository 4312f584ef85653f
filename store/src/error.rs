use thiserror::Error;

/// Errors surfaced by storage backends and the row-store facade.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad data under {key}: {source}")]
    Data {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("backend error: {0}")]
    Backend(String),
}
