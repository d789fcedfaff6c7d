use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to read snapshot {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {path} is not valid JSON: {source}")]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid calendar date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("the {0} mode set must name at least one mode")]
    EmptyModeSet(&'static str),

    #[error("date range starts after it ends ({from} > {to})")]
    InvertedRange { from: String, to: String },

    #[error("preference store {path}: {message}")]
    Preferences { path: PathBuf, message: String },
}
