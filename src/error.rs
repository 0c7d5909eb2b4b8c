use std::path::PathBuf;
use thiserror::Error;

/// The main error type for datacull operations.
#[derive(Debug, Error)]
pub enum DatacullError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No datasets found under {root} (a dataset folder needs images/ and labels/)")]
    NoDatasets { root: PathBuf },

    #[error("Dataset '{name}' not found in the workspace")]
    UnknownDataset { name: String },

    #[error("Failed while traversing {path}: {message}")]
    WalkFailed { path: PathBuf, message: String },

    #[error("Match manifest not found: {path} (run 'scan' first)")]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to parse match manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write match manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Class scan log not found: {path} (run 'class-scan' first)")]
    ScanLogNotFound { path: PathBuf },

    #[error("Failed to parse class scan log {path}: {source}")]
    ScanLogParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write class scan log {path}: {source}")]
    ScanLogWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "Test pool cannot satisfy the plan: need {required} test image(s), only {available} available"
    )]
    TestPoolTooSmall { required: usize, available: usize },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),
}
