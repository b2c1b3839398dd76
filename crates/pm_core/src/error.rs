use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DueDateError {
    #[error("due date is empty")]
    Empty,
    #[error("unrecognised due date `{0}`")]
    Unparseable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access plan file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid plan data in {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Watch(#[from] notify::Error),
    #[error("unknown maintenance plan `{0}`")]
    UnknownPlan(String),
    #[error("maintenance plan `{0}` has no frequency to advance by")]
    NoFrequency(String),
    #[error("next due date of maintenance plan `{0}` is out of range")]
    DueDateOutOfRange(String),
    #[error("plan source unavailable: {0}")]
    Unavailable(String),
}
