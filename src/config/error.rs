use std::path::PathBuf;

use crate::extraction::rowtransform::RowTransformError;

/// Configuration that is well formed YAML, but inconsistent. Fatal for a run.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown book {0:?}")]
    UnknownBook(String),
    #[error("table {table:?} refers to unknown transform {transform:?}")]
    UnknownTransform { table: PathBuf, transform: String },
    #[error("group {group:?} has more than one child named {name:?}")]
    DuplicateName { group: PathBuf, name: String },
    #[error("table {table:?} has a zero row count in StaticRowCounts")]
    ZeroRowCount { table: PathBuf },
    #[error("table {table:?} has an invalid row transform: {source}")]
    InvalidRowTransform {
        table: PathBuf,
        source: RowTransformError,
    },
}
