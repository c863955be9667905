use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading or normalising a crash data source.
///
/// Always fatal: the loader never returns a partial dataset.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}, column '{column}': invalid value '{value}'")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    /// The file was readable but could not be decoded as its format.
    #[error("malformed {format} data: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
}

impl DataLoadError {
    pub(crate) fn malformed(format: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Malformed {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid(row: usize, column: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            row,
            column: column.to_string(),
            value: value.into(),
        }
    }
}
