//! Export error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// Column lists of the accumulated table differ in length.
    #[error("Inconsistent table: {rows} rows, but columns {columns:?} have other lengths")]
    Inconsistent {
        rows: usize,
        columns: Vec<(String, usize)>,
    },
    #[error("Nothing to write: no rows were extracted")]
    Empty,
    #[error("Table too large for a worksheet: {rows} rows x {columns} columns")]
    TooLarge { rows: usize, columns: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("Output path {} is a directory", .0.display())]
    TargetIsDirectory(PathBuf),
    #[error("Failed to move output into place at {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: tempfile::PersistError,
    },
}
