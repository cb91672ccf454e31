use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("system clock is before the Unix epoch")]
    Clock,

    #[error("index file ends before the grid rows")]
    Truncated,

    #[error("invalid version line {0:?}")]
    Version(String),

    #[error("invalid timestamp line {0:?}")]
    Timestamp(String),

    #[error("invalid width {width} at row {row}")]
    RowWidth { row: usize, width: usize },

    #[error("non-digit character at row {0}")]
    RowDigits(usize),

    #[error("invalid row count {0}")]
    RowCount(usize),

    #[error("cell value {value} at row {row} exceeds the mask range")]
    CellValue { row: usize, value: u8 },

    #[error("cannot derive an archive member name from {0}")]
    ArchiveName(PathBuf),
}
