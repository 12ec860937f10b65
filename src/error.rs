use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FloppError {
    #[error("Can't open {}: {source}", path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("Illegal volume: {}", path.display())]
    TooSmall { path: PathBuf },

    #[error("Cannot open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("Error reading {}: {source}", path.display())]
    ReadHeader { path: PathBuf, source: io::Error },

    #[error("Malformed volume header: {0}")]
    Header(#[from] binrw::Error),

    #[error("Seek error in input file: {0}")]
    InputSeek(io::Error),

    #[error("Error reading input volume: {0}")]
    ReadPage(io::Error),

    #[error("Illegal page number {page} in volume header")]
    InvalidPage { page: i32 },

    #[error("Cannot open {} for writing: {source}", path.display())]
    OpenOutput { path: PathBuf, source: io::Error },

    #[error("Error seeking to page {page} in output file: {source}")]
    SeekOutput { page: i32, source: io::Error },

    #[error("Error updating output file page {page}: {source}")]
    WriteOutput { page: i32, source: io::Error },

    #[error("Error writing volume report: {0}")]
    Console(io::Error),
}

pub type Result<T> = std::result::Result<T, FloppError>;
