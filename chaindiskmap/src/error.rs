use std::io;
use thiserror::Error;

/// Errors that can occur when working with a chained disk map
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors when growing, mapping or flushing the backing files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A record offset points outside the log or at a truncated record
    #[error("invalid record at offset {pos}: {reason}")]
    InvalidRecord { pos: u64, reason: &'static str },

    /// A record found while splitting a bucket belongs to neither half of the split
    #[error(
        "corrupted bucket {bucket}: hash {hash:#x} resolves to bucket {resolved} under table length {table_length}"
    )]
    Corrupted {
        hash: u64,
        bucket: u64,
        resolved: u64,
        table_length: u64,
    },

    /// The persisted header does not describe a usable table
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A key, value or the table itself outgrew what the on-disk format can address
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Encoding errors when converting data to bytes
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Decoding errors when converting bytes back to data
    #[error("Decoding error: {0}")]
    Decoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
