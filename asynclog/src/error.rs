use std::path::PathBuf;

use thiserror::Error;

/// The result type for this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// An error that can occur while starting the logger or writing a record
/// synchronously.
#[derive(Debug, Error)]
pub enum Error {
    /// The working directory could not be resolved.
    #[error("could not resolve working directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    /// The log directory could not be created.
    #[error("could not create log directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A log file could not be created.
    #[error("could not create log file {path:?}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A write was attempted with no log file open.
    #[error("no log file is open")]
    NoFileOpen,

    /// Writing or flushing the log file failed.
    #[error("log file write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The writer thread could not be spawned.
    #[error("could not spawn writer thread: {0}")]
    Spawn(#[source] std::io::Error),
}
