//! Error types for console operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to open PTY master {}: {source}", .path.display())]
    OpenMaster {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to get slave name: {0}")]
    SlaveName(#[source] nix::Error),

    #[error("Failed to unlock PTY: {0}")]
    Unlock(#[source] nix::Error),

    #[error("Provided file is not a console")]
    NotAConsole,

    #[error("Console is closed")]
    Closed,

    #[error("Failed to access terminal attributes: {0}")]
    Termios(#[source] nix::Error),

    #[error("Failed to access window size: {0}")]
    WindowSize(#[source] nix::Error),

    #[error("Failed to close console: {0}")]
    Close(#[source] nix::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for console operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::OpenMaster { source, .. } => source,
            Error::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
            Error::NotAConsole => io::Error::new(io::ErrorKind::Unsupported, err),
            Error::SlaveName(errno)
            | Error::Unlock(errno)
            | Error::Termios(errno)
            | Error::WindowSize(errno)
            | Error::Close(errno) => io::Error::from(errno),
        }
    }
}
