use std::io;
use std::path::PathBuf;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WireError {
    /// Malformed folder-message header or request line.
    #[error("malformed message: {0}")]
    Format(String),
    #[error("message of {size} bytes exceeds the {limit} byte limit")]
    MessageTooLarge { size: usize, limit: usize },
    #[error("unsupported command {0:?}")]
    UnsupportedCommand(String),
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} exists and is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

impl WireError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = result::Result<T, WireError>;
