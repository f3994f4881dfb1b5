use thiserror::Error;
use wire::WireError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("server closed the connection without answering {0}")]
    NoResponse(&'static str),
    #[error("job {0} no longer exists on the server")]
    JobGone(String),
    #[error("server reported unknown status {0:?}")]
    UnknownStatus(String),
    #[error("folder task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
