use std::{io, result};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("job queue has shut down")]
    QueueClosed,
    #[error("working directory error: {0}")]
    Workspace(#[source] io::Error),
    #[error("unsupported platform {0} for running commands")]
    UnsupportedPlatform(String),
    #[error("failed to run command: {0}")]
    Execution(#[source] io::Error),
}

pub type Result<T> = result::Result<T, JobError>;
