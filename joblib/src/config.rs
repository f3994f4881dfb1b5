use std::path::PathBuf;

/// Name prefix of every job working directory.
pub const JOB_DIR_PREFIX: &str = "job-";

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Maximum number of jobs running at once.
    pub max_running: usize,
    /// Directory under which job working directories are created.
    pub workdir: PathBuf,
    /// Capacity of the queue actor's inbox.
    pub message_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_running: 1,
            workdir: PathBuf::from("."),
            message_capacity: 64,
        }
    }
}

impl QueueConfig {
    pub fn new(max_running: usize, workdir: impl Into<PathBuf>) -> Self {
        Self {
            max_running,
            workdir: workdir.into(),
            ..Default::default()
        }
    }
}
