mod actor;
mod messages;

use self::{
    actor::JobQueueActor,
    messages::QueueMessage::{self, CheckStatus, ListJobs, NextJob, Remove, SetStatus, Submit},
};
use crate::config::{QueueConfig, JOB_DIR_PREFIX};
use crate::errors::{JobError, Result};
use crate::events::{JobStatus, JobSummary};
use crate::types::{Location, Owner};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// The job queue: job state, fairness ordering and concurrency-gated
/// dispatch.
///
/// This struct is an actor handle. The job sequence lives in the actor task
/// spawned by `JobQueueHandle::spawn`, which handles one message at a time,
/// so the handle can be cloned freely across tasks without an `Arc<Mutex>`.
/// File system work (creating and deleting working directories) happens here
/// in the caller's task, never inside the actor.
#[derive(Clone)]
pub struct JobQueueHandle {
    sender: mpsc::Sender<QueueMessage>,
    workdir: Arc<PathBuf>,
}

impl JobQueueHandle {
    /// Spawn a new queue actor.
    pub fn spawn(config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.message_capacity);
        JobQueueActor::spawn(receiver, config.max_running);
        Self {
            sender,
            workdir: Arc::new(config.workdir),
        }
    }

    /// Create a working directory for a new job owned by `owner` and enqueue
    /// the job as `Uploading`. Returns the job's location.
    pub async fn submit(&self, owner: Owner) -> Result<Location> {
        let dir = self
            .workdir
            .join(format!("{}{}", JOB_DIR_PREFIX, Uuid::new_v4()));
        // create_dir rather than create_dir_all: an existing path is a collision
        tokio::fs::create_dir(&dir)
            .await
            .map_err(JobError::Workspace)?;
        let location = dir.display().to_string();

        let submitted = self
            .request(|response| Submit {
                owner: owner.clone(),
                location: location.clone(),
                response,
            })
            .await;
        if let Err(err) = submitted {
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(err);
        }
        tracing::info!(%owner, %location, "job submitted");
        Ok(location)
    }

    /// Advance a job to the next step of its lifecycle. Returns false when
    /// the job no longer exists or `status` is not the job's next step
    /// (`Running` is never accepted here, only dispatch starts jobs).
    pub async fn set_status(&self, location: &str, status: JobStatus) -> Result<bool> {
        self.request(|response| SetStatus {
            location: location.to_string(),
            status,
            response,
        })
        .await
    }

    /// Current status of a job, `None` if no job has this location.
    pub async fn check_status(&self, location: &str) -> Result<Option<JobStatus>> {
        self.request(|response| CheckStatus {
            location: location.to_string(),
            response,
        })
        .await
    }

    /// Wait for the next job to run.
    ///
    /// Resolves once a running slot is free and a job is queued; that job has
    /// already been switched to `Running` when its location is returned.
    /// Dropping the future before it resolves leaves the queue untouched.
    pub async fn next_job(&self) -> Result<Location> {
        self.request(|response| NextJob { response }).await
    }

    /// Remove a job and delete its working directory.
    ///
    /// `warn_on_kill` marks a reclamation of an expired, never retrieved job.
    /// Returns false if the job was already gone or is still running, in
    /// which case nothing on disk is touched.
    pub async fn remove(&self, location: &str, warn_on_kill: bool) -> Result<bool> {
        let removed = self
            .request(|response| Remove {
                location: location.to_string(),
                response,
            })
            .await?;
        if !removed {
            return Ok(false);
        }

        if warn_on_kill {
            tracing::warn!(%location, "job expired before retrieval, reclaiming it");
        } else {
            tracing::info!(%location, "job removed");
        }
        if let Err(err) = tokio::fs::remove_dir_all(location).await {
            tracing::warn!(%location, error = %err, "unable to delete job directory");
        }
        Ok(true)
    }

    /// Snapshot of every job in scheduling order.
    pub async fn jobs(&self) -> Result<Vec<JobSummary>> {
        self.request(|response| ListJobs { response }).await
    }

    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> QueueMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(message(tx))
            .await
            .map_err(|_| JobError::QueueClosed)?;
        rx.await.map_err(|_| JobError::QueueClosed)
    }
}
