use crate::actors::queue::JobQueueHandle;
use crate::events::JobStatus;
use crate::executor::Executor;
use crate::types::{Command, Location};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// File inside a job's working directory that receives the command output.
pub const LOG_FILE_NAME: &str = "job-output.log";

/// Runs dispatched jobs and reclaims the ones nobody comes back for.
#[derive(Clone)]
pub struct JobRunner {
    queue: JobQueueHandle,
    executor: Arc<dyn Executor>,
    command: Command,
    expire_after: Duration,
}

impl JobRunner {
    pub fn new(
        queue: JobQueueHandle,
        executor: Arc<dyn Executor>,
        command: Command,
        expire_after: Duration,
    ) -> Self {
        Self {
            queue,
            executor,
            command,
            expire_after,
        }
    }

    /// The dispatch loop: start every job the queue hands out, each on its own
    /// task, until `shutdown` fires or the queue goes away.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(command = %self.command, "fetching jobs");
        loop {
            let location = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = self.queue.next_job() => match next {
                    Ok(location) => location,
                    Err(err) => {
                        tracing::error!(error = %err, "dispatch loop stopped");
                        break;
                    }
                },
            };
            tracing::info!(%location, "running job");
            let runner = self.clone();
            tokio::spawn(async move { runner.run_job(location).await });
        }
    }

    /// Run the command for one job, store its output in the job's log file,
    /// mark the job done and arm its expiration.
    ///
    /// Failures are logged, never propagated: a job whose command could not
    /// run still ends up `Done`, with the error in its log.
    pub async fn run_job(&self, location: Location) {
        let dir = Path::new(&location);
        let output = match self.executor.execute(&self.command, dir).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(%location, error = %err, "error while running job");
                Bytes::from(format!("{}\n", err))
            }
        };
        if let Err(err) = tokio::fs::write(dir.join(LOG_FILE_NAME), &output).await {
            tracing::warn!(%location, error = %err, "error writing job log");
        }

        match self.queue.set_status(&location, JobStatus::Done).await {
            Ok(true) => {
                tracing::info!(%location, "finished job");
                self.schedule_expiration(location);
            }
            Ok(false) => tracing::warn!(%location, "job vanished while running"),
            Err(err) => tracing::error!(%location, error = %err, "unable to finish job"),
        }
    }

    fn schedule_expiration(&self, location: Location) {
        let queue = self.queue.clone();
        let expire_after = self.expire_after;
        tokio::spawn(async move {
            tokio::time::sleep(expire_after).await;
            if let Err(err) = queue.remove(&location, true).await {
                tracing::debug!(%location, error = %err, "expiration skipped");
            }
        });
    }
}
