use bytes::Bytes;
use joblib::types::{Location, Owner};
use joblib::{JobQueue, JobStatus};
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use wire::{tree, Request, STATUS_NONE};

/// Interprets client requests against the job queue.
///
/// Each connection carries one request; `respond` writes at most one response
/// to the connection. Every failure is confined to the request that caused
/// it: it gets logged and the client sees no response.
#[derive(Clone)]
pub struct JobService {
    queue: JobQueue,
    max_message_bytes: usize,
}

impl JobService {
    pub fn new(queue: JobQueue, max_message_bytes: usize) -> Self {
        Self {
            queue,
            max_message_bytes,
        }
    }

    pub async fn respond<W>(&self, message: Bytes, owner: Owner, writer: &mut W) -> wire::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let request = match Request::parse(message) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(%owner, error = %err, "dropping request");
                return Ok(());
            }
        };
        tracing::debug!(%owner, command = request.command(), "handling request");

        match request {
            Request::Submit(folder) => {
                if let Some(location) = self.submit(owner, folder).await {
                    writer.write_all(location.as_bytes()).await?;
                }
            }
            Request::Check(location) => {
                if let Some(status) = self.check(&location).await {
                    writer.write_all(status.as_bytes()).await?;
                }
            }
            Request::Retrieve(location) => {
                if let Some(folder) = self.retrieve(&location).await {
                    writer.write_all(&folder).await?;
                    writer.flush().await?;
                    if let Err(err) = self.queue.remove(&location, false).await {
                        tracing::error!(%location, error = %err, "unable to release job");
                    }
                }
            }
        }
        Ok(())
    }

    /// Create a job, unpack the upload into its directory and queue it.
    ///
    /// A folder-message that fails to unpack leaves whatever was written so
    /// far; the job is queued regardless.
    async fn submit(&self, owner: Owner, folder: Bytes) -> Option<Location> {
        let location = match self.queue.submit(owner.clone()).await {
            Ok(location) => location,
            Err(err) => {
                tracing::error!(%owner, error = %err, "unable to create job");
                return None;
            }
        };

        let dir = PathBuf::from(&location);
        let unpacked = tokio::task::spawn_blocking(move || tree::decode_folder(&dir, folder)).await;
        match unpacked {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(%location, error = %err, "error while parsing upload"),
            Err(err) => tracing::warn!(%location, error = %err, "upload task failed"),
        }

        match self.queue.set_status(&location, JobStatus::Queued).await {
            Ok(true) => tracing::info!(%location, "job queued"),
            Ok(false) => tracing::warn!(%location, "job vanished while uploading"),
            Err(err) => {
                tracing::error!(%location, error = %err, "unable to queue job");
                return None;
            }
        }
        Some(location)
    }

    async fn check(&self, location: &str) -> Option<&'static str> {
        match self.queue.check_status(location).await {
            Ok(Some(status)) => Some(status.as_str()),
            Ok(None) => Some(STATUS_NONE),
            Err(err) => {
                tracing::error!(%location, error = %err, "unable to check job");
                None
            }
        }
    }

    /// Encode a finished job's directory for sending back. Directories of
    /// unknown or unfinished jobs are never read.
    async fn retrieve(&self, location: &str) -> Option<Bytes> {
        match self.queue.check_status(location).await {
            Ok(Some(JobStatus::Done)) => {}
            Ok(Some(status)) => {
                tracing::warn!(%location, %status, "retrieve before job finished");
                return None;
            }
            Ok(None) => {
                tracing::warn!(%location, "retrieve for unknown job");
                return None;
            }
            Err(err) => {
                tracing::error!(%location, error = %err, "unable to check job");
                return None;
            }
        }

        let dir = PathBuf::from(location);
        let max_bytes = self.max_message_bytes;
        match tokio::task::spawn_blocking(move || tree::encode_folder(&dir, max_bytes)).await {
            Ok(Ok(folder)) => Some(folder),
            Ok(Err(err)) => {
                tracing::warn!(%location, error = %err, "error while sending back job");
                None
            }
            Err(err) => {
                tracing::warn!(%location, error = %err, "encode task failed");
                None
            }
        }
    }
}
