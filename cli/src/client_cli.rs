use crate::error::{ClientError, Result};
use bytes::Bytes;
use joblib::JobStatus;
use std::path::Path;
use std::time::Duration;
use wire::transport::{self, REQUEST_OVERHEAD};
use wire::{tree, Request, STATUS_NONE};

pub struct ClientCli {
    server: String,
    max_message_bytes: usize,
}

impl ClientCli {
    pub fn new(server: impl Into<String>, max_message_bytes: usize) -> Self {
        Self {
            server: server.into(),
            max_message_bytes,
        }
    }

    /// Upload `dir` as a new job and return its location.
    pub async fn submit(&self, dir: &Path) -> Result<String> {
        let root = dir.to_path_buf();
        let max_bytes = self.max_message_bytes;
        let folder = tokio::task::spawn_blocking(move || tree::encode_folder(&root, max_bytes)).await??;

        let response = self.send(&Request::Submit(folder)).await?;
        if response.is_empty() {
            return Err(ClientError::NoResponse("submit"));
        }
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    /// Status of the job, `None` once the server no longer knows it.
    pub async fn check(&self, location: &str) -> Result<Option<JobStatus>> {
        let response = self.send(&Request::Check(location.to_string())).await?;
        let word = String::from_utf8_lossy(&response);
        if word.is_empty() {
            return Err(ClientError::NoResponse("check"));
        }
        if word == STATUS_NONE {
            return Ok(None);
        }
        JobStatus::from_wire(&word)
            .map(Some)
            .ok_or_else(|| ClientError::UnknownStatus(word.into_owned()))
    }

    /// Fetch the job's folder into `dir`. The server releases the job once
    /// it has answered.
    pub async fn retrieve(&self, location: &str, dir: &Path) -> Result<()> {
        let folder = self.send(&Request::Retrieve(location.to_string())).await?;
        if folder.is_empty() {
            return Err(ClientError::NoResponse("retrieve"));
        }
        let root = dir.to_path_buf();
        tokio::task::spawn_blocking(move || tree::decode_folder(&root, folder)).await??;
        Ok(())
    }

    /// Upload `dir`, poll every `period` until the job is done, then unpack
    /// the result over `dir`. Returns the job's location.
    pub async fn run(&self, dir: &Path, period: Duration) -> Result<String> {
        let location = self.submit(dir).await?;
        tracing::info!(server = %self.server, %location, "job submitted");

        loop {
            tokio::time::sleep(period).await;
            match self.check(&location).await? {
                Some(JobStatus::Done) => break,
                Some(status) => tracing::debug!(%location, %status, "waiting for job"),
                None => return Err(ClientError::JobGone(location)),
            }
        }

        self.retrieve(&location, dir).await?;
        tracing::info!(%location, dir = %dir.display(), "job retrieved");
        Ok(location)
    }

    async fn send(&self, request: &Request) -> Result<Bytes> {
        let max_bytes = self.max_message_bytes.saturating_add(REQUEST_OVERHEAD);
        let response = transport::send_request(self.server.as_str(), request, max_bytes).await?;
        Ok(response)
    }
}
