use crate::events::{JobStatus, JobSummary};
use crate::types::{Location, Owner};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum QueueMessage {
    Submit {
        owner: Owner,
        location: Location,
        response: oneshot::Sender<()>,
    },
    SetStatus {
        location: Location,
        status: JobStatus,
        response: oneshot::Sender<bool>,
    },
    CheckStatus {
        location: Location,
        response: oneshot::Sender<Option<JobStatus>>,
    },
    /// Parked until a job can be started.
    NextJob {
        response: oneshot::Sender<Location>,
    },
    Remove {
        location: Location,
        response: oneshot::Sender<bool>,
    },
    ListJobs {
        response: oneshot::Sender<Vec<JobSummary>>,
    },
}
