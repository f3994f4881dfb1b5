use super::messages::QueueMessage;
use crate::events::{JobStatus, JobSummary};
use crate::fairness;
use crate::types::{Location, Owner};
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
struct Job {
    owner: Owner,
    location: Location,
    status: JobStatus,
}

/// Sole owner of the job sequence. Every read and write of job state is a
/// message handled here, one at a time.
pub struct JobQueueActor {
    inbox: mpsc::Receiver<QueueMessage>,
    jobs: Vec<Job>,
    // dispatch requests waiting for a free slot and a queued job
    waiters: VecDeque<oneshot::Sender<Location>>,
    max_running: usize,
}

impl JobQueueActor {
    pub fn spawn(inbox: mpsc::Receiver<QueueMessage>, max_running: usize) {
        let actor = Self {
            inbox,
            jobs: Vec::new(),
            waiters: VecDeque::new(),
            max_running,
        };
        tokio::spawn(async move { actor.run().await });
    }

    async fn run(mut self) {
        use self::QueueMessage::*;
        while let Some(msg) = self.inbox.recv().await {
            match msg {
                Submit {
                    owner,
                    location,
                    response,
                } => {
                    self.submit(owner, location);
                    let _ = response.send(());
                }
                SetStatus {
                    location,
                    status,
                    response,
                } => {
                    let _ = response.send(self.set_status(&location, status));
                }
                CheckStatus { location, response } => {
                    let _ = response.send(self.find(&location).map(|job| job.status));
                }
                NextJob { response } => self.waiters.push_back(response),
                Remove { location, response } => {
                    let _ = response.send(self.remove(&location));
                }
                ListJobs { response } => {
                    let _ = response.send(self.summaries());
                }
            }
            self.dispatch();
        }
        tracing::debug!("job queue inbox closed");
    }

    fn find(&self, location: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.location == location)
    }

    fn submit(&mut self, owner: Owner, location: Location) {
        if self.find(&location).is_some() {
            tracing::error!(%location, "duplicate job location, ignoring submission");
            return;
        }
        self.jobs.push(Job {
            owner,
            location,
            status: JobStatus::Uploading,
        });
        let jobs = std::mem::take(&mut self.jobs);
        self.jobs = fairness::tidy(jobs, |job| job.owner.as_str());
    }

    /// Statuses advance one step at a time. The uploader queues, the runner
    /// finishes, and `Running` is reserved for dispatch so the running cap
    /// cannot be bypassed.
    fn set_status(&mut self, location: &str, status: JobStatus) -> bool {
        use JobStatus::*;
        let job = match self.jobs.iter_mut().find(|job| job.location == location) {
            Some(job) => job,
            None => return false,
        };
        if !matches!((job.status, status), (Uploading, Queued) | (Running, Done)) {
            tracing::warn!(
                %location,
                from = %job.status,
                to = %status,
                "rejected job status transition"
            );
            return false;
        }
        job.status = status;
        true
    }

    /// A running job keeps its slot until its command finishes, so it cannot
    /// be removed.
    fn remove(&mut self, location: &str) -> bool {
        let idx = match self.jobs.iter().position(|job| job.location == location) {
            Some(idx) => idx,
            None => return false,
        };
        if self.jobs[idx].status == JobStatus::Running {
            tracing::warn!(%location, "refusing to remove a running job");
            return false;
        }
        self.jobs.remove(idx);
        true
    }

    fn summaries(&self) -> Vec<JobSummary> {
        self.jobs
            .iter()
            .map(|job| JobSummary {
                owner: job.owner.clone(),
                location: job.location.clone(),
                status: job.status,
            })
            .collect()
    }

    fn running(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Running)
            .count()
    }

    /// Hand queued jobs to waiting dispatchers, first queued job first, while
    /// there are free running slots.
    fn dispatch(&mut self) {
        while self.running() < self.max_running {
            let waiter = match self.waiters.pop_front() {
                Some(waiter) if waiter.is_closed() => continue,
                Some(waiter) => waiter,
                None => return,
            };
            let job = match self
                .jobs
                .iter_mut()
                .find(|job| job.status == JobStatus::Queued)
            {
                Some(job) => job,
                None => {
                    self.waiters.push_front(waiter);
                    return;
                }
            };
            job.status = JobStatus::Running;
            if waiter.send(job.location.clone()).is_err() {
                // dispatcher went away between the check and the send
                job.status = JobStatus::Queued;
            }
        }
    }
}
