use crate::types::{Location, Owner};
use std::fmt;

/// Lifecycle of a job. Variants are ordered, and a job only ever moves
/// forward through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobStatus {
    Uploading,
    Queued,
    Running,
    Done,
}

impl JobStatus {
    /// The status word clients see on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploading => "uploading",
            JobStatus::Queued => "queue",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
        }
    }

    pub fn from_wire(word: &str) -> Option<Self> {
        match word {
            "uploading" => Some(JobStatus::Uploading),
            "queue" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "done" => Some(JobStatus::Done),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of one queued job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSummary {
    pub owner: Owner,
    pub location: Location,
    pub status: JobStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_words_round_trip() {
        for status in [
            JobStatus::Uploading,
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Done,
        ] {
            assert_eq!(JobStatus::from_wire(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::Queued.to_string(), "queue");
        assert_eq!(JobStatus::from_wire("none"), None);
    }

    #[test]
    fn statuses_are_ordered_by_lifecycle() {
        assert!(JobStatus::Uploading < JobStatus::Queued);
        assert!(JobStatus::Queued < JobStatus::Running);
        assert!(JobStatus::Running < JobStatus::Done);
    }
}
