mod actors;
pub mod config;
pub mod errors;
mod events;
pub mod executor;
mod fairness;
pub mod runner;
pub mod types;

// re-export the queue handle as if it is the job queue itself.
pub use actors::queue::JobQueueHandle as JobQueue;
pub use config::QueueConfig;
pub use events::{JobStatus, JobSummary};
pub use executor::{Executor, ShellExecutor};
pub use runner::JobRunner;
