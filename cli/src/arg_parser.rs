use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Run a folder's job on a remote job server
#[derive(Debug, Parser)]
#[clap(version)]
pub struct ArgParser {
    /// The address of the server, as host:port
    #[clap(short = 's', long = "server", env = "JOBQ_SERVER")]
    pub server: String,
    /// Size limit of a request or response, in Mb
    #[clap(short = 'b', long = "buffer", default_value_t = 10)]
    pub buffer: usize,
    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Subcommand)]
pub enum SubCommand {
    /// upload a folder, wait for its job and unpack the result over it
    Run {
        #[clap(short = 't', long = "period", default_value = "1.0", parse(try_from_str = seconds))]
        /// seconds between status checks
        period: Duration,

        #[clap(short = 'd', long = "dir", default_value = ".")]
        /// folder to upload
        dir: PathBuf,
    },
    /// upload a folder and print the job location
    Submit {
        /// folder to upload
        dir: PathBuf,
    },
    /// print a job's status
    Check {
        /// location returned by submit
        location: String,
    },
    /// fetch a job's folder and release the job
    Retrieve {
        /// location returned by submit
        location: String,
        /// folder to unpack into
        dir: PathBuf,
    },
}

/// try_from_str parse function for fractional seconds
fn seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("{s:?} is not a number"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("{s:?} is not a non-negative number of seconds"));
    }
    Ok(Duration::from_secs_f64(secs))
}
