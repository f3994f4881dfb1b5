use crate::config::{self, ServerConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Queue uploaded folders as jobs and run a command on each
#[derive(Debug, Parser)]
#[clap(version)]
pub struct ArgParser {
    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Subcommand)]
pub enum SubCommand {
    /// accept jobs and run them
    Serve {
        /// shell command run inside every job's folder
        command: String,

        /// port to listen on
        port: u16,

        #[clap(short = 'n', long = "nprocs", default_value_t = 1)]
        /// maximum number of jobs running at once
        nprocs: usize,

        #[clap(short = 'b', long = "buffer", default_value_t = 10)]
        /// size limit of a request or response, in Mb
        buffer: usize,

        #[clap(short = 'e', long = "expire", default_value = "3600", parse(try_from_str = seconds))]
        /// seconds a finished job waits for retrieval before it is deleted
        expire: Duration,

        #[clap(short = 'w', long = "workdir", default_value = ".", env = "JOBQ_WORKDIR")]
        /// directory that holds the job folders
        workdir: PathBuf,
    },
    /// delete job folders left behind by an earlier run
    Cleanup {
        #[clap(short = 'w', long = "workdir", default_value = ".", env = "JOBQ_WORKDIR")]
        /// directory that holds the job folders
        workdir: PathBuf,
    },
}

impl SubCommand {
    /// The server settings for `serve`, `None` for other sub-commands.
    pub fn server_config(&self) -> Option<ServerConfig> {
        match self {
            SubCommand::Serve {
                command,
                port,
                nprocs,
                buffer,
                expire,
                workdir,
            } => Some(ServerConfig {
                command: command.clone(),
                port: *port,
                max_running: *nprocs,
                max_message_mb: *buffer,
                expire_after: *expire,
                workdir: workdir.clone(),
            }),
            SubCommand::Cleanup { .. } => None,
        }
    }
}

/// try_from_str parse function for fractional seconds
fn seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("{s:?} is not a number"))?;
    config::expire_duration(secs).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let args = ArgParser::try_parse_from(["server", "serve", "make", "9000"]).unwrap();
        let cfg = args.sub_command.server_config().unwrap();
        assert_eq!(cfg.command, "make");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.max_running, 1);
        assert_eq!(cfg.max_message_mb, 10);
        assert_eq!(cfg.expire_after, Duration::from_secs(3600));
    }

    #[test]
    fn serve_flags() {
        let args = ArgParser::try_parse_from([
            "server", "serve", "make test", "9000", "-n", "4", "-b", "50", "-e", "0.5", "-w",
            "/srv/jobs",
        ])
        .unwrap();
        let cfg = args.sub_command.server_config().unwrap();
        assert_eq!(cfg.command, "make test");
        assert_eq!(cfg.max_running, 4);
        assert_eq!(cfg.max_message_mb, 50);
        assert_eq!(cfg.expire_after, Duration::from_millis(500));
        assert_eq!(cfg.workdir, PathBuf::from("/srv/jobs"));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(ArgParser::try_parse_from(["server", "serve", "make", "port"]).is_err());
        assert!(ArgParser::try_parse_from(["server", "serve", "make", "9000", "-e", "-3"]).is_err());
        assert!(ArgParser::try_parse_from(["server", "serve", "make"]).is_err());
    }

    #[test]
    fn cleanup_has_no_server_config() {
        let args = ArgParser::try_parse_from(["server", "cleanup", "-w", "/srv/jobs"]).unwrap();
        assert_eq!(
            args.sub_command,
            SubCommand::Cleanup {
                workdir: PathBuf::from("/srv/jobs")
            }
        );
        assert!(args.sub_command.server_config().is_none());
    }
}
