use joblib::QueueConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use wire::transport;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("concurrency limit must be at least 1")]
    NoRunningSlots,
    #[error("message size limit must be at least 1 Mb")]
    NoMessageRoom,
    #[error("message size limit of {0} Mb is too large")]
    MessageLimitTooLarge(usize),
    #[error("expire time must be a non-negative number of seconds, got {0}")]
    BadExpireTime(f64),
    #[error("working directory {}: {source}", path.display())]
    Workdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("working directory {} cannot be used in job locations: {reason}", path.display())]
    UnusableWorkdir { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shell command run inside each job's working directory.
    pub command: String,
    pub port: u16,
    /// Maximum number of jobs running at once.
    pub max_running: usize,
    /// Limit for requests and responses, in megabytes.
    pub max_message_mb: usize,
    /// How long a finished job waits for retrieval before it is deleted.
    pub expire_after: Duration,
    /// Directory holding the job working directories.
    pub workdir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            port: 9000,
            max_running: 1,
            max_message_mb: 10,
            expire_after: Duration::from_secs(3600),
            workdir: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    pub fn new(command: impl Into<String>, port: u16) -> Self {
        Self {
            command: command.into(),
            port,
            ..Default::default()
        }
    }

    /// The message limit in bytes, clamped for limits `validate` would
    /// reject.
    pub fn max_message_bytes(&self) -> usize {
        wire::mebibytes(self.max_message_mb)
            .unwrap_or(usize::MAX - transport::REQUEST_OVERHEAD)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::new(self.max_running, self.workdir.clone())
    }

    /// Check the limits and turn `workdir` into the absolute path job
    /// locations are built from.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.max_running == 0 {
            return Err(ConfigError::NoRunningSlots);
        }
        if self.max_message_mb == 0 {
            return Err(ConfigError::NoMessageRoom);
        }
        if wire::mebibytes(self.max_message_mb).is_none() {
            return Err(ConfigError::MessageLimitTooLarge(self.max_message_mb));
        }
        self.workdir = resolve_workdir(&self.workdir)?;
        Ok(self)
    }
}

pub fn expire_duration(secs: f64) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::BadExpireTime(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn resolve_workdir(path: &Path) -> Result<PathBuf, ConfigError> {
    let resolved = std::fs::canonicalize(path).map_err(|source| ConfigError::Workdir {
        path: path.to_path_buf(),
        source,
    })?;
    if !resolved.is_dir() {
        return Err(ConfigError::UnusableWorkdir {
            path: resolved,
            reason: "not a directory".into(),
        });
    }
    let as_str = resolved
        .to_str()
        .ok_or_else(|| ConfigError::UnusableWorkdir {
            path: resolved.clone(),
            reason: "not valid UTF-8".into(),
        })?;
    wire::request::validate_location(as_str).map_err(|err| ConfigError::UnusableWorkdir {
        path: resolved.clone(),
        reason: err.to_string(),
    })?;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn server_config_default() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.max_running, 1);
        assert_eq!(cfg.max_message_mb, 10);
        assert_eq!(cfg.max_message_bytes(), 10 * 1024 * 1024);
        assert_eq!(cfg.expire_after, Duration::from_secs(3600));
        assert_eq!(cfg.workdir, PathBuf::from("."));
    }

    #[test]
    fn validate_resolves_workdir() {
        let dir = TempDir::new().unwrap();
        let cfg = ServerConfig {
            workdir: dir.path().join("."),
            ..ServerConfig::new("make", 9001)
        }
        .validate()
        .unwrap();
        assert!(cfg.workdir.is_absolute());
        assert_eq!(cfg.workdir, std::fs::canonicalize(dir.path()).unwrap());
        assert_eq!(cfg.queue_config().workdir, cfg.workdir);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let dir = TempDir::new().unwrap();
        let base = ServerConfig {
            workdir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let mut cfg = base.clone();
        cfg.max_running = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NoRunningSlots)));

        let mut cfg = base.clone();
        cfg.max_message_mb = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::NoMessageRoom)));

        let mut cfg = base;
        cfg.max_message_mb = usize::MAX;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MessageLimitTooLarge(usize::MAX))
        ));
    }

    #[test]
    fn oversized_limit_never_overflows() {
        let cfg = ServerConfig {
            max_message_mb: usize::MAX,
            ..Default::default()
        };
        let bytes = cfg.max_message_bytes();
        assert!(bytes.checked_add(transport::REQUEST_OVERHEAD).is_some());
    }

    #[test]
    fn validate_rejects_workdirs_that_break_locations() {
        let dir = TempDir::new().unwrap();
        let spaced = dir.path().join("with space");
        std::fs::create_dir(&spaced).unwrap();
        let cfg = ServerConfig {
            workdir: spaced,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnusableWorkdir { .. })
        ));

        let cfg = ServerConfig {
            workdir: dir.path().join("missing"),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Workdir { .. })));
    }

    #[test]
    fn expire_time_must_be_sane() {
        assert_eq!(expire_duration(1.5).unwrap(), Duration::from_millis(1500));
        assert!(expire_duration(-1.0).is_err());
        assert!(expire_duration(f64::NAN).is_err());
    }
}
