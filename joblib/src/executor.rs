use crate::errors::{JobError, Result};
use crate::types::OutputBlob;
use async_trait::async_trait;
use bytes::BytesMut;
use std::path::Path;
use std::process::Stdio;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process,
    sync::mpsc,
};

/// Runs a job's command inside its working directory.
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Run `command` in `dir` to completion and return its combined output.
    ///
    /// A command that runs but exits unsuccessfully is not an error; its
    /// output is returned like any other.
    async fn execute(&self, command: &str, dir: &Path) -> Result<OutputBlob>;
}

/// Runs commands through the host shell: `bash -c` on unix-likes, `cmd /c`
/// on Windows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShellExecutor {
    launcher: &'static str,
    flag: &'static str,
}

impl ShellExecutor {
    pub fn for_host() -> Result<Self> {
        Self::for_platform(std::env::consts::OS)
    }

    pub fn for_platform(os: &str) -> Result<Self> {
        match os {
            "linux" | "macos" | "freebsd" | "netbsd" | "openbsd" | "dragonfly" => Ok(Self {
                launcher: "bash",
                flag: "-c",
            }),
            "windows" => Ok(Self {
                launcher: "cmd",
                flag: "/c",
            }),
            other => Err(JobError::UnsupportedPlatform(other.to_string())),
        }
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, command: &str, dir: &Path) -> Result<OutputBlob> {
        let mut child = process::Command::new(self.launcher)
            .arg(self.flag)
            .arg(command)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(JobError::Execution)?;

        // stdout and stderr are merged in the order their chunks arrive
        let (output_tx, mut output_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            pipe_output(stdout, output_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            pipe_output(stderr, output_tx.clone());
        }
        drop(output_tx);

        let mut combined = BytesMut::new();
        while let Some(blob) = output_rx.recv().await {
            combined.extend_from_slice(&blob);
        }

        let exit_status = child.wait().await.map_err(JobError::Execution)?;
        if !exit_status.success() {
            tracing::warn!(dir = %dir.display(), status = %exit_status, "job command failed");
        }
        Ok(combined.freeze())
    }
}

fn pipe_output<R>(mut reader: R, output_tx: mpsc::UnboundedSender<OutputBlob>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = BytesMut::with_capacity(4096);
        loop {
            match reader.read_buf(&mut buf).await {
                Ok(n) if n > 0 => {
                    // move the bytes out of buf and into a message
                    let _ = output_tx.send(buf.split().freeze());
                }
                _ => break,
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn run(command: &str, dir: &Path) -> OutputBlob {
        ShellExecutor::for_host()
            .unwrap()
            .execute(command, dir)
            .await
            .unwrap()
    }

    #[test]
    fn platform_selects_the_launcher() {
        let unix = ShellExecutor::for_platform("linux").unwrap();
        assert_eq!((unix.launcher, unix.flag), ("bash", "-c"));
        let windows = ShellExecutor::for_platform("windows").unwrap();
        assert_eq!((windows.launcher, windows.flag), ("cmd", "/c"));
        assert!(matches!(
            ShellExecutor::for_platform("plan9"),
            Err(JobError::UnsupportedPlatform(os)) if os == "plan9"
        ));
    }

    #[tokio::test]
    async fn runs_inside_the_working_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("input.txt"), "hello").unwrap();

        let output = run("cat input.txt && cp input.txt output.txt", dir.path()).await;
        assert_eq!(&output[..], b"hello");
        assert_eq!(
            std::fs::read(dir.path().join("output.txt")).unwrap(),
            b"hello"
        );
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        let output = run("echo out; sleep 0.1; echo err >&2", dir.path()).await;
        assert_eq!(String::from_utf8_lossy(&output), "out\nerr\n");
    }

    #[tokio::test]
    async fn failing_command_still_returns_output() {
        let dir = TempDir::new().unwrap();
        let output = run("echo partial; exit 3", dir.path()).await;
        assert_eq!(&output[..], b"partial\n");
    }

    #[tokio::test]
    async fn missing_directory_is_an_execution_error() {
        let dir = TempDir::new().unwrap();
        let result = ShellExecutor::for_host()
            .unwrap()
            .execute("true", &dir.path().join("gone"))
            .await;
        assert!(matches!(result, Err(JobError::Execution(_))));
    }
}
