mod arg_parser;
mod cleanup;
mod config;
mod interceptors;
mod services;
mod shutdown;

use arg_parser::{ArgParser, SubCommand};
use clap::Parser;
use config::ServerConfig;
use interceptors::peer;
use joblib::{Executor, JobQueue, JobRunner, ShellExecutor};
use services::jobservice::JobService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wire::transport::{self, REQUEST_OVERHEAD};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = ArgParser::parse();
    match args.sub_command {
        SubCommand::Cleanup { workdir } => {
            let removed = cleanup::remove_job_dirs(&workdir)?;
            tracing::info!(removed, workdir = %workdir.display(), "cleanup finished");
            Ok(())
        }
        ref sub_command @ SubCommand::Serve { .. } => {
            let config = sub_command
                .server_config()
                .ok_or("serve without settings")?
                .validate()?;
            // fail at startup rather than on the first job
            let executor = ShellExecutor::for_host()?;
            let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;

            tracing::info!(
                command = %config.command,
                port = config.port,
                nprocs = config.max_running,
                buffer_mb = config.max_message_mb,
                expire_secs = config.expire_after.as_secs_f64(),
                workdir = %config.workdir.display(),
                "job server started"
            );
            let shutdown = shutdown::install_shutdown_handler();
            serve(listener, config, Arc::new(executor), shutdown).await;
            tracing::info!("job server stopped");
            Ok(())
        }
    }
}

/// Accept connections until `shutdown` fires, one task per connection, with
/// the dispatch loop running alongside.
async fn serve(
    listener: TcpListener,
    config: ServerConfig,
    executor: Arc<dyn Executor>,
    shutdown: CancellationToken,
) {
    let queue = JobQueue::spawn(config.queue_config());
    let runner = JobRunner::new(
        queue.clone(),
        executor,
        config.command.clone(),
        config.expire_after,
    );
    tokio::spawn(runner.run(shutdown.clone()));

    let max_message_bytes = config.max_message_bytes();
    let service = JobService::new(queue, max_message_bytes);
    let max_request_bytes = max_message_bytes.saturating_add(REQUEST_OVERHEAD);

    loop {
        let (conn, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    tracing::warn!(error = %err, "error accepting connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
        };
        let service = service.clone();
        tokio::spawn(async move {
            handle_connection(service, conn, peer, max_request_bytes).await;
        });
    }
}

async fn handle_connection(
    service: JobService,
    mut conn: TcpStream,
    peer: SocketAddr,
    max_request_bytes: usize,
) {
    let owner = peer::owner_of(&peer);
    let message = match transport::read_to_end_capped(&mut conn, max_request_bytes).await {
        Ok(message) => message,
        Err(err) => {
            tracing::warn!(%owner, error = %err, "error reading request");
            return;
        }
    };
    if let Err(err) = service.respond(message, owner.clone(), &mut conn).await {
        tracing::warn!(%owner, error = %err, "error writing response");
    }
    let _ = conn.shutdown().await;
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::time::{sleep, timeout};
    use wire::{tree, Request};

    const MAX: usize = 1024 * 1024;

    struct TestServer {
        addr: SocketAddr,
        shutdown: CancellationToken,
        workdir: TempDir,
    }

    impl TestServer {
        async fn start(command: &str, max_message_mb: usize, expire_after: Duration) -> Self {
            let workdir = TempDir::new().unwrap();
            let config = ServerConfig {
                max_message_mb,
                expire_after,
                workdir: workdir.path().to_path_buf(),
                ..ServerConfig::new(command, 0)
            }
            .validate()
            .unwrap();
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let shutdown = CancellationToken::new();
            let executor = Arc::new(ShellExecutor::for_host().unwrap());
            tokio::spawn(serve(listener, config, executor, shutdown.clone()));
            Self {
                addr,
                shutdown,
                workdir,
            }
        }

        async fn send(&self, request: Request) -> Bytes {
            transport::send_request(self.addr, &request, MAX + REQUEST_OVERHEAD)
                .await
                .unwrap()
        }

        async fn submit(&self, folder: &Path) -> String {
            let message = tree::encode_folder(folder, MAX).unwrap();
            let location = self.send(Request::Submit(message)).await;
            String::from_utf8(location.to_vec()).unwrap()
        }

        async fn check(&self, location: &str) -> String {
            let status = self.send(Request::Check(location.into())).await;
            String::from_utf8(status.to_vec()).unwrap()
        }

        async fn wait_for(&self, location: &str, status: &str) {
            timeout(Duration::from_secs(10), async {
                while self.check(location).await != status {
                    sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .expect("job never reached the expected status");
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            self.shutdown.cancel();
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        dir
    }

    #[tokio::test]
    async fn submit_check_retrieve() {
        let server = TestServer::start("cp a.txt sub/b.txt && echo built", 10, Duration::from_secs(60)).await;
        let project = project();

        let location = server.submit(project.path()).await;
        assert!(Path::new(&location).starts_with(server.workdir.path().canonicalize().unwrap()));
        server.wait_for(&location, "done").await;

        let folder = server.send(Request::Retrieve(location.clone())).await;
        let out = TempDir::new().unwrap();
        tree::decode_folder(out.path(), folder).unwrap();
        assert_eq!(std::fs::read(out.path().join("a.txt")).unwrap(), b"hi");
        assert_eq!(std::fs::read(out.path().join("sub/b.txt")).unwrap(), b"hi");
        assert_eq!(
            std::fs::read(out.path().join(joblib::runner::LOG_FILE_NAME)).unwrap(),
            b"built\n"
        );

        assert_eq!(server.check(&location).await, "none");
        assert!(!Path::new(&location).exists());
    }

    #[tokio::test]
    async fn check_unknown_is_none() {
        let server = TestServer::start("true", 10, Duration::from_secs(60)).await;
        assert_eq!(server.check("/nowhere/job-x").await, "none");

        let location = server.submit(project().path()).await;
        server.wait_for(&location, "done").await;
        assert_eq!(server.check("/nowhere/job-x").await, "none");
    }

    #[tokio::test]
    async fn unsupported_command_closes_without_response() {
        let server = TestServer::start("true", 10, Duration::from_secs(60)).await;
        let mut conn = TcpStream::connect(server.addr).await.unwrap();
        conn.write_all(b"delete everything").await.unwrap();
        conn.shutdown().await.unwrap();
        let response = transport::read_to_end_capped(&mut conn, MAX).await.unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn oversized_output_is_not_retrieved() {
        let server = TestServer::start("head -c 2000000 /dev/zero > big", 1, Duration::from_secs(60)).await;
        let location = server.submit(project().path()).await;
        server.wait_for(&location, "done").await;

        let folder = server.send(Request::Retrieve(location.clone())).await;
        assert!(folder.is_empty());
        assert_eq!(server.check(&location).await, "done");
        assert!(Path::new(&location).join("big").exists());
    }

    #[tokio::test]
    async fn unretrieved_job_expires() {
        let server = TestServer::start("true", 10, Duration::from_millis(100)).await;
        let location = server.submit(project().path()).await;
        server.wait_for(&location, "done").await;
        server.wait_for(&location, "none").await;
        assert!(!Path::new(&location).exists());
    }
}
