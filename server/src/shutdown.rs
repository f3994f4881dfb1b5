use tokio_util::sync::CancellationToken;

/// Spawn a task that cancels the returned token on SIGINT or SIGTERM.
///
/// The accept loop and the dispatch loop both watch the token; running
/// jobs are not waited for.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => tracing::info!("received SIGINT, shutting down"),
                Err(err) => {
                    tracing::error!(error = %err, "unable to listen for SIGINT");
                    return;
                }
            },
            _ = terminate() => tracing::info!("received SIGTERM, shutting down"),
        }
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(err) => {
            tracing::error!(error = %err, "unable to listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
