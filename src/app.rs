use std::{future::Future, process::ExitCode};

use anyhow::Result;

use crate::{config::DbConfig, db::ConnectionManager};

/// Startup gate plus shutdown hook; the returned code is the process exit status.
pub async fn run(config: &DbConfig, shutdown: impl Future<Output = Result<()>>) -> ExitCode {
    let manager = ConnectionManager::new(config);

    if let Err(err) = manager.initialize().await {
        log::error!("PostgreSQL connection error: {:#}", err);
        manager.shutdown().await;
        return ExitCode::FAILURE;
    }

    serve_until(&manager, shutdown).await
}

pub async fn serve_until(
    manager: &ConnectionManager,
    shutdown: impl Future<Output = Result<()>>,
) -> ExitCode {
    let status = match shutdown.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("Can't listen for shutdown signal: {:#}", err);
            ExitCode::FAILURE
        }
    };

    manager.shutdown().await;
    status
}

/// Resolves on SIGINT, or SIGTERM on Unix.
pub async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    log::info!("Shutdown signal received");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::anyhow;

    use super::*;

    fn unreachable_config() -> DbConfig {
        DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            connect_timeout: Duration::from_millis(500),
            ..DbConfig::default()
        }
    }

    #[tokio::test]
    async fn run_fails_for_unreachable_host() {
        let status = run(&unreachable_config(), async { Ok(()) }).await;

        assert_eq!(status, ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn failed_signal_listener_exits_with_failure() {
        let manager = ConnectionManager::new(&unreachable_config());

        let status = serve_until(&manager, async { Err(anyhow!("signal unavailable")) }).await;

        assert_eq!(status, ExitCode::FAILURE);
        assert!(manager.pool().is_closed());
    }

    #[tokio::test]
    async fn signal_closes_pool_and_exits_cleanly() {
        let manager = ConnectionManager::new(&unreachable_config());

        let status = serve_until(&manager, async { Ok(()) }).await;

        assert_eq!(status, ExitCode::SUCCESS);
        assert!(manager.pool().is_closed());
    }
}
