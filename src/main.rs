// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use request_gate::{
    api::router,
    config::AppConfig,
    database::{ConnectionError, Database, RedbConnector},
    shutdown::watch_signals,
    state::AppState,
    telemetry::{init_tracing, install_panic_hook},
};

/// Failures that stop the server.
#[derive(Debug, thiserror::Error)]
enum ServeError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);
    install_panic_hook();

    let database = match Database::shared(RedbConnector::new(&config.database_path)).await {
        Ok(database) => database,
        Err(e) => {
            error!(error = %e, path = %config.database_path.display(), "Failed to open database");
            return ExitCode::FAILURE;
        }
    };

    // A panic in the server task surfaces as a join error instead of
    // unwinding past the teardown below.
    let result = tokio::spawn(serve(config, database.clone())).await;

    // Teardown runs on every exit path once the database is open.
    database.disconnect().await;

    match result {
        Ok(Ok(())) => {
            info!("Server shutdown complete");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!(error = %e, "Server stopped with a fatal error");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Server task aborted");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: AppConfig, database: Arc<Database>) -> Result<(), ServeError> {
    if !database.test_connection().await {
        warn!("Initial database probe failed, attempting reconnect");
        database.reconnect().await?;
    }

    let app = router(AppState::from_config(&config, database));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        address = %config.bind_addr,
        environment = %config.environment,
        "Request gate listening"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
