//! todo-api バイナリのエントリポイント

use anyhow::{anyhow, Context};
use domain::{TodoFilter, TodoService, TodoStore};
use infrastructure::{DynamoDbClient, DynamoDbTodoStore, InMemoryTodoStore};
use shared::{init_tracing, Config, RetryExecutor, StoreBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use todo_api::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(config.log_format).map_err(|e| anyhow!("failed to initialise tracing: {e}"))?;

    let store = build_store(&config).await?;
    let backend = store.backend_name();
    let state = AppState::new(TodoService::new(store), config.environment.clone());
    let router = build_router(state, config.request_timeout());

    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, backend, environment = %config.environment, "server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn TodoStore>> {
    match config.store_backend {
        StoreBackend::Memory => {
            let store = if config.seed_sample_todos {
                InMemoryTodoStore::with_sample_todos()?
            } else {
                InMemoryTodoStore::new()
            };
            Ok(Arc::new(store))
        }
        StoreBackend::DynamoDb => {
            let db = DynamoDbClient::new(config).await;
            let retry = RetryExecutor::fixed_interval(
                config.retry_max_attempts,
                config.retry_initial_delay(),
            );

            // DynamoDB Local ではテーブルを用意する
            if config.dynamodb_endpoint.is_some() {
                retry
                    .execute(|| db.ensure_table())
                    .await
                    .into_result()
                    .context("failed to prepare DynamoDB table")?;
            }

            let store = DynamoDbTodoStore::new(db);
            let everything = TodoFilter::all();
            let todos = retry
                .execute(|| store.count(&everything))
                .await
                .into_result()
                .context("DynamoDB is unreachable")?;
            info!(table = %config.dynamodb_table, todos, "connected to DynamoDB");

            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
