//! HTTP API（axum）
//!
//! `/api/todos` 配下の CRUD・集計と、ヘルスチェックを提供します。
//! ストアは `AppState` 経由で注入します。

pub mod error;
pub mod handlers;
pub mod responses;

use axum::{error_handling::HandleErrorLayer, routing::get, Router};
use domain::TodoService;
use infrastructure::InMemoryTodoStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ApiError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    pub service: TodoService,
    pub environment: String,
    started_at: Instant,
}

impl AppState {
    pub fn new(service: TodoService, environment: impl Into<String>) -> Self {
        Self {
            service,
            environment: environment.into(),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            TodoService::new(Arc::new(InMemoryTodoStore::new())),
            "development",
        )
    }
}

/// 空のインメモリストアでルータを構築
pub fn app() -> Router {
    app_with_state(AppState::default())
}

/// 外部から状態を注入できる版
pub fn app_with_state(state: AppState) -> Router {
    build_router(state, DEFAULT_REQUEST_TIMEOUT)
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/todos",
            get(handlers::list_todos).post(handlers::create_todo),
        )
        .route("/todos/stats", get(handlers::todo_stats))
        .route(
            "/todos/:id",
            get(handlers::get_todo)
                .put(handlers::replace_todo)
                .patch(handlers::patch_todo)
                .delete(handlers::delete_todo),
        );

    Router::new()
        .route("/", get(handlers::service_info))
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .fallback(handlers::route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(HandleErrorLayer::new(error::handle_middleware_error))
                .timeout(request_timeout),
        )
        .with_state(state)
}
