//! ルートハンドラ
//!
//! 入力の解釈失敗（不正な JSON など）は 400 のバリデーションエラーとして返す。
//! ボディは JSON 値として受け取り、フィールドの型検査はドメイン側でまとめて行う。

use crate::error::ApiError;
use crate::responses::{ApiResponse, HealthResponse, RouteNotFound, ServiceInfo, ServiceLinks};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use domain::{
    CreateTodoInput, ListQuery, Todo, TodoError, TodoFilter, TodoId, TodoPage, TodoStatistics,
    UpdateTodoInput,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

type JsonBody = Result<Json<Value>, JsonRejection>;

/// JSON オブジェクトのボディを入力型へ変換
fn read_body<T: DeserializeOwned>(body: JsonBody) -> Result<T, ApiError> {
    let Json(value) = body.map_err(|e| ApiError::malformed_request(e.body_text()))?;
    if !value.is_object() {
        return Err(ApiError::malformed_request("request body must be a JSON object"));
    }
    serde_json::from_value(value).map_err(|e| ApiError::malformed_request(e.to_string()))
}

/// id の検証はボディより先に行う
fn check_id(raw: &str) -> Result<(), ApiError> {
    TodoId::parse(raw).map_err(TodoError::from)?;
    Ok(())
}

/// GET /api/todos
pub async fn list_todos(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<TodoPage> {
    let Query(query) = query.map_err(|e| ApiError::malformed_request(e.body_text()))?;
    let page = state.service.list(&query).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/todos/stats
pub async fn todo_stats(State(state): State<AppState>) -> ApiResult<TodoStatistics> {
    let stats = state.service.statistics().await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// GET /api/todos/:id
pub async fn get_todo(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Todo> {
    let todo = state.service.get(&id).await?;
    Ok(Json(ApiResponse::ok(todo)))
}

/// POST /api/todos
pub async fn create_todo(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<(StatusCode, Json<ApiResponse<Todo>>), ApiError> {
    let input: CreateTodoInput = read_body(body)?;
    let todo = state.service.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(todo))))
}

/// PUT /api/todos/:id
pub async fn replace_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> ApiResult<Todo> {
    check_id(&id)?;
    let input: UpdateTodoInput = read_body(body)?;
    let todo = state.service.replace(&id, input).await?;
    Ok(Json(ApiResponse::ok(todo)))
}

/// PATCH /api/todos/:id
pub async fn patch_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: JsonBody,
) -> ApiResult<Todo> {
    check_id(&id)?;
    let input: UpdateTodoInput = read_body(body)?;
    let todo = state.service.patch(&id, input).await?;
    Ok(Json(ApiResponse::ok(todo)))
}

/// DELETE /api/todos/:id
pub async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.service.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError(shared::AppError::NotFound(id)))
    }
}

/// GET /health, GET /api/health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let probe = state.service.count(&TodoFilter::all()).await;
    let (status, body_status, db, todos) = match probe {
        Ok(count) => (StatusCode::OK, "ok", "connected", Some(count)),
        Err(error) => {
            warn!(error = %error, "health check could not reach the store");
            (StatusCode::SERVICE_UNAVAILABLE, "error", "disconnected", None)
        }
    };

    let body = HealthResponse {
        status: body_status.to_string(),
        db: db.to_string(),
        backend: state.service.backend_name().to_string(),
        environment: state.environment.clone(),
        uptime_secs: state.uptime_secs(),
        timestamp: Utc::now(),
        todos,
    };
    (status, Json(body))
}

/// GET /
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        links: ServiceLinks {
            api: "/api".to_string(),
            health: "/health".to_string(),
            todos: "/api/todos".to_string(),
        },
    })
}

/// 未定義ルートのフォールバック
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(RouteNotFound {
            success: false,
            error: "Not found".to_string(),
            message: format!("Route {} does not exist", uri.path()),
        }),
    )
}
