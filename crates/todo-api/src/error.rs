use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use domain::TodoError;
use shared::{AppError, ErrorCategory, ErrorResponse};
use tracing::{error, warn};

/// HTTP 境界のエラー。`AppError` をエラーエンベロープに変換する
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// リクエストボディ・クエリの解釈失敗
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self(AppError::Validation(vec![message.into()]))
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl From<TodoError> for ApiError {
    fn from(error: TodoError) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let metadata = self.0.metadata();

        // 内部情報はログにだけ残す
        match metadata.category {
            ErrorCategory::Server => {
                error!(code = metadata.code, error = %self.0, "request failed")
            }
            ErrorCategory::Transient => {
                warn!(code = metadata.code, error = %self.0, "request failed")
            }
            ErrorCategory::Client => {}
        }

        (status, Json(ErrorResponse::from_app_error(&self.0))).into_response()
    }
}

/// ミドルウェア（タイムアウト等）のエラーを変換
pub async fn handle_middleware_error(error: BoxError) -> ApiError {
    if error.is::<tower::timeout::error::Elapsed>() {
        ApiError(AppError::Timeout("request exceeded the configured timeout".to_string()))
    } else {
        ApiError(AppError::Internal(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_app_error() {
        let response = ApiError::from(TodoError::NotFound("x".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            ApiError::from(TodoError::StoreUnavailable("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = ApiError::malformed_request("expected value").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_elapsed_becomes_timeout() {
        let error: BoxError = Box::new(tower::timeout::error::Elapsed::new());

        let ApiError(app_error) = handle_middleware_error(error).await;

        assert!(matches!(app_error, AppError::Timeout(_)));
        assert_eq!(app_error.http_status_code(), 504);
    }
}
