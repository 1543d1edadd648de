use domain::TodoError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// アプリケーション全体で使用される包括的なエラー型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    // 入力エラー
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid todo id: {0}")]
    InvalidIdentifier(String),

    // ビジネスロジックエラー
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Concurrent modification detected")]
    ConcurrentModification,

    // システムエラー
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Timeout occurred: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// エラーの分類
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// クライアントエラー（4xx相当）
    Client,
    /// サーバーエラー（5xx相当）
    Server,
    /// 一時的なエラー（リトライ可能）
    Transient,
}

/// リトライ戦略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryStrategy {
    /// 最大試行回数
    pub max_attempts: u32,
    /// 初期遅延時間
    pub initial_delay: Duration,
    /// 最大遅延時間
    pub max_delay: Duration,
    /// バックオフ倍率
    pub backoff_multiplier: f64,
    /// ジッター追加フラグ
    pub add_jitter: bool,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryStrategy {
    /// 楽観的ロック競合用
    pub fn concurrent_modification() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 1.5,
            add_jitter: true,
        }
    }
}

/// エラーメタデータ
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub retryable: bool,
    pub retry_strategy: Option<RetryStrategy>,
}

impl ErrorMetadata {
    fn client(code: &'static str) -> Self {
        Self {
            code,
            category: ErrorCategory::Client,
            retryable: false,
            retry_strategy: None,
        }
    }

    fn transient(code: &'static str, strategy: RetryStrategy) -> Self {
        Self {
            code,
            category: ErrorCategory::Transient,
            retryable: true,
            retry_strategy: Some(strategy),
        }
    }

    fn server(code: &'static str) -> Self {
        Self {
            code,
            category: ErrorCategory::Server,
            retryable: false,
            retry_strategy: None,
        }
    }
}

impl AppError {
    /// エラーメタデータを取得
    pub fn metadata(&self) -> ErrorMetadata {
        match self {
            AppError::Validation(_) => ErrorMetadata::client("VALIDATION_ERROR"),
            AppError::InvalidIdentifier(_) => ErrorMetadata::client("INVALID_IDENTIFIER"),
            AppError::NotFound(_) => ErrorMetadata::client("NOT_FOUND"),
            AppError::ConcurrentModification => ErrorMetadata::transient(
                "CONCURRENT_MODIFICATION",
                RetryStrategy::concurrent_modification(),
            ),
            AppError::ServiceUnavailable(_) => {
                ErrorMetadata::transient("SERVICE_UNAVAILABLE", RetryStrategy::default())
            }
            AppError::Timeout(_) => ErrorMetadata::transient("TIMEOUT", RetryStrategy::default()),
            AppError::Configuration(_) => ErrorMetadata::server("CONFIGURATION_ERROR"),
            AppError::Internal(_) => ErrorMetadata::server("INTERNAL_ERROR"),
        }
    }

    /// HTTPステータスコードを取得
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) | AppError::InvalidIdentifier(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::ConcurrentModification => 409,
            AppError::ServiceUnavailable(_) => 503,
            AppError::Timeout(_) => 504,
            AppError::Configuration(_) | AppError::Internal(_) => 500,
        }
    }

    /// クライアントに返すメッセージ（内部情報は含めない）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(_) => "Validation failed".to_string(),
            AppError::InvalidIdentifier(_) => "Invalid todo id".to_string(),
            AppError::NotFound(_) => "Todo not found".to_string(),
            AppError::ConcurrentModification => {
                "Todo was modified concurrently, please retry".to_string()
            }
            AppError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::Timeout(_) => "Request timed out".to_string(),
            AppError::Configuration(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// フィールド単位の詳細（バリデーションのみ）
    pub fn details(&self) -> Option<Vec<String>> {
        match self {
            AppError::Validation(details) => Some(details.clone()),
            AppError::InvalidIdentifier(id) => Some(vec![format!("malformed id: {id}")]),
            _ => None,
        }
    }
}

impl From<TodoError> for AppError {
    fn from(error: TodoError) -> Self {
        match error {
            TodoError::Validation(details) => AppError::Validation(details),
            TodoError::InvalidIdentifier(id) => AppError::InvalidIdentifier(id),
            TodoError::NotFound(id) => AppError::NotFound(id),
            TodoError::ConcurrentModification => AppError::ConcurrentModification,
            TodoError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            TodoError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// 標準化されたエラーレスポンス
/// `{ success: false, error, code, details? }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    /// ユーザー向けメッセージ
    pub error: String,
    /// エラーコード
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn from_app_error(error: &AppError) -> Self {
        Self {
            success: false,
            error: error.user_message(),
            code: error.metadata().code.to_string(),
            details: error.details(),
        }
    }
}
