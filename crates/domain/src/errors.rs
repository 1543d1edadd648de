use thiserror::Error;

/// ドメイン層のエラー（入力の不変条件違反）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// フィールド単位のメッセージを全件まとめて保持する
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),
}

/// ストア（永続化境界）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// 接続断・スロットリングなど。NotFound とは決して混同しない
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// 楽観的ロック（compare-and-swap）の競合
    #[error("Concurrent modification detected: {0}")]
    Conflict(String),

    /// 保存済みレコードを復元できない
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    #[error("Store error: {0}")]
    Backend(String),
}

/// Todo エンジンのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid todo id: {0}")]
    InvalidIdentifier(String),

    #[error("Todo not found: {0}")]
    NotFound(String),

    #[error("Concurrent modification detected")]
    ConcurrentModification,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for TodoError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::Validation(details) => TodoError::Validation(details),
            DomainError::InvalidTodoId(id) => TodoError::InvalidIdentifier(id),
        }
    }
}

impl From<StoreError> for TodoError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Unavailable(msg) => TodoError::StoreUnavailable(msg),
            StoreError::Conflict(_) => TodoError::ConcurrentModification,
            StoreError::Corrupted(msg) | StoreError::Backend(msg) => TodoError::Internal(msg),
        }
    }
}
