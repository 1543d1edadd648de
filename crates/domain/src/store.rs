use crate::errors::StoreError;
use crate::input::{TodoChanges, TodoDraft};
use crate::query::TodoFilter;
use crate::todo::{Todo, TodoId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Todo の永続化境界
///
/// 実装ごとの同時実行保証:
/// - インメモリ: 全操作が 1 つの Mutex の中で直列化される。`update` の
///   read-modify-write も単一のクリティカルセクションで、更新は失われない。
/// - DynamoDB: `update` はバージョン番号による compare-and-swap。条件に
///   失敗した場合は `StoreError::Conflict` となり、読み直して再試行する。
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// フィルタに一致する全件を id 順（作成順）で返す
    async fn find_many(&self, filter: &TodoFilter) -> Result<Vec<Todo>, StoreError>;

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, StoreError>;

    /// 新しい id を採番して保存する
    async fn insert(&self, draft: TodoDraft, created_at: DateTime<Utc>)
        -> Result<Todo, StoreError>;

    /// `TodoChanges::apply_to` でマージして保存する。存在しなければ None
    async fn update(
        &self,
        id: &TodoId,
        changes: &TodoChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Todo>, StoreError>;

    /// 削除できたら true、存在しなければ false
    async fn delete(&self, id: &TodoId) -> Result<bool, StoreError>;

    async fn count(&self, filter: &TodoFilter) -> Result<u64, StoreError>;

    /// ログ・ヘルスチェック用のバックエンド名
    fn backend_name(&self) -> &'static str;
}
