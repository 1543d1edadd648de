//! Todo エンジン
//!
//! 業務ルール（バリデーション・正規化・マージ・ページング）はすべてここに置き、
//! 永続化は `TodoStore` に委譲する。どのバックエンドかで分岐しない。

use crate::errors::TodoError;
use crate::input::{CreateTodoInput, TodoChanges, UpdateTodoInput, EMPTY_UPDATE_BODY};
use crate::query::{ListQuery, TodoFilter, TodoPage};
use crate::stats::TodoStatistics;
use crate::store::TodoStore;
use crate::todo::{Todo, TodoId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// 一覧取得（フィルタ + ページング）
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> Result<TodoPage, TodoError> {
        let query = query.validate()?;
        let matches = self.store.find_many(&query.filter).await?;
        let page = query.pagination.paginate(matches);

        debug!(
            total = page.meta.total,
            returned = page.todos.len(),
            "todos listed"
        );
        Ok(page)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, raw_id: &str) -> Result<Todo, TodoError> {
        let id = TodoId::parse(raw_id)?;
        self.store
            .find_by_id(&id)
            .await?
            .ok_or_else(|| TodoError::NotFound(id.to_string()))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: CreateTodoInput) -> Result<Todo, TodoError> {
        let draft = input.validate()?;
        let todo = self.store.insert(draft, Utc::now()).await?;

        info!(todo_id = %todo.id, priority = %todo.priority, "todo created");
        Ok(todo)
    }

    /// PUT: 指定フィールドの上書き（未指定は保持）
    #[instrument(skip(self, input))]
    pub async fn replace(&self, raw_id: &str, input: UpdateTodoInput) -> Result<Todo, TodoError> {
        let id = TodoId::parse(raw_id)?;
        let changes = input.validate()?;
        self.merge(&id, &changes).await
    }

    /// PATCH: replace と同じマージ。ただし空の更新は受け付けない
    #[instrument(skip(self, input))]
    pub async fn patch(&self, raw_id: &str, input: UpdateTodoInput) -> Result<Todo, TodoError> {
        let id = TodoId::parse(raw_id)?;
        let changes = input.validate()?;
        if changes.is_empty() {
            return Err(TodoError::Validation(vec![EMPTY_UPDATE_BODY.to_string()]));
        }
        self.merge(&id, &changes).await
    }

    async fn merge(&self, id: &TodoId, changes: &TodoChanges) -> Result<Todo, TodoError> {
        let updated = self
            .store
            .update(id, changes, Utc::now())
            .await?
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;

        info!(todo_id = %id, completed = updated.completed, "todo updated");
        Ok(updated)
    }

    /// 存在しない id の削除はエラーではなく false
    #[instrument(skip(self))]
    pub async fn delete(&self, raw_id: &str) -> Result<bool, TodoError> {
        let id = TodoId::parse(raw_id)?;
        let removed = self.store.delete(&id).await?;

        if removed {
            info!(todo_id = %id, "todo deleted");
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<TodoStatistics, TodoError> {
        let snapshot = self.store.find_many(&TodoFilter::all()).await?;
        Ok(TodoStatistics::from_todos(&snapshot))
    }

    pub async fn count(&self, filter: &TodoFilter) -> Result<u64, TodoError> {
        Ok(self.store.count(filter).await?)
    }
}
