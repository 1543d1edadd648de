//! インメモリ実装（開発/テスト用）

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use domain::{
    Priority, StoreError, Todo, TodoChanges, TodoDraft, TodoFilter, TodoId, TodoStore,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use ulid::Generator;

/// プロセス内に Todo を保持するストア
///
/// 全操作は 1 つの Mutex で直列化される。`update` の read-modify-write も
/// 同じクリティカルセクション内で完結するため、同時 PATCH で更新が失われない。
/// id は単調増加する ULID ジェネレータで採番し、BTreeMap のキー順がそのまま作成順になる。
pub struct InMemoryTodoStore {
    state: Mutex<InMemoryState>,
}

struct InMemoryState {
    todos: BTreeMap<TodoId, Todo>,
    ids: Generator,
}

impl InMemoryState {
    fn next_id(&mut self) -> Result<TodoId, StoreError> {
        self.ids
            .generate()
            .map(TodoId::from_ulid)
            .map_err(|e| StoreError::Backend(format!("id generator exhausted: {e}")))
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(InMemoryState {
                todos: BTreeMap::new(),
                ids: Generator::new(),
            }),
        }
    }

    /// サンプル 3 件を投入した状態で作成
    pub fn with_sample_todos() -> Result<Self, StoreError> {
        let store = Self::new();
        let samples = [
            ("Learn Rust", false, Priority::High, (2024, 1, 1)),
            ("Build API", true, Priority::Medium, (2024, 1, 2)),
            ("Write tests", false, Priority::Low, (2024, 1, 3)),
        ];

        {
            let mut state = store.lock()?;
            for (text, completed, priority, (year, month, day)) in samples {
                let created_at = Utc
                    .with_ymd_and_hms(year, month, day, 0, 0, 0)
                    .single()
                    .ok_or_else(|| StoreError::Backend("invalid sample date".to_string()))?;
                let id = state.next_id()?;
                let draft = TodoDraft {
                    text: text.to_string(),
                    completed,
                    priority,
                };
                state.todos.insert(id, draft.into_todo(id, created_at));
            }
        }
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn find_many(&self, filter: &TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .todos
            .values()
            .filter(|todo| filter.matches(todo))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, StoreError> {
        Ok(self.lock()?.todos.get(id).cloned())
    }

    async fn insert(
        &self,
        draft: TodoDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Todo, StoreError> {
        let mut state = self.lock()?;
        let id = state.next_id()?;
        let todo = draft.into_todo(id, created_at);
        state.todos.insert(id, todo.clone());

        debug!(todo_id = %id, "todo inserted into memory store");
        Ok(todo)
    }

    async fn update(
        &self,
        id: &TodoId,
        changes: &TodoChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Todo>, StoreError> {
        let mut state = self.lock()?;
        Ok(state.todos.get_mut(id).map(|todo| {
            changes.apply_to(todo, now);
            todo.clone()
        }))
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, StoreError> {
        Ok(self.lock()?.todos.remove(id).is_some())
    }

    async fn count(&self, filter: &TodoFilter) -> Result<u64, StoreError> {
        let state = self.lock()?;
        Ok(state.todos.values().filter(|todo| filter.matches(todo)).count() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
