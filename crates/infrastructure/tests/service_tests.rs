use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    CreateTodoInput, ListQuery, Priority, StoreError, Todo, TodoChanges, TodoDraft, TodoError,
    TodoFilter, TodoId, TodoService, TodoStore, UpdateTodoInput,
};
use infrastructure::InMemoryTodoStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn memory_service() -> TodoService {
    TodoService::new(Arc::new(InMemoryTodoStore::new()))
}

async fn create(service: &TodoService, text: &str) -> Todo {
    service.create(CreateTodoInput::new(text)).await.unwrap()
}

/// 切り替え可能な障害を注入するストア
struct FlakyStore {
    inner: InMemoryTodoStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: InMemoryTodoStore::new(),
            down: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TodoStore for FlakyStore {
    async fn find_many(&self, filter: &TodoFilter) -> Result<Vec<Todo>, StoreError> {
        self.check()?;
        self.inner.find_many(filter).await
    }

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, StoreError> {
        self.check()?;
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, draft: TodoDraft, created_at: DateTime<Utc>) -> Result<Todo, StoreError> {
        self.check()?;
        self.inner.insert(draft, created_at).await
    }

    async fn update(
        &self,
        id: &TodoId,
        changes: &TodoChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Todo>, StoreError> {
        self.check()?;
        self.inner.update(id, changes, now).await
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn count(&self, filter: &TodoFilter) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.count(filter).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn test_create_patch_delete_keeps_statistics_consistent() {
    // Arrange
    let service = TodoService::new(Arc::new(InMemoryTodoStore::with_sample_todos().unwrap()));
    let before = service.statistics().await.unwrap();

    // Act: 作成
    let todo = service
        .create(CreateTodoInput::new("Buy milk").with_priority("high"))
        .await
        .unwrap();
    let after_create = service.statistics().await.unwrap();

    // Assert
    assert_eq!(after_create.total, before.total + 1);
    assert_eq!(after_create.by_priority.high, before.by_priority.high + 1);
    assert_eq!(after_create.pending, before.pending + 1);
    assert_eq!(after_create.completed + after_create.pending, after_create.total);

    // Act: 文字列の "true" で完了にする
    let patched = service
        .patch(&todo.id.to_string(), UpdateTodoInput::completed("true"))
        .await
        .unwrap();
    let after_patch = service.statistics().await.unwrap();

    assert!(patched.completed);
    assert_eq!(after_patch.completed, after_create.completed + 1);
    assert_eq!(after_patch.pending, after_create.pending - 1);

    // Act: 削除
    assert!(service.delete(&todo.id.to_string()).await.unwrap());
    let after_delete = service.statistics().await.unwrap();

    assert_eq!(after_delete, before);
}

#[tokio::test]
async fn test_delete_twice_is_true_then_false() {
    let service = memory_service();
    let todo = create(&service, "once").await;
    let id = todo.id.to_string();

    assert!(service.delete(&id).await.unwrap());
    assert!(!service.delete(&id).await.unwrap());
}

#[tokio::test]
async fn test_create_then_get_returns_equal_entity() {
    let service = memory_service();
    let created = service
        .create(
            CreateTodoInput::new("  Write report  ")
                .with_priority("medium")
                .with_completed(true),
        )
        .await
        .unwrap();

    let fetched = service.get(&created.id.to_string()).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.text, "Write report");
    assert_eq!(fetched.priority, Priority::Medium);
    assert!(fetched.completed);
    assert_eq!(fetched.updated_at, None);
}

#[tokio::test]
async fn test_second_page_of_three() {
    let service = memory_service();
    let _first = create(&service, "first").await;
    let second = create(&service, "second").await;
    let _third = create(&service, "third").await;

    let page = service
        .list(&ListQuery::default().page("2").limit("1"))
        .await
        .unwrap();

    assert_eq!(page.todos, vec![second]);
    assert_eq!(page.meta.total, 3);
    assert_eq!(page.meta.page, 2);
    assert_eq!(page.meta.limit, 1);
    assert_eq!(page.meta.total_pages, 3);
}

#[tokio::test]
async fn test_page_past_the_end_is_empty_with_real_total() {
    let service = memory_service();
    create(&service, "only").await;

    let page = service
        .list(&ListQuery::default().page("5").limit("10"))
        .await
        .unwrap();

    assert!(page.todos.is_empty());
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.meta.total_pages, 1);
}

#[tokio::test]
async fn test_list_filters_are_conjunctive() {
    let service = TodoService::new(Arc::new(InMemoryTodoStore::with_sample_todos().unwrap()));

    let page = service
        .list(&ListQuery::default().completed("false").priority("low"))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.todos[0].text, "Write tests");

    let page = service
        .list(&ListQuery::default().search("BUILD"))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.todos[0].text, "Build API");

    let page = service
        .list(&ListQuery::default().search("build").completed("false"))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 0);
    assert_eq!(page.meta.total_pages, 0);
}

#[tokio::test]
async fn test_invalid_list_query_collects_every_problem() {
    let service = memory_service();

    let err = service
        .list(&ListQuery::default().page("0").limit("500").priority("urgent"))
        .await
        .unwrap_err();

    match err {
        TodoError::Validation(details) => assert_eq!(details.len(), 3),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_distinguishes_malformed_and_absent_ids() {
    let service = memory_service();

    assert!(matches!(
        service.get("not-a-valid-id").await,
        Err(TodoError::InvalidIdentifier(_))
    ));
    assert!(matches!(
        service.get(&TodoId::new().to_string()).await,
        Err(TodoError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_writes_reject_malformed_ids_before_anything_else() {
    let service = memory_service();
    create(&service, "untouched").await;

    let malformed = || TodoError::InvalidIdentifier("not-a-valid-id".to_string());

    // 削除は「存在しない」(false) ではなく id エラーになる
    assert_eq!(service.delete("not-a-valid-id").await, Err(malformed()));
    assert_eq!(
        service
            .patch("not-a-valid-id", UpdateTodoInput::completed(true))
            .await,
        Err(malformed())
    );
    assert_eq!(
        service
            .replace("not-a-valid-id", UpdateTodoInput::text("x"))
            .await,
        Err(malformed())
    );
    // ボディも不正な場合でも id エラーが優先される
    assert_eq!(
        service
            .patch("not-a-valid-id", UpdateTodoInput::priority("urgent"))
            .await,
        Err(malformed())
    );

    let stats = service.statistics().await.unwrap();
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn test_patch_merges_and_advances_updated_at() {
    let service = memory_service();
    let todo = service
        .create(CreateTodoInput::new("Draft").with_priority("low"))
        .await
        .unwrap();
    let id = todo.id.to_string();

    let first = service
        .patch(&id, UpdateTodoInput::priority("high"))
        .await
        .unwrap();
    let second = service
        .replace(&id, UpdateTodoInput::text("Final"))
        .await
        .unwrap();

    assert_eq!(first.text, "Draft");
    assert_eq!(first.priority, Priority::High);
    assert_eq!(second.text, "Final");
    assert_eq!(second.priority, Priority::High);
    assert_eq!(second.created_at, todo.created_at);
    assert!(first.updated_at.unwrap() > todo.created_at);
    assert!(second.updated_at.unwrap() > first.updated_at.unwrap());
}

#[tokio::test]
async fn test_empty_patch_is_rejected_but_empty_put_touches() {
    let service = memory_service();
    let todo = create(&service, "steady").await;
    let id = todo.id.to_string();

    assert!(matches!(
        service.patch(&id, UpdateTodoInput::default()).await,
        Err(TodoError::Validation(_))
    ));

    let touched = service.replace(&id, UpdateTodoInput::default()).await.unwrap();
    assert_eq!(touched.text, "steady");
    assert!(touched.updated_at.is_some());
}

#[tokio::test]
async fn test_update_of_absent_todo_is_not_found() {
    let service = memory_service();

    let result = service
        .patch(&TodoId::new().to_string(), UpdateTodoInput::text("ghost"))
        .await;

    assert!(matches!(result, Err(TodoError::NotFound(_))));
}

#[tokio::test]
async fn test_concurrent_patches_keep_every_field() {
    let service = memory_service();
    let todo = create(&service, "contended").await;
    let id = todo.id.to_string();

    let (a, b) = tokio::join!(
        service.patch(&id, UpdateTodoInput::completed(true)),
        service.patch(&id, UpdateTodoInput::priority("high")),
    );
    a.unwrap();
    b.unwrap();

    let stored = service.get(&id).await.unwrap();
    assert!(stored.completed);
    assert_eq!(stored.priority, Priority::High);
}

#[tokio::test]
async fn test_store_outage_is_unavailable_never_not_found() {
    // Arrange
    let store = Arc::new(FlakyStore::new());
    let service = TodoService::new(store.clone());
    let todo = create(&service, "survivor").await;
    let id = todo.id.to_string();

    // Act
    store.set_down(true);

    // Assert
    assert!(matches!(
        service.get(&id).await,
        Err(TodoError::StoreUnavailable(_))
    ));
    assert!(matches!(
        service.delete(&id).await,
        Err(TodoError::StoreUnavailable(_))
    ));
    assert!(matches!(
        service.list(&ListQuery::default()).await,
        Err(TodoError::StoreUnavailable(_))
    ));
    assert!(matches!(
        service.statistics().await,
        Err(TodoError::StoreUnavailable(_))
    ));

    // 復旧後は元のデータが見える
    store.set_down(false);
    assert_eq!(service.get(&id).await.unwrap(), todo);
}
