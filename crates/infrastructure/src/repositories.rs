use crate::dynamodb::{convert_error, is_conditional_check_failure, DynamoDbClient};
use crate::models::{TodoItem, TodoKeys, TODO_PARTITION};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue, Select};
use chrono::{DateTime, Utc};
use domain::{StoreError, Todo, TodoChanges, TodoDraft, TodoFilter, TodoId, TodoStore};
use shared::{RetryExecutor, RetryStrategy};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use ulid::Generator;

type Item = HashMap<String, AttributeValue>;

/// DynamoDB バックエンドの Todo ストア
///
/// 更新はバージョン番号による楽観的ロック（CAS）で行い、
/// 条件不一致は `StoreError::Conflict` として読み直しから再試行する。
pub struct DynamoDbTodoStore {
    db: DynamoDbClient,
    retry: RetryExecutor,
    ids: Mutex<Generator>,
}

impl DynamoDbTodoStore {
    pub fn new(db: DynamoDbClient) -> Self {
        Self::with_retry(db, RetryExecutor::new(RetryStrategy::concurrent_modification()))
    }

    pub fn with_retry(db: DynamoDbClient, retry: RetryExecutor) -> Self {
        Self {
            db,
            retry,
            ids: Mutex::new(Generator::new()),
        }
    }

    fn next_id(&self) -> Result<TodoId, StoreError> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|_| StoreError::Backend("id generator lock poisoned".to_string()))?;
        ids.generate()
            .map(TodoId::from_ulid)
            .map_err(|e| StoreError::Backend(format!("id generator exhausted: {e}")))
    }

    async fn get_item(&self, id: &TodoId) -> Result<Option<TodoItem>, StoreError> {
        let output = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .set_key(Some(TodoKeys::for_todo(id).to_key_map()))
            .consistent_read(true)
            .send()
            .await
            .map_err(convert_error)?;

        output
            .item
            .as_ref()
            .map(TodoItem::from_attribute_map)
            .transpose()
    }

    /// パーティション全体をページングしながら取得
    async fn query_items(&self, filter: &TodoFilter) -> Result<Vec<Item>, StoreError> {
        let expression = FilterExpression::from_filter(filter);
        let mut items = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .db
                .client()
                .query()
                .table_name(self.db.table_name())
                .key_condition_expression("PK = :pk")
                .set_filter_expression(expression.expression.clone())
                .set_expression_attribute_names(expression.names())
                .set_expression_attribute_values(Some(expression.values.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(convert_error)?;

            items.extend(output.items.unwrap_or_default());
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        Ok(items)
    }

    async fn query_count(&self, filter: &TodoFilter) -> Result<u64, StoreError> {
        let expression = FilterExpression::from_filter(filter);
        let mut total: u64 = 0;
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .db
                .client()
                .query()
                .table_name(self.db.table_name())
                .key_condition_expression("PK = :pk")
                .select(Select::Count)
                .set_filter_expression(expression.expression.clone())
                .set_expression_attribute_names(expression.names())
                .set_expression_attribute_values(Some(expression.values.clone()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(convert_error)?;

            total += u64::try_from(output.count).unwrap_or_default();
            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }
        Ok(total)
    }

    async fn try_insert(
        &self,
        draft: &TodoDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Todo, StoreError> {
        let id = self.next_id()?;
        let item = TodoItem::new(draft.clone().into_todo(id, created_at));

        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item.to_attribute_map()))
            .condition_expression("attribute_not_exists(PK) AND attribute_not_exists(SK)")
            .send()
            .await
            .map_err(|e| {
                if is_conditional_check_failure(&e) {
                    StoreError::Conflict(format!("todo id already taken: {id}"))
                } else {
                    convert_error(e)
                }
            })?;

        Ok(item.todo)
    }

    /// 読み出し → マージ → バージョン条件付き書き戻し（1 回分）
    async fn try_update(
        &self,
        id: &TodoId,
        changes: &TodoChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Todo>, StoreError> {
        let Some(current) = self.get_item(id).await? else {
            return Ok(None);
        };

        let mut todo = current.todo.clone();
        changes.apply_to(&mut todo, now);
        let next = current.next_version(todo);

        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(next.to_attribute_map()))
            .condition_expression("Version = :expected")
            .expression_attribute_values(
                ":expected",
                AttributeValue::N(current.version.to_string()),
            )
            .send()
            .await
            .map_err(|e| {
                if is_conditional_check_failure(&e) {
                    debug!(todo_id = %id, version = current.version, "version conflict");
                    StoreError::Conflict(format!(
                        "todo {id} changed since version {}",
                        current.version
                    ))
                } else {
                    convert_error(e)
                }
            })?;

        Ok(Some(next.todo))
    }
}

#[async_trait]
impl TodoStore for DynamoDbTodoStore {
    async fn find_many(&self, filter: &TodoFilter) -> Result<Vec<Todo>, StoreError> {
        let items = self
            .retry
            .execute(|| self.query_items(filter))
            .await
            .into_result()?;

        let mut todos = Vec::with_capacity(items.len());
        for item in &items {
            let todo = TodoItem::from_attribute_map(item)
                .map_err(|e| {
                    error!(error = %e, "undecodable todo item");
                    e
                })?
                .todo;
            // 大文字小文字を区別しない検索は DynamoDB 側で表現できないためここで絞る
            if filter.matches(&todo) {
                todos.push(todo);
            }
        }
        Ok(todos)
    }

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, StoreError> {
        let item = self.retry.execute(|| self.get_item(id)).await.into_result()?;
        Ok(item.map(|item| item.todo))
    }

    async fn insert(&self, draft: TodoDraft, created_at: DateTime<Utc>) -> Result<Todo, StoreError> {
        let todo = self
            .retry
            .execute(|| self.try_insert(&draft, created_at))
            .await
            .into_result()?;

        debug!(todo_id = %todo.id, table = %self.db.table_name(), "todo item written");
        Ok(todo)
    }

    async fn update(
        &self,
        id: &TodoId,
        changes: &TodoChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Todo>, StoreError> {
        let result = self
            .retry
            .execute(|| self.try_update(id, changes, now))
            .await
            .into_result();

        if let Err(StoreError::Conflict(_)) = &result {
            warn!(todo_id = %id, "giving up after repeated version conflicts");
        }
        result
    }

    async fn delete(&self, id: &TodoId) -> Result<bool, StoreError> {
        let output = self
            .retry
            .execute(|| async move {
                self.db
                    .client()
                    .delete_item()
                    .table_name(self.db.table_name())
                    .set_key(Some(TodoKeys::for_todo(id).to_key_map()))
                    .return_values(ReturnValue::AllOld)
                    .send()
                    .await
                    .map_err(convert_error)
            })
            .await
            .into_result()?;

        let deleted = output.attributes.is_some_and(|attributes| !attributes.is_empty());
        if deleted {
            info!(todo_id = %id, "todo item deleted");
        }
        Ok(deleted)
    }

    async fn count(&self, filter: &TodoFilter) -> Result<u64, StoreError> {
        if filter.search.is_some() {
            return Ok(self.find_many(filter).await?.len() as u64);
        }
        self.retry
            .execute(|| self.query_count(filter))
            .await
            .into_result()
    }

    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }
}

/// 完了状態・優先度の条件を DynamoDB のフィルタ式に変換したもの
#[derive(Debug, Clone, PartialEq)]
struct FilterExpression {
    expression: Option<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl FilterExpression {
    fn from_filter(filter: &TodoFilter) -> Self {
        let mut clauses = Vec::new();
        let mut names = HashMap::new();
        let mut values = HashMap::from([(
            ":pk".to_string(),
            AttributeValue::S(TODO_PARTITION.to_string()),
        )]);

        if let Some(completed) = filter.completed {
            clauses.push("#completed = :completed");
            names.insert("#completed".to_string(), "Completed".to_string());
            values.insert(":completed".to_string(), AttributeValue::Bool(completed));
        }
        if let Some(priority) = filter.priority {
            clauses.push("#priority = :priority");
            names.insert("#priority".to_string(), "Priority".to_string());
            values.insert(
                ":priority".to_string(),
                AttributeValue::S(priority.as_str().to_string()),
            );
        }

        Self {
            expression: (!clauses.is_empty()).then(|| clauses.join(" AND ")),
            names,
            values,
        }
    }

    /// 未使用の属性名は DynamoDB に拒否されるため、空なら渡さない
    fn names(&self) -> Option<HashMap<String, String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }
}
