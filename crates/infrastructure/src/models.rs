use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use domain::{Priority, StoreError, Todo, TodoId};
use std::collections::HashMap;

/// 全 Todo を 1 パーティションに置く。SK の ULID 順がそのまま作成順になる
pub const TODO_PARTITION: &str = "TODO";
pub const TODO_SORT_PREFIX: &str = "TODO#";

/// DynamoDB 上のキー構造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoKeys {
    pub pk: String,
    pub sk: String,
}

impl TodoKeys {
    pub fn for_todo(id: &TodoId) -> Self {
        Self {
            pk: TODO_PARTITION.to_string(),
            sk: format!("{TODO_SORT_PREFIX}{id}"),
        }
    }

    pub fn to_key_map(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(self.pk.clone())),
            ("SK".to_string(), AttributeValue::S(self.sk.clone())),
        ])
    }
}

/// 楽観的ロック用のバージョン付き Todo アイテム
#[derive(Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub todo: Todo,
    pub version: u64,
}

impl TodoItem {
    pub fn new(todo: Todo) -> Self {
        Self { todo, version: 1 }
    }

    /// 次のバージョンとして書き戻すアイテム
    pub fn next_version(&self, todo: Todo) -> Self {
        Self {
            todo,
            version: self.version + 1,
        }
    }

    pub fn to_attribute_map(&self) -> HashMap<String, AttributeValue> {
        let todo = &self.todo;
        let mut map = TodoKeys::for_todo(&todo.id).to_key_map();

        map.insert("Id".to_string(), AttributeValue::S(todo.id.to_string()));
        map.insert("Text".to_string(), AttributeValue::S(todo.text.clone()));
        map.insert("Completed".to_string(), AttributeValue::Bool(todo.completed));
        map.insert(
            "Priority".to_string(),
            AttributeValue::S(todo.priority.as_str().to_string()),
        );
        map.insert(
            "CreatedAt".to_string(),
            AttributeValue::S(todo.created_at.to_rfc3339()),
        );
        if let Some(updated_at) = todo.updated_at {
            map.insert(
                "UpdatedAt".to_string(),
                AttributeValue::S(updated_at.to_rfc3339()),
            );
        }
        map.insert(
            "Version".to_string(),
            AttributeValue::N(self.version.to_string()),
        );

        map
    }

    /// アイテムから復元。欠損・不正な属性は `StoreError::Corrupted`
    pub fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Self, StoreError> {
        let id = TodoId::parse(string_attr(map, "Id")?)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;

        let text = string_attr(map, "Text")?.to_string();

        let completed = *map
            .get("Completed")
            .and_then(|v| v.as_bool().ok())
            .ok_or_else(|| corrupted("Completed"))?;

        let priority: Priority = string_attr(map, "Priority")?
            .parse()
            .map_err(StoreError::Corrupted)?;

        let created_at = timestamp_attr(map, "CreatedAt")?.ok_or_else(|| corrupted("CreatedAt"))?;
        let updated_at = timestamp_attr(map, "UpdatedAt")?;

        let version = map
            .get("Version")
            .and_then(|v| v.as_n().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| corrupted("Version"))?;

        Ok(Self {
            todo: Todo {
                id,
                text,
                completed,
                priority,
                created_at,
                updated_at,
            },
            version,
        })
    }
}

fn corrupted(attribute: &str) -> StoreError {
    StoreError::Corrupted(format!("missing or invalid {attribute}"))
}

fn string_attr<'a>(
    map: &'a HashMap<String, AttributeValue>,
    attribute: &str,
) -> Result<&'a str, StoreError> {
    map.get(attribute)
        .and_then(|v| v.as_s().ok())
        .map(String::as_str)
        .ok_or_else(|| corrupted(attribute))
}

/// 任意属性の RFC3339 タイムスタンプ。存在して読めない場合のみエラー
fn timestamp_attr(
    map: &HashMap<String, AttributeValue>,
    attribute: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    match map.get(attribute) {
        None => Ok(None),
        Some(value) => value
            .as_s()
            .ok()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .ok_or_else(|| corrupted(attribute)),
    }
}
