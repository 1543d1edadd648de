use crate::errors::DomainError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Todo の識別子（ULID）
///
/// ULID は生成時刻順にソートできるため、ストアの並び順（作成順）にそのまま使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(Ulid);

impl TodoId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 外部から受け取った文字列を検証して TodoId に変換する。
    /// 形式不正は「存在しない」ではなく `InvalidTodoId` として扱う。
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        Ulid::from_string(raw)
            .map(Self)
            .map_err(|_| DomainError::InvalidTodoId(raw.to_string()))
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for TodoId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 優先度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Todo エンティティ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    /// 初回更新までは None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Todo {
    /// 更新時刻を進める。
    /// `now` が直前の時刻以下の場合は 1µs だけ進め、単調増加を保つ。
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.updated_at.unwrap_or(self.created_at);
        let stamp = if now > floor {
            now
        } else {
            floor + Duration::microseconds(1)
        };
        self.updated_at = Some(stamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(created_at: DateTime<Utc>) -> Todo {
        Todo {
            id: TodoId::new(),
            text: "Task".into(),
            completed: false,
            priority: Priority::Low,
            created_at,
            updated_at: None,
        }
    }

    #[test]
    fn test_todo_id_round_trips_through_string() {
        let id = TodoId::new();
        let parsed = TodoId::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(id.to_string().len(), 26);
    }

    #[test]
    fn test_todo_id_rejects_malformed_input() {
        // 形式不正（ULID ではない）
        let err = TodoId::parse("not-a-valid-id").unwrap_err();
        assert_eq!(err, DomainError::InvalidTodoId("not-a-valid-id".into()));
        assert!("".parse::<TodoId>().is_err());
        assert!("42".parse::<TodoId>().is_err());
    }

    #[test]
    fn test_priority_parsing_and_default() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
        assert!("HIGH".parse::<Priority>().is_err());
        assert_eq!(Priority::default(), Priority::Low);
    }

    #[test]
    fn test_todo_serializes_camel_case_without_missing_updated_at() {
        let todo = sample(Utc::now());
        let json = serde_json::to_value(&todo).unwrap();

        assert_eq!(json["text"], "Task");
        assert_eq!(json["priority"], "low");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_none());
    }

    #[test]
    fn test_touch_is_strictly_increasing_even_with_stale_clock() {
        let created_at = Utc::now();
        let mut todo = sample(created_at);

        // 時計が進んでいない場合でも作成時刻より後になる
        todo.touch(created_at);
        let first = todo.updated_at.unwrap();
        assert!(first > created_at);

        // 過去の時刻を渡しても後退しない
        todo.touch(created_at - Duration::seconds(10));
        let second = todo.updated_at.unwrap();
        assert!(second > first);

        let later = second + Duration::seconds(1);
        todo.touch(later);
        assert_eq!(todo.updated_at, Some(later));
    }
}
