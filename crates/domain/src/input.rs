//! 入力の正規化とバリデーション
//!
//! 外部から届く生の入力は JSON 値のまま受け取り、型の検査もここで行う。
//! どのフィールドの誤りも 1 つのバリデーションエラーにまとめて返し、
//! 以降の層には正規化済みの値しか流さない。

use crate::errors::DomainError;
use crate::todo::{Priority, Todo, TodoId};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

pub const TEXT_REQUIRED: &str = "text is required and must be a non-empty string";
pub const TEXT_NOT_BLANK: &str = "text must be a non-empty string";
pub const COMPLETED_INVALID: &str = "completed must be a boolean or \"true\"/\"false\"";
pub const PRIORITY_INVALID: &str = "priority must be low, medium, or high";
pub const EMPTY_UPDATE_BODY: &str =
    "empty update body: provide at least one of text, completed, priority";

pub(crate) fn parse_bool_literal(text: &str) -> Option<bool> {
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// 空白のみ・文字列以外は None
fn non_blank_text(raw: &Value) -> Option<String> {
    match raw.as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => None,
    }
}

/// bool もしくは "true"/"false" のみ受理する
fn validate_completed(raw: Option<&Value>, errors: &mut Vec<String>) -> Option<bool> {
    let normalized = match raw? {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => parse_bool_literal(text),
        _ => None,
    };
    if normalized.is_none() {
        errors.push(COMPLETED_INVALID.to_string());
    }
    normalized
}

pub(crate) fn validate_priority(
    raw: Option<&str>,
    message: &str,
    errors: &mut Vec<String>,
) -> Option<Priority> {
    let raw = raw?;
    match raw.parse::<Priority>() {
        Ok(priority) => Some(priority),
        Err(_) => {
            errors.push(message.to_string());
            None
        }
    }
}

fn validate_priority_value(raw: Option<&Value>, errors: &mut Vec<String>) -> Option<Priority> {
    match raw? {
        Value::String(text) => validate_priority(Some(text.as_str()), PRIORITY_INVALID, errors),
        _ => {
            errors.push(PRIORITY_INVALID.to_string());
            None
        }
    }
}

/// POST /todos の入力
///
/// `null` は未指定と同じ扱い。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateTodoInput {
    pub text: Option<Value>,
    pub completed: Option<Value>,
    pub priority: Option<Value>,
}

impl CreateTodoInput {
    pub fn new(text: impl Into<Value>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: impl Into<Value>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_completed(mut self, completed: impl Into<Value>) -> Self {
        self.completed = Some(completed.into());
        self
    }

    /// 全フィールドを検証し、エラーはまとめて返す
    pub fn validate(self) -> Result<TodoDraft, DomainError> {
        let mut errors = Vec::new();

        let text = self.text.as_ref().and_then(non_blank_text);
        if text.is_none() {
            errors.push(TEXT_REQUIRED.to_string());
        }
        let completed = validate_completed(self.completed.as_ref(), &mut errors);
        let priority = validate_priority_value(self.priority.as_ref(), &mut errors);

        match text {
            Some(text) if errors.is_empty() => Ok(TodoDraft {
                text,
                completed: completed.unwrap_or(false),
                priority: priority.unwrap_or_default(),
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}

/// PUT/PATCH /todos/:id の入力（指定されたフィールドのみ上書き）
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateTodoInput {
    pub text: Option<Value>,
    pub completed: Option<Value>,
    pub priority: Option<Value>,
}

impl UpdateTodoInput {
    pub fn text(text: impl Into<Value>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn completed(completed: impl Into<Value>) -> Self {
        Self {
            completed: Some(completed.into()),
            ..Self::default()
        }
    }

    pub fn priority(priority: impl Into<Value>) -> Self {
        Self {
            priority: Some(priority.into()),
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<TodoChanges, DomainError> {
        let mut errors = Vec::new();

        let text = match self.text.as_ref() {
            None => None,
            Some(raw) => {
                let text = non_blank_text(raw);
                if text.is_none() {
                    errors.push(TEXT_NOT_BLANK.to_string());
                }
                text
            }
        };
        let completed = validate_completed(self.completed.as_ref(), &mut errors);
        let priority = validate_priority_value(self.priority.as_ref(), &mut errors);

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        Ok(TodoChanges {
            text,
            completed,
            priority,
        })
    }
}

/// 検証済みの新規 Todo（id と作成時刻はストアが付与）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDraft {
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
}

impl TodoDraft {
    pub fn into_todo(self, id: TodoId, created_at: DateTime<Utc>) -> Todo {
        Todo {
            id,
            text: self.text,
            completed: self.completed,
            priority: self.priority,
            created_at,
            updated_at: None,
        }
    }
}

/// 検証済みの更新内容（マージ更新）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

impl TodoChanges {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none() && self.priority.is_none()
    }

    /// 指定フィールドのみ上書きし、`updated_at` を必ず進める。
    /// どのバックエンドもこの関数でマージする。
    pub fn apply_to(&self, todo: &mut Todo, now: DateTime<Utc>) {
        if let Some(text) = &self.text {
            todo.text = text.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(priority) = self.priority {
            todo.priority = priority;
        }
        todo.touch(now);
    }
}
