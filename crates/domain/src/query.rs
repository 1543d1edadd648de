//! 一覧取得のクエリ（フィルタ・ページング）

use crate::errors::DomainError;
use crate::input::{parse_bool_literal, validate_priority, PRIORITY_INVALID};
use crate::todo::{Priority, Todo};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

pub const PAGE_INVALID: &str = "page must be a positive integer";
pub const LIMIT_INVALID: &str = "limit must be an integer between 1 and 100";
pub const COMPLETED_FILTER_INVALID: &str = "completed must be \"true\" or \"false\"";
pub const SEARCH_EMPTY: &str = "search must not be empty";

/// URL クエリそのまま（すべて文字列）
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub completed: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn completed(mut self, completed: impl Into<String>) -> Self {
        self.completed = Some(completed.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// 全項目を検証し、エラーはまとめて返す
    pub fn validate(&self) -> Result<TodoQuery, DomainError> {
        let mut errors = Vec::new();

        let page = match self.page.as_deref() {
            None => Some(DEFAULT_PAGE),
            Some(raw) => match raw.parse::<u32>() {
                Ok(page) if page >= 1 => Some(page),
                _ => {
                    errors.push(PAGE_INVALID.to_string());
                    None
                }
            },
        };

        let limit = match self.limit.as_deref() {
            None => Some(DEFAULT_LIMIT),
            Some(raw) => match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => Some(limit),
                _ => {
                    errors.push(LIMIT_INVALID.to_string());
                    None
                }
            },
        };

        let completed = match self.completed.as_deref() {
            None => None,
            Some(raw) => {
                let parsed = parse_bool_literal(raw);
                if parsed.is_none() {
                    errors.push(COMPLETED_FILTER_INVALID.to_string());
                }
                parsed
            }
        };

        let priority = validate_priority(self.priority.as_deref(), PRIORITY_INVALID, &mut errors);

        let search = match self.search.as_deref() {
            Some(raw) if raw.trim().is_empty() => {
                errors.push(SEARCH_EMPTY.to_string());
                None
            }
            other => other.map(str::to_string),
        };

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let pagination = match (page, limit) {
            (Some(page), Some(limit)) => Pagination::new(page, limit)?,
            _ => return Err(DomainError::Validation(vec![PAGE_INVALID.to_string()])),
        };

        Ok(TodoQuery {
            pagination,
            filter: TodoFilter {
                completed,
                priority,
                search,
            },
        })
    }
}

/// 検証済みクエリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoQuery {
    pub pagination: Pagination,
    pub filter: TodoFilter,
}

/// フィルタ条件（指定された条件はすべて AND）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    /// text に対する大文字小文字を区別しない部分一致
    pub search: Option<String>,
}

impl TodoFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn matches(&self, todo: &Todo) -> bool {
        if let Some(completed) = self.completed {
            if todo.completed != completed {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if todo.priority != priority {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !todo.text.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// ページ指定。`page >= 1` かつ `1 <= limit <= 100` のものしか作れない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Result<Self, DomainError> {
        let mut errors = Vec::new();
        if page == 0 {
            errors.push(PAGE_INVALID.to_string());
        }
        if limit == 0 || limit > MAX_LIMIT {
            errors.push(LIMIT_INVALID.to_string());
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }

    /// 並び順を保ったまま該当ページを切り出す
    pub fn paginate(&self, matches: Vec<Todo>) -> TodoPage {
        let total = matches.len() as u64;
        let todos = matches
            .into_iter()
            .skip(self.offset())
            .take(self.limit as usize)
            .collect();

        TodoPage {
            todos,
            meta: PageMeta {
                total,
                page: self.page,
                limit: self.limit,
                total_pages: self.total_pages(total),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPage {
    pub todos: Vec<Todo>,
    pub meta: PageMeta,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::TodoId;
    use chrono::Utc;

    fn todo(text: &str, completed: bool, priority: Priority) -> Todo {
        Todo {
            id: TodoId::new(),
            text: text.to_string(),
            completed,
            priority,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn defaults_apply_when_query_is_empty() {
        let query = ListQuery::default().validate().unwrap();
        assert_eq!(query.pagination, Pagination::default());
        assert_eq!(query.filter, TodoFilter::all());
    }

    #[test]
    fn invalid_query_reports_every_problem() {
        let err = ListQuery::default()
            .page("0")
            .limit("101")
            .completed("yes")
            .priority("urgent")
            .search("   ")
            .validate()
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::Validation(vec![
                PAGE_INVALID.to_string(),
                LIMIT_INVALID.to_string(),
                COMPLETED_FILTER_INVALID.to_string(),
                PRIORITY_INVALID.to_string(),
                SEARCH_EMPTY.to_string(),
            ])
        );
    }

    #[test]
    fn negative_and_non_numeric_pages_are_rejected() {
        assert!(ListQuery::default().page("-1").validate().is_err());
        assert!(ListQuery::default().page("abc").validate().is_err());
        assert!(ListQuery::default().limit("0").validate().is_err());
        assert!(Pagination::new(0, 10).is_err());
        assert!(Pagination::new(1, 0).is_err());
    }

    #[test]
    fn filter_is_a_conjunction() {
        let filter = TodoFilter::all()
            .with_completed(false)
            .with_priority(Priority::High)
            .with_search("MILK");

        assert!(filter.matches(&todo("Buy milk", false, Priority::High)));
        assert!(!filter.matches(&todo("Buy milk", true, Priority::High)));
        assert!(!filter.matches(&todo("Buy milk", false, Priority::Low)));
        assert!(!filter.matches(&todo("Buy bread", false, Priority::High)));
    }

    #[test]
    fn second_page_of_three_with_limit_one() {
        let items = vec![
            todo("a", false, Priority::Low),
            todo("b", false, Priority::Low),
            todo("c", false, Priority::Low),
        ];
        let query = ListQuery::default().page("2").limit("1").validate().unwrap();

        let page = query.pagination.paginate(items.clone());

        assert_eq!(page.todos, vec![items[1].clone()]);
        assert_eq!(
            page.meta,
            PageMeta {
                total: 3,
                page: 2,
                limit: 1,
                total_pages: 3,
            }
        );
    }

    #[test]
    fn page_past_the_end_is_empty_with_accurate_meta() {
        let items = vec![todo("a", false, Priority::Low)];
        let page = Pagination::new(5, 10).unwrap().paginate(items);

        assert!(page.todos.is_empty());
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.meta.page, 5);
        assert_eq!(page.meta.total_pages, 1);
    }

    #[test]
    fn meta_serializes_total_pages_in_camel_case() {
        let page = Pagination::default().paginate(Vec::new());
        let json = serde_json::to_value(&page.meta).unwrap();
        assert_eq!(json["totalPages"], 0);
    }

    // プロパティベーステスト
    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn any_priority() -> impl Strategy<Value = Priority> {
            prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
        }

        fn any_todo() -> impl Strategy<Value = Todo> {
            ("[a-zA-Z ]{1,16}", any::<bool>(), any_priority())
                .prop_map(|(text, completed, priority)| todo(&text, completed, priority))
        }

        proptest! {
            #[test]
            fn pages_cover_every_match_exactly_once(
                count in 0usize..60,
                limit in 1u32..=MAX_LIMIT,
            ) {
                let items: Vec<Todo> = (0..count)
                    .map(|i| todo(&format!("item {i}"), false, Priority::Low))
                    .collect();

                let first = Pagination::new(1, limit).unwrap().paginate(items.clone());
                let total_pages = first.meta.total_pages;
                prop_assert_eq!(total_pages, (count as u64).div_ceil(u64::from(limit)));

                let mut seen = Vec::new();
                for page in 1..=total_pages.max(1) {
                    let p = Pagination::new(page as u32, limit).unwrap().paginate(items.clone());
                    prop_assert_eq!(p.meta.total, count as u64);
                    seen.extend(p.todos);
                }
                prop_assert_eq!(seen, items);
            }

            #[test]
            fn item_listed_iff_every_criterion_holds(
                items in proptest::collection::vec(any_todo(), 0..30),
                completed in proptest::option::of(any::<bool>()),
                priority in proptest::option::of(any_priority()),
                search in proptest::option::of("[a-zA-Z]{1,3}"),
            ) {
                let filter = TodoFilter { completed, priority, search: search.clone() };
                for item in &items {
                    let expected = completed.map_or(true, |c| item.completed == c)
                        && priority.map_or(true, |p| item.priority == p)
                        && search.as_ref().map_or(true, |s| {
                            item.text.to_lowercase().contains(&s.to_lowercase())
                        });
                    prop_assert_eq!(filter.matches(item), expected);
                }
            }
        }
    }
}
