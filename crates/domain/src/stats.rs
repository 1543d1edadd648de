use crate::todo::{Priority, Todo};
use serde::{Deserialize, Serialize};

/// 優先度別の件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
}

impl PriorityBreakdown {
    pub fn get(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Low => self.low,
            Priority::Medium => self.medium,
            Priority::High => self.high,
        }
    }

    pub fn sum(&self) -> u64 {
        self.low + self.medium + self.high
    }
}

/// 集計値。`completed + pending == total`、優先度別の合計も `total` に一致する
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoStatistics {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
    pub by_priority: PriorityBreakdown,
}

impl TodoStatistics {
    /// 1 回のスナップショットから集計する
    pub fn from_todos<'a, I>(todos: I) -> Self
    where
        I: IntoIterator<Item = &'a Todo>,
    {
        todos.into_iter().fold(Self::default(), |mut stats, todo| {
            stats.total += 1;
            if todo.completed {
                stats.completed += 1;
            } else {
                stats.pending += 1;
            }
            match todo.priority {
                Priority::Low => stats.by_priority.low += 1,
                Priority::Medium => stats.by_priority.medium += 1,
                Priority::High => stats.by_priority.high += 1,
            }
            stats
        })
    }
}
