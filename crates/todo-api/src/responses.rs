use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 成功レスポンスのエンベロープ `{ success: true, data }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// ヘルスチェック
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub db: String,
    pub backend: String,
    pub environment: String,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
    /// ストアに到達できたときの件数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todos: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub links: ServiceLinks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceLinks {
    pub api: String,
    pub health: String,
    pub todos: String,
}

/// 未定義ルート
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteNotFound {
    pub success: bool,
    pub error: String,
    pub message: String,
}
