use crate::errors::AppError;
use crate::tracing::LogFormat;
use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

/// ストアのバックエンド種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    DynamoDb,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "dynamodb" => Ok(StoreBackend::DynamoDb),
            other => Err(AppError::Configuration(format!(
                "STORE_BACKEND must be memory or dynamodb, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: IpAddr,
    pub port: u16,
    pub environment: String,
    pub store_backend: StoreBackend,
    /// インメモリストアにサンプル Todo を投入するか
    pub seed_sample_todos: bool,
    pub dynamodb_table: String,
    /// DynamoDB Local などのエンドポイント上書き
    pub dynamodb_endpoint: Option<String>,
    pub aws_region: String,
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を組み立てる（テストでは HashMap を渡す）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            bind_address: parse_value("BIND_ADDRESS", &get("BIND_ADDRESS", "127.0.0.1"))?,
            port: parse_value("PORT", &get("PORT", "3000"))?,
            environment: get("ENVIRONMENT", "development"),
            store_backend: get("STORE_BACKEND", "memory").parse()?,
            seed_sample_todos: parse_value("SEED_SAMPLE_TODOS", &get("SEED_SAMPLE_TODOS", "false"))?,
            dynamodb_table: get("DYNAMODB_TABLE", "todo-items"),
            dynamodb_endpoint: lookup("DYNAMODB_ENDPOINT").filter(|value| !value.is_empty()),
            aws_region: get("AWS_REGION", "ap-northeast-1"),
            retry_max_attempts: parse_value("RETRY_MAX_ATTEMPTS", &get("RETRY_MAX_ATTEMPTS", "5"))?,
            retry_initial_delay_ms: parse_value(
                "RETRY_INITIAL_DELAY_MS",
                &get("RETRY_INITIAL_DELAY_MS", "2000"),
            )?,
            request_timeout_ms: parse_value(
                "REQUEST_TIMEOUT_MS",
                &get("REQUEST_TIMEOUT_MS", "10000"),
            )?,
            log_format: get("LOG_FORMAT", "json").parse()?,
        };

        if config.retry_max_attempts == 0 {
            return Err(AppError::Configuration(
                "RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        // 0 だと全リクエストが即タイムアウトになる
        if config.request_timeout_ms == 0 {
            return Err(AppError::Configuration(
                "REQUEST_TIMEOUT_MS must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn retry_initial_delay(&self) -> Duration {
        Duration::from_millis(self.retry_initial_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Configuration(format!("invalid value for {key}: {raw}")))
}
