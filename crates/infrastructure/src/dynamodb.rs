use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use domain::StoreError;
use shared::Config;
use std::fmt::Debug;
use tracing::{info, warn};

/// スロットリング等、時間をおけば成功しうるエラーコード
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "ThrottlingException",
    "RequestLimitExceeded",
    "InternalServerError",
    "ServiceUnavailable",
];

#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    /// 設定からクライアントを作成
    /// `DYNAMODB_ENDPOINT` があれば DynamoDB Local などへ向ける
    pub async fn new(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));
        if let Some(endpoint) = &config.dynamodb_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Self::from_client(Client::new(&aws_config), config.dynamodb_table.clone())
    }

    pub fn from_client(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// テーブルが無ければ作成する（ローカル開発とテスト用）
    pub async fn ensure_table(&self) -> Result<(), StoreError> {
        let exists = self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .is_ok();
        if exists {
            return Ok(());
        }

        info!(table = %self.table_name, "creating DynamoDB table");
        self.client
            .create_table()
            .table_name(&self.table_name)
            .billing_mode(BillingMode::PayPerRequest)
            .attribute_definitions(key_attribute("PK")?)
            .attribute_definitions(key_attribute("SK")?)
            .key_schema(key_schema("PK", KeyType::Hash)?)
            .key_schema(key_schema("SK", KeyType::Range)?)
            .send()
            .await
            .map_err(convert_error)?;
        Ok(())
    }
}

fn key_attribute(name: &str) -> Result<AttributeDefinition, StoreError> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| StoreError::Backend(e.to_string()))
}

fn key_schema(name: &str, key_type: KeyType) -> Result<KeySchemaElement, StoreError> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| StoreError::Backend(e.to_string()))
}

/// SDK エラーを `StoreError` に分類
///
/// 接続失敗・タイムアウト・スロットリングは `Unavailable`（リトライ対象）、
/// それ以外は `Backend`。条件付き書き込みの失敗は呼び出し側で個別に判定する。
pub(crate) fn convert_error<E, R>(error: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    match &error {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            warn!(error = ?error, "DynamoDB unreachable");
            StoreError::Unavailable(format!("DynamoDB unreachable: {error}"))
        }
        SdkError::ServiceError(service_error) => {
            let code = service_error.err().code().unwrap_or("Unknown");
            let message = service_error.err().message().unwrap_or_default();
            if TRANSIENT_ERROR_CODES.contains(&code) {
                StoreError::Unavailable(format!("{code}: {message}"))
            } else {
                StoreError::Backend(format!("{code}: {message}"))
            }
        }
        _ => StoreError::Backend(format!("DynamoDB request failed: {error}")),
    }
}

/// 条件付き書き込みが条件不一致で失敗したか
pub(crate) fn is_conditional_check_failure<E, R>(error: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    matches!(
        error,
        SdkError::ServiceError(service_error)
            if service_error.err().code() == Some("ConditionalCheckFailedException")
    )
}
