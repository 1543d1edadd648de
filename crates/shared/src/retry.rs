use domain::StoreError;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::errors::{AppError, RetryStrategy};

/// リトライ可能かどうかを判定できるエラー
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for AppError {
    fn is_retryable(&self) -> bool {
        self.metadata().retryable
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict(_))
    }
}

/// リトライ実行結果
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// 成功
    Success(T),
    /// 最大試行回数に達して失敗
    MaxAttemptsReached(E),
    /// リトライ不可能なエラーで失敗
    NonRetryable(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::MaxAttemptsReached(error) | RetryResult::NonRetryable(error) => Err(error),
        }
    }
}

/// リトライ実行器
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    strategy: RetryStrategy,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryStrategy::default())
    }
}

impl RetryExecutor {
    pub fn new(strategy: RetryStrategy) -> Self {
        Self { strategy }
    }

    /// 固定間隔設定でリトライ実行器を作成
    pub fn fixed_interval(max_attempts: u32, interval: Duration) -> Self {
        Self::new(RetryStrategy {
            max_attempts,
            initial_delay: interval,
            max_delay: interval,
            backoff_multiplier: 1.0,
            add_jitter: false,
        })
    }

    /// 操作をリトライ付きで実行
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 1;

        loop {
            debug!(
                "Executing operation, attempt {}/{}",
                attempt, self.strategy.max_attempts
            );

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Operation succeeded after {} attempts", attempt);
                    }
                    return RetryResult::Success(result);
                }
                Err(error) => {
                    if !error.is_retryable() {
                        warn!("Non-retryable error encountered: {}", error);
                        return RetryResult::NonRetryable(error);
                    }

                    if attempt >= self.strategy.max_attempts {
                        error!(
                            "Max attempts ({}) reached, giving up: {}",
                            self.strategy.max_attempts, error
                        );
                        return RetryResult::MaxAttemptsReached(error);
                    }

                    let delay = self.calculate_delay(attempt);
                    warn!(
                        "Operation failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, self.strategy.max_attempts, delay, error
                    );

                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = if self.strategy.backoff_multiplier == 1.0 {
            self.strategy.initial_delay
        } else {
            let multiplier = self.strategy.backoff_multiplier.powi((attempt - 1) as i32);
            Duration::from_millis(
                (self.strategy.initial_delay.as_millis() as f64 * multiplier) as u64,
            )
        };

        let delay = std::cmp::min(base_delay, self.strategy.max_delay);

        if self.strategy.add_jitter {
            add_jitter(delay)
        } else {
            delay
        }
    }
}

/// ±25% のランダム変動
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor = rng.gen_range(0.75..=1.25);
    Duration::from_millis((delay.as_millis() as f64 * jitter_factor) as u64)
}
