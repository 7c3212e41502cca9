//! Mock 采集器
//!
//! 用于测试的脚本化数据源，无需真实导出文件。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{CandidateRecord, Collector, ContractError, SourceConfig};
use tracing::debug;

/// 延迟结束后 mock 采集器的行为
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    /// 返回预设记录
    #[default]
    Succeed,
    /// 返回带此消息的采集错误
    Fail(String),
    /// 以此消息 panic
    Panic(String),
}

/// Mock 采集器
#[derive(Debug, Clone)]
pub struct MockCollector {
    name: String,
    records: Vec<CandidateRecord>,
    delay: Option<Duration>,
    behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockCollector {
    /// 返回 `records` 的采集器
    pub fn new(name: impl Into<String>, records: Vec<CandidateRecord>) -> Self {
        Self {
            name: name.into(),
            records,
            delay: None,
            behavior: MockBehavior::Succeed,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 总是出错的采集器
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Vec::new()).with_behavior(MockBehavior::Fail(message.into()))
    }

    /// 任务会 panic 的采集器
    pub fn panicking(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Vec::new()).with_behavior(MockBehavior::Panic(message.into()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// 迄今 `produce` 调用次数（克隆间共享）
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Collector for MockCollector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, _config: &SourceConfig) -> Result<Vec<CandidateRecord>, ContractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Succeed => {
                debug!(source = %self.name, records = self.records.len(), "mock source produced");
                Ok(self.records.clone())
            }
            MockBehavior::Fail(message) => Err(ContractError::collector(&self.name, message)),
            MockBehavior::Panic(message) => panic!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_counts_calls() {
        let mock = MockCollector::new("m", vec![CandidateRecord::default()]);
        let config = SourceConfig::inline("m", vec![]);

        let shared = mock.clone();
        assert_eq!(mock.produce(&config).await.unwrap().len(), 1);
        assert_eq!(shared.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockCollector::failing("m", "site down");
        let err = mock
            .produce(&SourceConfig::inline("m", vec![]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("site down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_is_applied() {
        let mock = MockCollector::new("m", vec![]).with_delay(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        mock.produce(&SourceConfig::inline("m", vec![]))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
