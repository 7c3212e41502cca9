//! CampaignBlueprint - Config Loader 输出
//!
//! 描述完整的外呼活动：采集数据源、采集限制、派发节流、传输方式与消息模板。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::CandidateRecord;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整活动蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// 活动标识与状态文件位置
    pub campaign: CampaignConfig,

    /// 采集器编排设置
    #[serde(default)]
    pub collection: CollectionConfig,

    /// 派发节流与重试设置
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// 出站传输
    pub transport: TransportConfig,

    /// 消息变体，轮询使用
    pub templates: Vec<TemplateConfig>,

    /// 数据源，按注册顺序
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// 活动标识及其状态存放位置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub name: String,

    /// 投递台账快照路径
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// 规范化记录存储路径
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("state/ledger.json")
}

fn default_store_path() -> PathBuf {
    PathBuf::from("state/records.json")
}

/// 采集器编排设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CollectionConfig {
    /// 同时运行的采集器上限
    #[serde(default = "default_concurrency_limit")]
    #[validate(range(min = 1, max = 64))]
    pub concurrency_limit: usize,

    /// 允许的地区（空 = 全部接受）
    #[serde(default)]
    pub allowed_regions: Vec<String>,
}

fn default_concurrency_limit() -> usize {
    4
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            allowed_regions: Vec::new(),
        }
    }
}

/// 派发节流与重试设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// 每日成功发送上限
    #[serde(default = "default_max_per_day")]
    #[validate(range(min = 1))]
    pub max_per_day: u32,

    /// 每个尝试过的收件人之后的停顿
    #[serde(default = "default_per_message_delay_ms")]
    pub per_message_delay_ms: u64,

    /// 每个收件人的投递尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,

    /// 重试退避单位；第 `n` 次失败后等待 `n * backoff_base_ms`
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_max_per_day() -> u32 {
    50
}

fn default_per_message_delay_ms() -> u64 {
    1500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    2000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_per_day: default_max_per_day(),
            per_message_delay_ms: default_per_message_delay_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

impl DispatchConfig {
    pub fn per_message_delay(&self) -> Duration {
        Duration::from_millis(self.per_message_delay_ms)
    }

    /// 第 `attempt` 次（从 1 开始）失败后的退避时长
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms.saturating_mul(u64::from(attempt)))
    }
}

/// 出站传输配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub transport_type: TransportType,

    /// 类型相关参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// 传输类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    /// 通过 tracing 记录每条消息
    Log,
    /// 将消息追加到 JSON-lines 发件箱文件
    File,
}

/// 单个消息变体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// 可选标签，用于报告
    #[serde(default)]
    pub name: Option<String>,

    /// 含 `{name}` / `{locality}` 占位符的正文
    pub body: String,
}

/// 单个已注册数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// 唯一数据源名称，同时作为记录来源标签
    pub name: String,

    pub source_type: SourceType,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// 类型相关参数
    #[serde(default)]
    pub params: HashMap<String, String>,

    /// `inline` 数据源的记录
    #[serde(default)]
    pub records: Vec<CandidateRecord>,
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    /// 直接持有记录的 inline 数据源
    pub fn inline(name: impl Into<String>, records: Vec<CandidateRecord>) -> Self {
        Self {
            name: name.into(),
            source_type: SourceType::Inline,
            enabled: true,
            params: HashMap::new(),
            records,
        }
    }
}

/// 数据源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// 内嵌在配置中的记录
    Inline,
    /// 磁盘上的 JSON / JSON-lines 导出文件
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.max_per_day, 50);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.per_message_delay(), Duration::from_millis(1500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backoff_is_attempt_indexed() {
        let config = DispatchConfig {
            backoff_base_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(250));
        assert_eq!(config.backoff_for(3), Duration::from_millis(750));
    }

    #[test]
    fn range_validation_rejects_zero() {
        let config = DispatchConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let collection = CollectionConfig {
            concurrency_limit: 0,
            allowed_regions: vec![],
        };
        assert!(collection.validate().is_err());
    }

    #[test]
    fn source_config_defaults_to_enabled() {
        let source: SourceConfig =
            serde_json::from_str(r#"{"name":"dir","source_type":"file"}"#).unwrap();
        assert!(source.enabled);
        assert_eq!(source.source_type, SourceType::File);
        assert!(source.records.is_empty());
    }
}
