//! 采集错误类型

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// 采集错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 数据源文件无法读取
    #[error("source '{source_name}' cannot read {}: {error}", .path.display())]
    SourceRead {
        source_name: String,
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// 数据源内容解析失败
    #[error(
        "source '{source_name}' parse error{}: {message}",
        .line.map(|l| format!(" at line {l}")).unwrap_or_default()
    )]
    SourceParse {
        source_name: String,
        line: Option<usize>,
        message: String,
    },

    /// 数据源必需参数缺失或非法
    #[error("source '{source_name}' parameter '{param}': {message}")]
    SourceParam {
        source_name: String,
        param: String,
        message: String,
    },

    /// 记录存储快照无法读取
    #[error("record store {} is corrupt: {message}", .path.display())]
    StoreCorrupt { path: PathBuf, message: String },

    /// 记录存储写入失败
    #[error("record store {} write failed: {error}", .path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl IngestionError {
    /// 相关数据源名称（如有）
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Self::SourceRead { source_name, .. }
            | Self::SourceParse { source_name, .. }
            | Self::SourceParam { source_name, .. } => Some(source_name),
            Self::StoreCorrupt { .. } | Self::StoreWrite { .. } => None,
        }
    }
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        match err.source_name() {
            Some(source_name) => ContractError::collector(source_name.to_string(), err.to_string()),
            None => ContractError::store(err.to_string()),
        }
    }
}

/// 聚合过程中单个采集器的失败。
///
/// 记录在聚合报告中，不会中断其他采集器。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("collector '{source_name}' failed: {message}")]
pub struct CollectorError {
    /// 注册时的数据源名称
    pub source_name: String,

    pub message: String,

    /// 采集任务是否 panic（而非返回错误）
    pub panicked: bool,
}

impl CollectorError {
    pub fn failed(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.into(),
            panicked: false,
        }
    }

    pub fn panicked(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            message: message.into(),
            panicked: true,
        }
    }
}

/// 采集 Result 别名
pub type Result<T> = std::result::Result<T, IngestionError>;
