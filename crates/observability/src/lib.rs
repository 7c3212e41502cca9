//! # Observability
//!
//! 外呼工作区的 Tracing 与 Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化（JSON / Pretty / Compact）
//! - Prometheus 导出器
//! - 采集、派发与台账的具名指标函数
//!
//! ## 用法
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig::default())?;
//! observability::record_send_outcome("sent");
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_collector_result, record_duplicates, record_ledger_persist_failure, record_quota_used,
    record_records_dropped, record_send_attempt, record_send_outcome, DispatchStatsAggregator,
    DispatchSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus 端口（None = 不启用）
    pub metrics_port: Option<u16>,
    /// 未设置 `RUST_LOG` 时使用的过滤级别
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one object per line
    Json,
    /// Human-readable, multi-line
    #[default]
    Pretty,
    /// Single line
    Compact,
}

/// Install the global tracing subscriber, then the Prometheus recorder
/// when a port is configured
///
/// `RUST_LOG` wins over `default_log_level`. Fails if a subscriber is
/// already installed.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("tracing subscriber already installed")?;

    if let Some(port) = config.metrics_port {
        init_metrics(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "observability initialized"
    );
    Ok(())
}

/// Serve Prometheus metrics on `0.0.0.0:port`
pub fn init_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("cannot serve metrics on port {port}"))?;

    tracing::info!(port, "metrics endpoint listening");
    Ok(())
}
