//! 外呼指标
//!
//! 对 `metrics` facade 的薄封装，指标名集中在此处；
//! 另提供进程内聚合器，用于运行结束时的汇总输出。

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// 记录一次采集器运行结果
pub fn record_collector_result(source: &str, produced: usize, failed: bool, elapsed_ms: f64) {
    if failed {
        counter!("outreach_collector_failures_total", "source" => source.to_string())
            .increment(1);
    } else {
        counter!("outreach_collector_records_total", "source" => source.to_string())
            .increment(produced as u64);
    }
    histogram!("outreach_collector_duration_ms", "source" => source.to_string())
        .record(elapsed_ms);
}

/// 记录被有效性过滤丢弃的记录
pub fn record_records_dropped(reason: &str, count: usize) {
    if count > 0 {
        counter!("outreach_records_dropped_total", "reason" => reason.to_string())
            .increment(count as u64);
    }
}

/// 记录去重阶段丢弃的重复记录
pub fn record_duplicates(count: usize) {
    if count > 0 {
        counter!("outreach_records_duplicate_total").increment(count as u64);
    }
}

/// 记录一次传输调用
pub fn record_send_attempt(transport: &str) {
    counter!("outreach_send_attempts_total", "transport" => transport.to_string()).increment(1);
}

/// 记录单个收件人的最终结果
pub fn record_send_outcome(status: &str) {
    counter!("outreach_sends_total", "status" => status.to_string()).increment(1);
}

/// 记录当日配额使用量
pub fn record_quota_used(count: u32, limit: u32) {
    gauge!("outreach_daily_quota_used").set(f64::from(count));
    gauge!("outreach_daily_quota_limit").set(f64::from(limit));
}

/// 记录一次台账快照写入失败
pub fn record_ledger_persist_failure() {
    counter!("outreach_ledger_persist_failures_total").increment(1);
}

/// 单次派发聚合器
///
/// 每个收件人结果输入一次，生成可打印的汇总。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 结果标签 -> 数量
    pub outcomes: HashMap<String, u64>,

    /// 有过传输调用的收件人数
    pub attempted: u64,

    /// 传输调用总数
    pub total_attempts: u64,

    /// 单个收件人的最大调用次数
    pub max_attempts: u32,

    /// 模板变体 -> 收件人数
    pub variant_counts: HashMap<usize, u64>,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个收件人结果
    pub fn update(&mut self, outcome: &str, attempts: u32, variant: Option<usize>) {
        *self.outcomes.entry(outcome.to_string()).or_insert(0) += 1;
        if attempts > 0 {
            self.attempted += 1;
            self.total_attempts += u64::from(attempts);
            self.max_attempts = self.max_attempts.max(attempts);
        }
        if let Some(variant) = variant {
            *self.variant_counts.entry(variant).or_insert(0) += 1;
        }
    }

    /// 收件人总数
    pub fn total(&self) -> u64 {
        self.outcomes.values().sum()
    }

    pub fn summary(&self) -> DispatchSummary {
        let mut outcomes: Vec<_> = self
            .outcomes
            .iter()
            .map(|(label, count)| (label.clone(), *count))
            .collect();
        outcomes.sort();

        let mut variants: Vec<_> = self
            .variant_counts
            .iter()
            .map(|(variant, count)| (*variant, *count))
            .collect();
        variants.sort();

        DispatchSummary {
            total: self.total(),
            outcomes,
            attempted: self.attempted,
            mean_attempts: if self.attempted == 0 {
                0.0
            } else {
                self.total_attempts as f64 / self.attempted as f64
            },
            max_attempts: self.max_attempts,
            variants,
        }
    }
}

/// 可打印的派发汇总
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total: u64,
    /// 已排序 (结果, 数量)
    pub outcomes: Vec<(String, u64)>,
    pub attempted: u64,
    pub mean_attempts: f64,
    pub max_attempts: u32,
    /// 已排序 (变体, 数量)
    pub variants: Vec<(usize, u64)>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Recipients: {}", self.total)?;
        for (outcome, count) in &self.outcomes {
            writeln!(f, "  {}: {}", outcome, count)?;
        }
        if self.attempted == 0 {
            writeln!(f, "Attempts per recipient: N/A")?;
        } else {
            writeln!(
                f,
                "Attempts per recipient: mean={:.2}, max={} (n={})",
                self.mean_attempts, self.max_attempts, self.attempted
            )?;
        }
        if !self.variants.is_empty() {
            writeln!(f, "Variants used:")?;
            for (variant, count) in &self.variants {
                writeln!(f, "  #{}: {}", variant, count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = DispatchStatsAggregator::new();
        aggregator.update("sent", 1, Some(0));
        aggregator.update("sent", 3, Some(1));
        aggregator.update("already_sent", 0, None);

        assert_eq!(aggregator.total(), 3);
        assert_eq!(aggregator.outcomes.get("sent"), Some(&2));
        assert_eq!(aggregator.attempted, 2);
        assert_eq!(aggregator.max_attempts, 3);
        assert!((aggregator.summary().mean_attempts - 2.0).abs() < 1e-10);
        assert_eq!(aggregator.variant_counts.get(&1), Some(&1));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DispatchStatsAggregator::new();
        aggregator.update("sent", 2, Some(0));
        aggregator.update("failed", 3, Some(1));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Recipients: 2"));
        assert!(output.contains("failed: 1"));
        assert!(output.contains("max=3"));
        assert!(output.contains("#1: 1"));
    }

    #[test]
    fn test_helpers_without_recorder() {
        // 未安装 recorder 时 facade 为空操作
        record_collector_result("seed", 3, false, 1.5);
        record_records_dropped("invalid_identity", 2);
        record_send_attempt("log");
        record_quota_used(1, 10);
    }
}
