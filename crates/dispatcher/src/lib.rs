//! # Dispatcher
//!
//! 管道的投递端。
//!
//! 职责：
//! - 在每日配额内逐条处理规范化记录
//! - 对每个收件人进行有上限的线性退避重试
//! - 将每个终态结果持久化到 `DeliveryLedger`

pub mod clock;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod pacer;
pub mod template;
pub mod transports;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{BatchResult, DispatchEngine, OutcomeKind, RecipientOutcome, StopReason};
pub use error::DispatchError;
pub use ledger::{DailyQuota, DeliveryLedger, LedgerEntry, LedgerSummary};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use pacer::{LocalPacer, Pacer, PauseKind, RecordingPacer, TokioPacer};
pub use template::MessageTemplates;
pub use transports::{
    create_transport, ConfiguredTransport, FileTransport, FileTransportConfig, LogTransport,
    ScriptedReply, ScriptedTransport,
};
