//! # Integration Tests
//!
//! 跨 crate 场景测试。
//!
//! 覆盖：
//! - 基于内存台账的派发场景
//! - 持久化台账下的重启行为
//! - 聚合器中的采集器隔离与去重
//! - 配置 -> 采集 -> 存储 -> 派发 端到端

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use contracts::{CandidateRecord, CanonicalRecord, DispatchConfig, RecipientId};
    use dispatcher::{
        DeliveryLedger, DispatchEngine, ManualClock, MessageTemplates, RecordingPacer,
        ScriptedTransport,
    };

    pub fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    /// Canonical record; unusable contacts are kept verbatim
    pub fn record(name: &str, contact: &str) -> CanonicalRecord {
        let identity = RecipientId::parse(contact).unwrap_or_else(|_| RecipientId::from(contact));
        CanonicalRecord::from_candidate(
            CandidateRecord::new("test", name, contact, "Lisboa"),
            identity,
            Utc::now(),
        )
    }

    pub fn valid_records(n: usize) -> Vec<CanonicalRecord> {
        (0..n)
            .map(|i| record(&format!("Shop {i}"), &format!("+35191200{i:04}")))
            .collect()
    }

    pub fn dispatch_config(max_per_day: u32, max_attempts: u32) -> DispatchConfig {
        DispatchConfig {
            max_per_day,
            per_message_delay_ms: 1500,
            max_attempts,
            backoff_base_ms: 2000,
        }
    }

    pub fn engine(
        ledger: DeliveryLedger,
        transport: ScriptedTransport,
        config: DispatchConfig,
        pacer: RecordingPacer,
        clock: Arc<ManualClock>,
    ) -> DispatchEngine<ScriptedTransport, RecordingPacer> {
        let templates = MessageTemplates::new(["Hello {name}", "Hi {name} from {locality}"])
            .expect("templates");
        DispatchEngine::new(ledger, transport, config, templates)
            .with_pacer(pacer)
            .with_clock(clock)
    }
}

#[cfg(test)]
mod scenario_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::DeliveryStatus;
    use dispatcher::{
        DeliveryLedger, ManualClock, OutcomeKind, PauseKind, RecordingPacer, ScriptedReply,
        ScriptedTransport, StopReason,
    };

    use crate::support::*;

    #[tokio::test]
    async fn test_scenario_a_invalid_identities_never_attempted() {
        let mut candidates = valid_records(10);
        candidates.insert(3, record("Broken", "call me"));
        candidates.push(record("Short", "12345"));

        let transport = ScriptedTransport::accepting();
        let clock = Arc::new(ManualClock::new(day(1)));
        let mut engine = engine(
            DeliveryLedger::in_memory(50),
            transport.clone(),
            dispatch_config(50, 3),
            RecordingPacer::new(),
            clock,
        );

        let result = engine.run_batch(&candidates, None).await;
        assert_eq!(result.succeeded, 10);
        assert_eq!(result.count(OutcomeKind::ValidationError), 2);
        assert_eq!(result.attempted, 10);
        assert!(!result.partial);
        assert_eq!(transport.call_count(), 10);
        assert_eq!(transport.calls_for("call me"), 0);
        assert_eq!(engine.ledger_mut().current_quota(day(1)).count, 10);
    }

    #[tokio::test]
    async fn test_scenario_b_quota_leaves_rest_pending() {
        let candidates = valid_records(10);
        let transport = ScriptedTransport::accepting();
        let mut engine = engine(
            DeliveryLedger::in_memory(5),
            transport.clone(),
            dispatch_config(5, 3),
            RecordingPacer::new(),
            Arc::new(ManualClock::new(day(1))),
        );

        let result = engine.run_batch(&candidates, None).await;
        assert_eq!(result.succeeded, 5);
        assert_eq!(result.deferred, 5);
        assert!(result.partial);
        assert_eq!(result.stop_reason, Some(StopReason::QuotaExhausted));

        let ledger = engine.ledger();
        for record in &candidates[5..] {
            assert_eq!(ledger.status(&record.identity), DeliveryStatus::Pending);
        }
        assert_eq!(engine.ledger_mut().current_quota(day(1)).count, 5);
    }

    #[tokio::test]
    async fn test_scenario_c_retry_then_success() {
        let transport = ScriptedTransport::accepting().with_script([
            ScriptedReply::Error("timeout".into()),
            ScriptedReply::Error("timeout".into()),
            ScriptedReply::Accept,
        ]);
        let pacer = RecordingPacer::new();
        let mut engine = engine(
            DeliveryLedger::in_memory(50),
            transport.clone(),
            dispatch_config(50, 3),
            pacer.clone(),
            Arc::new(ManualClock::new(day(1))),
        );

        let candidates = valid_records(1);
        let result = engine.run_batch(&candidates, None).await;
        assert_eq!(result.outcomes[0].kind, OutcomeKind::Sent);
        assert_eq!(transport.call_count(), 3);
        assert_eq!(
            pacer.durations(PauseKind::Backoff),
            vec![Duration::from_millis(2000), Duration::from_millis(4000)]
        );
        // Single candidate: no throttle after the last one
        assert!(pacer.durations(PauseKind::Throttle).is_empty());
    }

    #[tokio::test]
    async fn test_retry_bound_and_failed_stays_terminal() {
        let transport = ScriptedTransport::failing("unreachable");
        let clock = Arc::new(ManualClock::new(day(1)));
        let mut engine = engine(
            DeliveryLedger::in_memory(50),
            transport.clone(),
            dispatch_config(50, 4),
            RecordingPacer::new(),
            clock.clone(),
        );

        let candidates = valid_records(3);
        let result = engine.run_batch(&candidates, None).await;
        assert_eq!(result.failed, 3);
        for record in &candidates {
            assert_eq!(transport.calls_for(&record.identity), 4);
            assert_eq!(engine.ledger().status(&record.identity), DeliveryStatus::Failed);
        }

        clock.advance_days(1);
        let next_day = engine.run_batch(&candidates, None).await;
        assert_eq!(next_day.count(OutcomeKind::PreviouslyFailed), 3);
        assert_eq!(transport.call_count(), 12);
    }

    #[tokio::test]
    async fn test_day_rollover_resets_quota() {
        let candidates = valid_records(6);
        let transport = ScriptedTransport::accepting();
        let clock = Arc::new(ManualClock::new(day(1)));
        let mut engine = engine(
            DeliveryLedger::in_memory(3),
            transport.clone(),
            dispatch_config(3, 1),
            RecordingPacer::new(),
            clock.clone(),
        );

        let first = engine.run_batch(&candidates, None).await;
        assert_eq!((first.succeeded, first.deferred), (3, 3));

        let same_day = engine.run_batch(&candidates, None).await;
        assert_eq!(same_day.skipped, 3);
        assert_eq!(same_day.stop_reason, Some(StopReason::QuotaExhausted));

        clock.advance_days(1);
        let next_day = engine.run_batch(&candidates, None).await;
        assert_eq!(next_day.succeeded, 3);
        assert_eq!(next_day.skipped, 3);
        assert_eq!(engine.ledger_mut().current_quota(day(2)).count, 3);
        assert_eq!(transport.call_count(), 6);
    }
}

#[cfg(test)]
mod restart_tests {
    use std::sync::Arc;

    use contracts::DeliveryStatus;
    use dispatcher::{DeliveryLedger, ManualClock, OutcomeKind, RecordingPacer, ScriptedTransport};
    use tempfile::tempdir;

    use crate::support::*;

    #[tokio::test]
    async fn test_idempotent_across_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let candidates = valid_records(4);
        let clock = Arc::new(ManualClock::new(day(1)));

        let transport = ScriptedTransport::accepting();
        let mut first = engine(
            DeliveryLedger::load(&path, 50).unwrap(),
            transport.clone(),
            dispatch_config(50, 2),
            RecordingPacer::new(),
            clock.clone(),
        );
        assert_eq!(first.run_batch(&candidates, None).await.succeeded, 4);
        first.finish().await;

        // Fresh process: everything comes from disk
        let mut second = engine(
            DeliveryLedger::load(&path, 50).unwrap(),
            transport.clone(),
            dispatch_config(50, 2),
            RecordingPacer::new(),
            clock,
        );
        let result = second.run_batch(&candidates, None).await;
        assert_eq!(result.count(OutcomeKind::AlreadySent), 4);
        assert_eq!(result.attempted, 0);
        assert_eq!(transport.call_count(), 4);
        assert_eq!(second.ledger_mut().current_quota(day(1)).count, 4);
    }

    #[tokio::test]
    async fn test_cleared_ledger_allows_resend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let candidates = valid_records(2);
        let clock = Arc::new(ManualClock::new(day(1)));
        let transport = ScriptedTransport::accepting();

        let mut engine = engine(
            DeliveryLedger::load(&path, 50).unwrap(),
            transport.clone(),
            dispatch_config(50, 1),
            RecordingPacer::new(),
            clock,
        );
        engine.run_batch(&candidates, None).await;
        engine.ledger_mut().clear().unwrap();

        let reloaded = DeliveryLedger::load(&path, 50).unwrap();
        assert_eq!(reloaded.status(&candidates[0].identity), DeliveryStatus::Pending);

        let again = engine.run_batch(&candidates, None).await;
        assert_eq!(again.succeeded, 2);
        assert_eq!(transport.call_count(), 4);
    }
}

#[cfg(test)]
mod aggregation_tests {
    use std::time::Duration;

    use contracts::{CandidateRecord, SourceConfig};
    use ingestion::{Aggregator, DropReason, MockCollector, RecordValidator};

    fn source(name: &str) -> SourceConfig {
        SourceConfig::inline(name, vec![])
    }

    #[tokio::test]
    async fn test_collector_failures_are_isolated() {
        let mut aggregator: Aggregator<MockCollector> =
            Aggregator::new(2, RecordValidator::allow_all());
        aggregator.register(
            source("maps"),
            MockCollector::new(
                "maps",
                vec![CandidateRecord::new("maps", "Cafe", "a@x.pt", "Porto")],
            )
            .with_delay(Duration::from_millis(20)),
        );
        aggregator.register(source("broken"), MockCollector::failing("broken", "503"));
        aggregator.register(source("crashy"), MockCollector::panicking("crashy", "boom"));
        aggregator.register(
            source("directory"),
            MockCollector::new(
                "directory",
                vec![
                    CandidateRecord::new("directory", "Cafe", "A@X.PT", "porto"),
                    CandidateRecord::new("directory", "Bar", "+351 912 345 678", "Faro"),
                ],
            ),
        );

        let report = aggregator.collect().await;
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.source_name == "crashy" && e.panicked));
        assert!(report.is_partial());

        // Registration order, first occurrence wins
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].source, "maps");
        assert_eq!(report.records[1].name, "Bar");
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn test_region_filter_drops_with_reason() {
        let mut aggregator: Aggregator<MockCollector> =
            Aggregator::new(4, RecordValidator::new(["Lisboa"]));
        aggregator.register(
            source("maps"),
            MockCollector::new(
                "maps",
                vec![
                    CandidateRecord::new("maps", "A", "a@x.pt", "LISBOA"),
                    CandidateRecord::new("maps", "B", "b@x.pt", "Porto"),
                    CandidateRecord::new("maps", "C", "", "Lisboa"),
                ],
            ),
        );

        let report = aggregator.collect().await;
        assert_eq!(report.records.len(), 1);
        let dropped = report.dropped_by_reason();
        assert_eq!(dropped.get(&DropReason::RegionNotAllowed), Some(&1));
        assert_eq!(dropped.get(&DropReason::MissingIdentity), Some(&1));
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{DeliveryStatus, RecordStore};
    use dispatcher::{create_transport, DeliveryLedger, DispatchEngine, MessageTemplates};
    use ingestion::{Aggregator, JsonRecordStore};
    use tempfile::tempdir;

    const CAMPAIGN: &str = r#"
[campaign]
name = "e2e"

[collection]
concurrency_limit = 2
allowed_regions = ["porto", "lisboa"]

[dispatch]
max_per_day = 10
per_message_delay_ms = 0
max_attempts = 2
backoff_base_ms = 0

[transport]
transport_type = "file"

[[templates]]
body = "Hello {name}"

[[templates]]
body = "Hi {name} in {locality}"

[[sources]]
name = "manual"
source_type = "inline"
records = [
  { name = "Cafe Central", contact = "+351 912 000 001", locality = "Porto" },
  { name = "Cafe  Central", contact = "+351912000001", locality = "porto" },
  { name = "Padaria", contact = "padaria@pao.pt", locality = "Lisboa" },
  { name = "Far Away", contact = "far@away.pt", locality = "Faro" },
  { name = "No Contact", locality = "Porto" },
]
"#;

    /// Config -> Aggregator -> JsonRecordStore -> DispatchEngine -> outbox
    #[tokio::test]
    async fn test_e2e_collect_store_dispatch() {
        let dir = tempdir().unwrap();
        let mut blueprint = config_loader::ConfigLoader::load_from_str(
            &CAMPAIGN.replace(
                "transport_type = \"file\"",
                &format!(
                    "transport_type = \"file\"\nparams = {{ path = {:?} }}",
                    dir.path().join("outbox.jsonl").display().to_string()
                ),
            ),
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();
        blueprint.campaign.ledger_path = dir.path().join("ledger.json");
        blueprint.campaign.store_path = dir.path().join("records.json");

        let report = Aggregator::from_blueprint(&blueprint).collect().await;
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.dropped.len(), 2);

        let mut store = JsonRecordStore::open(&blueprint.campaign.store_path).unwrap();
        assert_eq!(store.append(&report.records).unwrap(), 2);
        let records = store.list(None).unwrap();

        let ledger = DeliveryLedger::load(&blueprint.campaign.ledger_path, 10).unwrap();
        let transport = create_transport(&blueprint.transport).unwrap();
        let templates = MessageTemplates::from_config(&blueprint.templates).unwrap();
        let mut engine =
            DispatchEngine::new(ledger, transport, blueprint.dispatch.clone(), templates);

        let result = engine.run_batch(&records, None).await;
        assert_eq!(result.succeeded, 2);
        engine.finish().await;

        let outbox = std::fs::read_to_string(dir.path().join("outbox.jsonl")).unwrap();
        let lines: Vec<_> = outbox.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Hello Cafe Central"));
        assert!(lines[1].contains("Hi Padaria in Lisboa"));

        let ledger = DeliveryLedger::load(&blueprint.campaign.ledger_path, 10).unwrap();
        assert_eq!(ledger.status("+351912000001"), DeliveryStatus::Sent);
        assert_eq!(ledger.status("padaria@pao.pt"), DeliveryStatus::Sent);
    }
}
