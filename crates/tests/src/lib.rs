//! # Integration Tests
//!
//! End-to-end dispatch scenarios against the in-memory broker.
//!
//! Covers:
//! - Multi-worker shared-session dispatch with join-before-close
//! - Transactional commit/abort visibility
//! - Interruption with guaranteed flush/close teardown

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use contracts::{BrokerConfig, Record, SerializerKind, TaskConfig};
    use dispatcher::Supervisor;
    use publisher::{MemoryBroker, PublishSession, TransactionCoordinator};

    fn write_lines(dir: &Path, name: &str, count: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for i in 0..count {
            writeln!(file, "{name},row={i},price={}", 100 + i).unwrap();
        }
        path
    }

    fn shared_config() -> BrokerConfig {
        BrokerConfig {
            bootstrap_servers: vec![
                "localhost:9092".into(),
                "localhost:9093".into(),
                "localhost:9094".into(),
            ],
            client_id: "multi-threaded-dispatch".into(),
            key_serializer: SerializerKind::Text,
            value_serializer: SerializerKind::Text,
            transactional_id: None,
            queue_capacity: 512,
            send_timeout_ms: 5000,
        }
    }

    fn txn_config() -> BrokerConfig {
        BrokerConfig {
            transactional_id: Some("hello-dispatch-transactional-id".into()),
            key_serializer: SerializerKind::Integer,
            ..shared_config()
        }
    }

    /// Two workers drain 500- and 700-line files into one topic over the
    /// shared session; the broker sees 1200 records and the session closes
    /// exactly once, after both joins.
    #[tokio::test]
    async fn test_two_workers_same_topic() {
        let dir = tempfile::tempdir().unwrap();
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&shared_config(), broker.clone()).unwrap();

        let tasks = vec![
            TaskConfig {
                id: "eod_01".into(),
                file: write_lines(dir.path(), "nse_eod_01.csv", 500),
                topic: "nse-eod-topic".into(),
            },
            TaskConfig {
                id: "eod_02".into(),
                file: write_lines(dir.path(), "nse_eod_02.csv", 700),
                topic: "nse-eod-topic".into(),
            },
        ];

        let supervisor = Supervisor::new(session);
        let metrics = std::sync::Arc::clone(supervisor.session().metrics());
        let summary = supervisor.run_all(tasks).await.unwrap();

        assert_eq!(summary.records_forwarded, 1200);
        assert_eq!(summary.failed_workers, 0);
        assert_eq!(metrics.delivered(), 1200);
        assert_eq!(metrics.in_flight(), 0);
        assert_eq!(broker.visible_count("nse-eod-topic"), 1200);
        assert_eq!(broker.disconnect_count(), 1);
    }

    /// One worker's records keep their file order on the topic.
    #[tokio::test]
    async fn test_single_worker_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&shared_config(), broker.clone()).unwrap();

        let tasks = vec![TaskConfig {
            id: "ordered".into(),
            file: write_lines(dir.path(), "ordered.csv", 50),
            topic: "ordered-topic".into(),
        }];

        Supervisor::new(session).run_all(tasks).await.unwrap();

        let values = broker.visible_values("ordered-topic");
        assert_eq!(values.len(), 50);
        for (i, value) in values.iter().enumerate() {
            assert!(
                value.contains(&format!("row={i},")),
                "out of order at {i}: {value}"
            );
        }
    }

    /// The reference transactional scenario: a committed transaction makes
    /// two records visible on each of two topics; a second, aborted
    /// transaction of the same size leaves the count at four.
    #[tokio::test]
    async fn test_transactional_commit_then_abort() {
        let broker = MemoryBroker::new("mem");
        let session = PublishSession::open(&txn_config(), broker.clone()).unwrap();
        let mut txn = TransactionCoordinator::init(session).await.unwrap();

        txn.begin().await.unwrap();
        for i in 1..=2 {
            let _ = txn
                .send(Record::keyed("hello-dispatch-1", i, format!("Simple Message-1-T1-{i}")))
                .await
                .unwrap();
            let _ = txn
                .send(Record::keyed("hello-dispatch-2", i, format!("Simple Message-2-T1-{i}")))
                .await
                .unwrap();
        }
        assert!(txn.commit().await.unwrap().is_committed());

        assert_eq!(broker.visible_count("hello-dispatch-1"), 2);
        assert_eq!(broker.visible_count("hello-dispatch-2"), 2);

        txn.begin().await.unwrap();
        for i in 1..=2 {
            let _ = txn
                .send(Record::keyed("hello-dispatch-1", i, format!("Simple Message-1-T2-{i}")))
                .await
                .unwrap();
            let _ = txn
                .send(Record::keyed("hello-dispatch-2", i, format!("Simple Message-2-T2-{i}")))
                .await
                .unwrap();
        }
        txn.abort().await.unwrap();

        assert_eq!(broker.total_visible(), 4);

        let session = txn.into_session();
        session.flush().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(broker.disconnect_count(), 1);
    }

    /// A plan loaded from TOML drives a full run end to end.
    #[tokio::test]
    async fn test_plan_from_toml_drives_run() {
        let dir = tempfile::tempdir().unwrap();
        let file_a = write_lines(dir.path(), "part_a.csv", 30);
        let file_b = write_lines(dir.path(), "part_b.csv", 20);

        let toml = format!(
            r#"
[broker]
bootstrap_servers = ["localhost:9092"]
client_id = "plan-driven"
key_serializer = "text"
value_serializer = "text"

[[tasks]]
id = "a"
file = "{}"
topic = "plan-topic"

[[tasks]]
id = "b"
file = "{}"
topic = "plan-topic"
"#,
            file_a.display(),
            file_b.display()
        );

        let plan =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();

        let broker = MemoryBroker::new(plan.broker.client_id.clone());
        let session = PublishSession::open(&plan.broker, broker.clone()).unwrap();
        let summary = Supervisor::new(session).run_all(plan.tasks).await.unwrap();

        assert_eq!(summary.records_forwarded, 50);
        assert_eq!(broker.visible_count("plan-topic"), 50);
        assert_eq!(broker.disconnect_count(), 1);
    }

    /// Interrupting the join wait cancels the workers but still flushes and
    /// closes the session, exactly once.
    #[tokio::test]
    async fn test_interrupted_run_still_tears_down() {
        let dir = tempfile::tempdir().unwrap();
        let broker = MemoryBroker::with_deliver_delay("slow", Duration::from_millis(5));
        let mut config = shared_config();
        config.queue_capacity = 8;
        let session = PublishSession::open(&config, broker.clone()).unwrap();

        let tasks: Vec<TaskConfig> = (0..3)
            .map(|k| TaskConfig {
                id: format!("big_{k}"),
                file: write_lines(dir.path(), &format!("big_{k}.csv"), 5000),
                topic: "records".into(),
            })
            .collect();

        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
        };

        let summary = Supervisor::new(session)
            .run_with_shutdown(tasks, shutdown)
            .await
            .unwrap();

        assert!(summary.cancelled_workers > 0);
        assert!(summary.records_forwarded < 15000);
        assert_eq!(broker.disconnect_count(), 1);
    }
}
