//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Covers:
//! - Contract smoke tests
//! - Configuration file -> component groups
//! - Fragmented multi-channel streams -> frame parser -> source members
//! - Administrative commands and teardown across groups

#[cfg(test)]
mod contract_tests {
    use contracts::{ComponentRole, ContractError};

    #[test]
    fn test_contracts_compile() {
        assert_eq!(ComponentRole::Source.default_table(), "InputAdapters");
        assert_eq!(ContractError::start("pmu", "offline").kind(), "start_failure");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use contracts::Component;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use adapter_group::{
        AdminCommand, ComponentGroup, GroupConfig, MockComponent, RegistryFactory,
    };
    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ComponentEvent, ComponentId, ComponentRole, ConcentratorConfig, Notification,
        SourceChannel, TypeTag,
    };
    use frame_parser::{EnvelopeHandler, FrameDispatchEngine, ParserEvent, SyncWordClassifier};
    use observability::NotificationAggregator;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const CONFIG: &str = r#"
[data_source]
name = "openPDC"

[[data_source.tables.InputAdapters]]
id = 1
name = "pmu_a"
component_kind = "mock"
connection_string = "outputs=101,102"

[[data_source.tables.InputAdapters]]
id = 2
name = "pmu_b"
component_kind = "mock"
connection_string = "outputs=201; initializeDelay=20"

[[data_source.tables.InputAdapters]]
id = 3
name = "pmu_replay"
component_kind = "mock"
temporal_session = true

[[data_source.tables.ActionAdapters]]
id = 10
name = "frequency_average"
component_kind = "mock"
connection_string = "inputs=101,201; outputs=900"

[[data_source.tables.OutputAdapters]]
id = 20
name = "archive"
component_kind = "mock"
connection_string = "inputs=900; autoStart=false"

[[groups]]
name = "inputs"
role = "source"

[[groups]]
name = "actions"
role = "transform"

[[groups]]
name = "outputs"
role = "sink"
"#;

    type Seen = Arc<Mutex<Vec<Notification>>>;

    fn load_config() -> ConcentratorConfig {
        ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap()
    }

    fn build_groups(config: &ConcentratorConfig) -> (Vec<ComponentGroup>, Seen) {
        let factory = Arc::new(RegistryFactory::new().with_mock());
        let data_source = Arc::new(config.data_source.clone());
        let seen: Seen = Arc::default();

        let groups = config
            .groups
            .iter()
            .map(|definition| {
                let group = ComponentGroup::new(GroupConfig::from(definition), factory.clone());
                let seen = seen.clone();
                group.subscribe(move |n| seen.lock().unwrap().push(n.clone()));
                group
                    .load_from(data_source.clone(), definition.table())
                    .unwrap();
                group
            })
            .collect();

        (groups, seen)
    }

    async fn wait_initialized(group: &ComponentGroup) {
        for _ in 0..500 {
            if group
                .ids()
                .iter()
                .all(|id| group.is_member_initialized(*id) == Some(true))
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("group '{}' did not initialize", group.name());
    }

    fn errors(seen: &Seen) -> Vec<String> {
        seen.lock()
            .unwrap()
            .iter()
            .filter_map(|n| match &n.event {
                ComponentEvent::ProcessError(e) => Some(e.to_string()),
                _ => None,
            })
            .collect()
    }

    /// End-to-end: configuration text -> groups -> initialized, running members
    #[tokio::test]
    async fn test_config_to_running_groups() {
        let config = load_config();
        let (groups, seen) = build_groups(&config);

        let inputs = &groups[0];
        assert_eq!(inputs.ids(), vec![1, 2, 3]);
        assert_eq!(groups[1].ids(), vec![10]);

        for group in &groups {
            wait_initialized(group).await;
            group.start();
        }

        // Auto-start members run once initialized; the archive opted out
        let archive = groups[2].get(20).unwrap();
        assert!(!archive.is_running());
        assert!(inputs.get(1).unwrap().is_running());

        // Signal sets flow source -> transform -> sink
        let produced = inputs.output_signals();
        let consumed = groups[1].input_signals();
        assert!(consumed.is_subset(&produced));
        assert!(groups[2].input_signals().is_subset(&groups[1].output_signals()));

        assert!(errors(&seen).is_empty(), "errors: {:?}", errors(&seen));

        for group in groups.iter().rev() {
            group.stop();
            group.dispose();
        }
        assert!(groups.iter().all(ComponentGroup::is_disposed));
    }

    /// A temporal group only loads temporal-session rows from the same table
    #[tokio::test]
    async fn test_temporal_group_shares_table() {
        let config = load_config();
        let factory = Arc::new(RegistryFactory::new().with_mock());

        let replay = ComponentGroup::new(
            GroupConfig::new("replay", ComponentRole::Source).with_temporal(true),
            factory,
        );
        replay
            .load_from(Arc::new(config.data_source.clone()), "InputAdapters")
            .unwrap();

        assert_eq!(replay.ids(), vec![3]);
        assert!(replay.try_get_by_name("PMU_REPLAY").is_some());
        replay.dispose();
    }

    /// Fragmented, interleaved channels -> parser -> data frames credited to
    /// source members by id code
    #[tokio::test]
    async fn test_parser_feeds_source_group() {
        let group = ComponentGroup::new(
            GroupConfig::new("inputs", ComponentRole::Source),
            Arc::new(RegistryFactory::new()),
        );
        let members: HashMap<ComponentId, Arc<MockComponent>> = [(1, "pmu_a"), (2, "pmu_b")]
            .into_iter()
            .map(|(id, name)| (id, Arc::new(MockComponent::new(id, name))))
            .collect();
        for member in members.values() {
            group.add(member.clone());
        }
        wait_initialized(&group).await;
        group.start();

        let credited = Arc::new(AtomicU64::new(0));
        let diagnostics = Arc::new(AtomicU64::new(0));
        let engine = {
            let members = members.clone();
            let credited = credited.clone();
            let diagnostics = diagnostics.clone();
            FrameDispatchEngine::builder()
                .handlers(EnvelopeHandler::standard_set())
                .on_event(move |event| match event {
                    ParserEvent::DataFrame(frame) => {
                        if let Some(member) =
                            frame.id_code.and_then(|id| members.get(&ComponentId::from(id)))
                        {
                            member.simulate_processed(1);
                            credited.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    ParserEvent::ProcessError(_) => {
                        diagnostics.fetch_add(1, Ordering::SeqCst);
                    }
                    _ => {}
                })
                .build()
        };

        // pmu_a sends 40 data frames, pmu_b 25 data frames plus a header
        let stream = |id: u16, count: usize, header: bool| -> Vec<u8> {
            let mut bytes = Vec::new();
            if header {
                bytes.extend_from_slice(
                    &SyncWordClassifier::encode(TypeTag(1), id, b"station header").unwrap(),
                );
            }
            for seq in 0..count {
                let body = (seq as u64).to_be_bytes();
                bytes.extend_from_slice(
                    &SyncWordClassifier::encode(TypeTag(0), id, &body).unwrap(),
                );
            }
            bytes
        };
        let channels = [
            (SourceChannel::new("tcp:4712"), stream(1, 40, false)),
            (SourceChannel::new("udp:4713"), stream(2, 25, true)),
        ];

        let mut rng = StdRng::seed_from_u64(7);
        let mut positions = [0usize; 2];
        while positions
            .iter()
            .zip(&channels)
            .any(|(pos, (_, bytes))| *pos < bytes.len())
        {
            let index = rng.random_range(0..2);
            let (channel, bytes) = &channels[index];
            let pos = positions[index];
            if pos == bytes.len() {
                continue;
            }
            let n = rng.random_range(1..=13).min(bytes.len() - pos);
            engine.parse(channel, &bytes[pos..pos + n]);
            positions[index] += n;
        }

        assert_eq!(credited.load(Ordering::SeqCst), 65);
        assert_eq!(diagnostics.load(Ordering::SeqCst), 0);
        assert_eq!(members[&1].processed_count(), 40);
        assert_eq!(members[&2].processed_count(), 25);
        assert_eq!(group.processed_count(), 65);
        assert_eq!(group.sample_throughput().total_items, 65);

        let metrics = engine.metrics();
        assert_eq!(metrics.frames_parsed, 66);
        assert_eq!(metrics.malformed_frames, 0);

        engine.shutdown().await;
        group.dispose();
    }

    /// Administrative commands in their JSON form drive every group
    #[tokio::test]
    async fn test_admin_commands_across_groups() {
        let config = load_config();
        let (groups, seen) = build_groups(&config);
        for group in &groups {
            wait_initialized(group).await;
        }

        let commands: Vec<AdminCommand> = serde_json::from_str(
            r#"[
                { "command": "start" },
                { "command": "set_temporal_constraint", "start": "*-5m", "stop": "*" },
                { "command": "reset_statistics" }
            ]"#,
        )
        .unwrap();
        for group in &groups {
            for command in &commands {
                group.execute(command);
            }
        }

        assert!(groups.iter().all(ComponentGroup::is_enabled));
        let resets = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|n| {
                matches!(
                    &n.event,
                    ComponentEvent::StatusMessage(m) if m == "Statistics reset for this collection."
                )
            })
            .count();
        // Once when started, once on request
        assert_eq!(resets, 2 * groups.len());

        // An unrecognized bound is rejected by every member and reported
        let before = errors(&seen).len();
        groups[0].execute(&"set-temporal-constraint yesterday *".parse().unwrap());
        assert_eq!(errors(&seen).len() - before, groups[0].len());

        for group in &groups {
            group.execute(&AdminCommand::Stop);
            group.dispose();
        }
    }

    /// A bad row is reported once; the rest of the table still loads and runs
    #[tokio::test]
    async fn test_partial_load_reports_bad_rows() {
        let mut config = load_config();
        config
            .data_source
            .tables
            .get_mut("InputAdapters")
            .unwrap()[1]
            .component_kind = "phasor_input".to_string();

        let (groups, seen) = build_groups(&config);
        let inputs = &groups[0];
        assert_eq!(inputs.ids(), vec![1, 3]);

        let errors = errors(&seen);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("pmu_b"));

        wait_initialized(inputs).await;
        for group in &groups {
            group.dispose();
        }
    }

    /// Every notification raised during a run reaches the aggregator
    #[tokio::test]
    async fn test_notification_aggregator_summary() {
        let config = load_config();
        let factory = Arc::new(RegistryFactory::new().with_mock());
        let aggregator = Arc::new(Mutex::new(NotificationAggregator::new()));

        let definition = &config.groups[0];
        let group = ComponentGroup::new(GroupConfig::from(definition), factory);
        {
            let aggregator = aggregator.clone();
            group.subscribe(move |n| {
                observability::record_notification(n);
                aggregator.lock().unwrap().update(n);
            });
        }
        group
            .load_from(Arc::new(config.data_source.clone()), definition.table())
            .unwrap();
        wait_initialized(&group).await;
        group.start();
        group.dispose();

        let summary = aggregator.lock().unwrap().summary();
        assert_eq!(summary.errors, 0);
        // Three members plus the group itself are disposed
        assert_eq!(summary.by_event.get("Disposed"), Some(&4));
        assert!(summary.by_event.get("StatusMessage").copied().unwrap_or(0) >= 3);
    }

    /// Frame buffers are echoed in arrival order through the queue
    #[tokio::test]
    async fn test_frame_buffer_echo_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Bytes>();
        let engine = FrameDispatchEngine::builder()
            .handlers(EnvelopeHandler::standard_set())
            .on_frame_buffer(move |buffer| {
                let _ = tx.send(buffer.bytes.clone());
            })
            .build();

        let channel = SourceChannel::new("serial:1");
        let frames: Vec<Bytes> = (0u8..10)
            .map(|i| SyncWordClassifier::encode(TypeTag(0), 1, &[i]).unwrap())
            .collect();
        for frame in &frames {
            engine.parse(&channel, frame);
        }
        engine.shutdown().await;

        let mut echoed = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            echoed.push(bytes);
        }
        assert_eq!(echoed, frames);
    }
}
