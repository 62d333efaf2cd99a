//! Pipeline orchestrator - coordinates groups and the frame parser.
//!
//! Builds one component group per configured definition, loads and starts
//! them, then drives the frame dispatch engine with a synthetic feed. Data
//! frames are credited to the source member whose id matches the frame's
//! id code, so group throughput reflects the parsed traffic.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use adapter_group::{
    AdminCommand, ComponentGroup, GroupConfig, MockComponent, RegistryFactory, MOCK_KIND,
};
use contracts::{Component, ComponentId, ComponentRole, ConcentratorConfig, DataSource, Descriptor};
use frame_parser::{
    EnvelopeHandler, FrameDispatchEngine, ParserConfig, ParserEvent, SyncWordClassifier,
};
use observability::{record_channel_frame, NotificationAggregator};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use super::feed::DemoFeed;
use super::stats::{GroupStats, PipelineStats, StopReason};
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Loaded concentrator configuration
    pub config: ConcentratorConfig,

    /// Maximum number of data frames to generate (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Data frames per channel per second
    pub frame_rate: u32,

    /// Commands sent to every group once started
    pub admin_commands: Vec<AdminCommand>,

    /// Trace echoed frame buffers
    pub echo: bool,

    /// Print every group status before shutting down
    pub print_status: bool,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Source mocks by component id, shared with the frame listener
type SourceMembers = Arc<Mutex<BTreeMap<ComponentId, Arc<MockComponent>>>>;

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the timeout elapses or the frame limit
    /// is reached; groups and the parser are always shut down afterwards
    pub async fn run<S>(self, shutdown: S) -> Result<PipelineStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let sources: SourceMembers = Arc::default();
        let aggregator = Arc::new(Mutex::new(NotificationAggregator::new()));
        let groups = self.load_groups(&sources, &aggregator)?;

        for group in &groups {
            group.start();
            for command in &self.config.admin_commands {
                group.execute(command);
            }
        }

        let engine = self.build_engine(&sources);
        let id_codes: Vec<u16> = lock(&sources)
            .keys()
            .filter_map(|id| u16::try_from(*id).ok())
            .collect();
        let mut feed = DemoFeed::new(&self.config.config.parser.channels, &id_codes);

        info!(
            channels = feed.channels().len(),
            frame_rate = self.config.frame_rate,
            "Starting frame feed"
        );

        let configuration = feed
            .configuration_frames()
            .map_err(|e| CliError::pipeline_execution(e.to_string()))?;
        for (channel, frame) in configuration {
            engine.parse(&channel, &frame);
        }

        let stop_reason = self.feed_frames(&engine, &mut feed, shutdown).await?;
        info!(reason = %stop_reason, "Stopping concentrator");

        if self.config.print_status {
            println!("\nFrame parser status:\n{}", engine.status());
            for group in &groups {
                println!("{}", group.status());
            }
        }

        let parser = engine.metrics();
        let mut group_stats = Vec::with_capacity(groups.len());

        // Sinks first, sources last
        for group in groups.iter().rev() {
            let snapshot = group.sample_throughput();
            let initialized = group
                .ids()
                .into_iter()
                .filter(|id| group.is_member_initialized(*id) == Some(true))
                .count();

            observability::record_throughput(
                group.name(),
                snapshot.total_items,
                snapshot.total_rate,
            );
            observability::record_group_members(group.name(), group.len(), initialized);
            lock(&aggregator).record_throughput(snapshot.total_rate);

            group_stats.push(GroupStats {
                name: group.name().to_string(),
                role: group.role(),
                members: group.len(),
                initialized,
                processed: snapshot.total_items,
                rate: snapshot.total_rate,
            });

            group.stop();
            group.dispose();
        }
        group_stats.reverse();

        engine.shutdown().await;

        let notifications = lock(&aggregator).summary();
        Ok(PipelineStats {
            stop_reason,
            frames_generated: feed.data_frames(),
            parser,
            groups: group_stats,
            notifications,
            duration: start_time.elapsed(),
        })
    }

    /// Create, subscribe and load one group per definition
    fn load_groups(
        &self,
        sources: &SourceMembers,
        aggregator: &Arc<Mutex<NotificationAggregator>>,
    ) -> Result<Vec<ComponentGroup>> {
        let data_source = Arc::new(self.config.config.data_source.clone());
        let source_factory = Arc::new(source_factory(sources));
        let factory = Arc::new(RegistryFactory::new().with_mock());

        let mut groups: Vec<ComponentGroup> = Vec::with_capacity(self.config.config.groups.len());
        for definition in &self.config.config.groups {
            let group = match definition.role {
                ComponentRole::Source => {
                    ComponentGroup::new(GroupConfig::from(definition), source_factory.clone())
                }
                _ => ComponentGroup::new(GroupConfig::from(definition), factory.clone()),
            };

            let aggregator = Arc::clone(aggregator);
            group.subscribe(move |notification| {
                observability::record_notification(notification);
                lock(&aggregator).update(notification);
            });

            if let Err(e) = group.load_from(Arc::clone(&data_source), definition.table()) {
                group.dispose();
                for loaded in &groups {
                    loaded.dispose();
                }
                return Err(CliError::group_load(&definition.name, e));
            }

            info!(
                group = %group.name(),
                table = definition.table(),
                members = group.len(),
                "Group loaded"
            );
            groups.push(group);
        }

        log_data_source(&data_source);
        Ok(groups)
    }

    fn build_engine(&self, sources: &SourceMembers) -> FrameDispatchEngine {
        let parser = &self.config.config.parser;
        let classifier = if parser.verify_checksum {
            SyncWordClassifier::new()
        } else {
            SyncWordClassifier::without_checksum()
        };

        let sources = Arc::clone(sources);
        let mut builder = FrameDispatchEngine::builder()
            .classifier(classifier)
            .config(ParserConfig {
                max_frame_length: parser.max_frame_length,
                ..ParserConfig::default()
            })
            .handlers(EnvelopeHandler::standard_set())
            .on_event(move |event| match event {
                ParserEvent::FrameReceived {
                    source,
                    category,
                    length,
                } => record_channel_frame(source, *category, *length),
                ParserEvent::DataFrame(frame) => {
                    let member = frame
                        .id_code
                        .and_then(|id| lock(&sources).get(&ComponentId::from(id)).cloned());
                    match member {
                        Some(member) => member.simulate_processed(1),
                        None => trace!(channel = %frame.source, "data frame without a source member"),
                    }
                }
                ParserEvent::ProcessError(err) => warn!(error = %err, "Frame parser diagnostic"),
                other => debug!(event = other.name(), "Frame dispatched"),
            });

        if self.config.echo {
            builder = builder.on_frame_buffer(|buffer| {
                trace!(channel = %buffer.source, len = buffer.bytes.len(), "Frame buffer echoed");
            });
        }

        builder.build()
    }

    async fn feed_frames<S>(
        &self,
        engine: &FrameDispatchEngine,
        feed: &mut DemoFeed,
        shutdown: S,
    ) -> Result<StopReason>
    where
        S: Future<Output = ()>,
    {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.config.frame_rate.max(1)));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal");
                    return Ok(StopReason::Shutdown);
                }
                _ = &mut deadline => return Ok(StopReason::Timeout),
                _ = ticker.tick() => {
                    let round = feed
                        .next_round()
                        .map_err(|e| CliError::pipeline_execution(e.to_string()))?;
                    for (channel, frame) in round {
                        for fragment in feed.fragments(&frame) {
                            engine.parse(&channel, &fragment);
                        }
                    }
                    if self.config.max_frames.is_some_and(|max| feed.data_frames() >= max) {
                        return Ok(StopReason::MaxFrames);
                    }
                }
            }
        }
    }
}

/// Factory whose mocks stay reachable by id for the frame listener
fn source_factory(sources: &SourceMembers) -> RegistryFactory {
    let sources = Arc::clone(sources);
    RegistryFactory::new().with(MOCK_KIND, move |descriptor: &Descriptor| {
        let mock = Arc::new(MockComponent::new(descriptor.id, descriptor.display_name()));
        lock(&sources).insert(descriptor.id, Arc::clone(&mock));
        Ok(mock as Arc<dyn Component>)
    })
}

fn log_data_source(data_source: &DataSource) {
    for (table, rows) in &data_source.tables {
        debug!(data_source = %data_source.name, table = %table, rows = rows.len(), "Descriptor table");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
