//! FrameDispatchEngine - multi-channel frame reconstruction and dispatch
//!
//! Bytes arrive per `SourceChannel` in arbitrary fragments. The engine keeps
//! one reconstruction state per channel, classifies completed frames, and
//! raises typed notifications. Raw frame buffer echoes go through a lazily
//! created `NotificationQueue` so slow consumers never stall parsing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{
    ContractError, FrameCategory, FrameEnvelope, Listener, ListenerSet, SourceChannel, TypeTag,
};
use metrics::counter;
use tokio::runtime::Handle;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::channel::ChannelState;
use crate::classifier::{FrameClassifier, SyncWordClassifier};
use crate::config::{MetricsSnapshot, ParserConfig, ParserMetrics};
use crate::error::ParserError;
use crate::events::{FrameBuffer, ParserEvent};
use crate::queue::NotificationQueue;
use crate::registry::{FrameHandler, TypeHandlerRegistry};

/// Builder for creating a FrameDispatchEngine
///
/// Listeners are attached before handlers are registered, so duplicate
/// registrations are reported to them during `build`.
pub struct FrameDispatchEngineBuilder {
    classifier: Arc<dyn FrameClassifier>,
    handlers: Vec<(TypeTag, Arc<dyn FrameHandler>)>,
    listeners: Vec<Listener<ParserEvent>>,
    buffer_listeners: Vec<Listener<FrameBuffer>>,
    config: ParserConfig,
    runtime: Option<Handle>,
}

impl FrameDispatchEngineBuilder {
    /// Builder using the sync-word classifier and no handlers
    pub fn new() -> Self {
        Self {
            classifier: Arc::new(SyncWordClassifier::new()),
            handlers: Vec::new(),
            listeners: Vec::new(),
            buffer_listeners: Vec::new(),
            config: ParserConfig::default(),
            runtime: None,
        }
    }

    pub fn classifier(mut self, classifier: impl FrameClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime hosting the echo queue worker (defaults to the current one)
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Register a handler for a type tag
    pub fn handler(mut self, type_tag: TypeTag, handler: impl FrameHandler + 'static) -> Self {
        self.handlers.push((type_tag, Arc::new(handler)));
        self
    }

    /// Register several handlers at once
    pub fn handlers(
        mut self,
        handlers: impl IntoIterator<Item = (TypeTag, Arc<dyn FrameHandler>)>,
    ) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Subscribe to parser notifications
    pub fn on_event<F>(mut self, listener: F) -> Self
    where
        F: Fn(&ParserEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Subscribe to raw frame buffer echoes
    pub fn on_frame_buffer<F>(mut self, listener: F) -> Self
    where
        F: Fn(&FrameBuffer) + Send + Sync + 'static,
    {
        self.buffer_listeners.push(Arc::new(listener));
        self
    }

    /// Build the engine, populating the registry
    #[instrument(
        name = "frame_parser_build",
        skip(self),
        fields(handlers = self.handlers.len())
    )]
    pub fn build(self) -> FrameDispatchEngine {
        let listeners = Arc::new(ListenerSet::new());
        for listener in self.listeners {
            listeners.push(listener);
        }

        let buffer_listeners = Arc::new(ListenerSet::new());
        for listener in self.buffer_listeners {
            buffer_listeners.push(listener);
        }

        let mut registry = TypeHandlerRegistry::new();
        for (type_tag, handler) in self.handlers {
            if let Err(e) = registry.register(type_tag, handler) {
                raise_error(&listeners, e);
            }
        }

        info!(
            types = ?registry.tags(),
            max_frame_length = self.config.max_frame_length,
            "frame dispatch engine built"
        );

        FrameDispatchEngine {
            classifier: self.classifier,
            registry,
            channels: Mutex::new(HashMap::new()),
            listeners,
            buffer_listeners,
            echo_queue: Mutex::new(None),
            runtime: self.runtime,
            metrics: Arc::new(ParserMetrics::new()),
            config: self.config,
        }
    }
}

impl Default for FrameDispatchEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reconstructs, classifies and dispatches frames from many channels
pub struct FrameDispatchEngine {
    classifier: Arc<dyn FrameClassifier>,
    registry: TypeHandlerRegistry,
    channels: Mutex<HashMap<SourceChannel, ChannelState>>,
    listeners: Arc<ListenerSet<ParserEvent>>,
    buffer_listeners: Arc<ListenerSet<FrameBuffer>>,
    echo_queue: Mutex<Option<NotificationQueue<FrameBuffer>>>,
    runtime: Option<Handle>,
    metrics: Arc<ParserMetrics>,
    config: ParserConfig,
}

impl FrameDispatchEngine {
    pub fn builder() -> FrameDispatchEngineBuilder {
        FrameDispatchEngineBuilder::new()
    }

    /// Subscribe to parser notifications after construction
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&ParserEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener);
    }

    /// Subscribe to raw frame buffer echoes after construction
    pub fn subscribe_frame_buffers<F>(&self, listener: F)
    where
        F: Fn(&FrameBuffer) + Send + Sync + 'static,
    {
        self.buffer_listeners.subscribe(listener);
    }

    /// Feed a fragment received on `channel`
    ///
    /// Every frame the fragment completes is dispatched before returning.
    /// A malformed frame resets only this channel.
    #[instrument(
        name = "frame_parser_parse",
        level = "trace",
        skip(self, data),
        fields(channel = %channel, len = data.len())
    )]
    pub fn parse(&self, channel: &SourceChannel, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.metrics.record_bytes(data.len());

        let reassembly = {
            let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
            let state = channels
                .entry(channel.clone())
                .or_insert_with(ChannelState::new);
            state.feed(
                channel,
                data,
                self.classifier.as_ref(),
                self.config.max_frame_length,
            )
        };

        for frame in &reassembly.frames {
            let envelope = FrameEnvelope {
                type_tag: frame.type_tag,
                source: channel,
                buffer: &reassembly.image,
                offset: frame.offset,
                length: frame.length,
            };
            self.dispatch(&envelope);
        }

        if let Some(err) = reassembly.malformed {
            self.metrics.record_malformed();
            counter!("concentrator_malformed_frames_total").increment(1);
            warn!(channel = %channel, error = %err, "malformed frame, channel reset");
            raise_error(&self.listeners, err);
        }
    }

    fn dispatch(&self, envelope: &FrameEnvelope<'_>) {
        self.metrics.record_frame();

        let handler = self.registry.get(envelope.type_tag);
        let category = handler.map_or(FrameCategory::Undetermined, |h| h.category());

        counter!("concentrator_frames_received_total", "category" => category.as_str())
            .increment(1);
        trace!(
            channel = %envelope.source,
            type_tag = %envelope.type_tag,
            category = %category,
            length = envelope.length,
            "frame complete"
        );

        raise(
            &self.listeners,
            ParserEvent::FrameReceived {
                source: envelope.source.clone(),
                category,
                length: envelope.length,
            },
        );

        if !self.buffer_listeners.is_empty() {
            self.echo(envelope);
        }

        let Some(handler) = handler else {
            self.metrics.record_unknown_type();
            counter!("concentrator_unknown_frame_types_total").increment(1);
            raise_error(
                &self.listeners,
                ContractError::UnknownFrameType {
                    type_tag: envelope.type_tag.to_string(),
                },
            );
            return;
        };

        match handler.parse(envelope) {
            Ok(frame) => {
                self.metrics.record_parsed();
                raise(&self.listeners, ParserEvent::from_frame(frame));
            }
            Err(e) => raise_error(&self.listeners, e),
        }
    }

    fn echo(&self, envelope: &FrameEnvelope<'_>) {
        let buffer = FrameBuffer {
            source: envelope.source.clone(),
            bytes: envelope.to_bytes(),
        };

        // Errors are raised after the lock is released; listeners may re-enter
        let outcome: Result<(), ContractError> = {
            let mut queue = self
                .echo_queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match queue.as_ref() {
                Some(active) => active.enqueue(buffer).map_err(Into::into),
                None => match self.spawn_echo_queue() {
                    Ok(created) => {
                        let queued = created.enqueue(buffer).map_err(Into::into);
                        *queue = Some(created);
                        queued
                    }
                    Err(e) => Err(e.into()),
                },
            }
        };

        match outcome {
            Ok(()) => self.metrics.record_buffer_queued(),
            Err(e) => raise_error(&self.listeners, e),
        }
    }

    fn spawn_echo_queue(&self) -> Result<NotificationQueue<FrameBuffer>, ParserError> {
        let name = self.config.echo_queue_name.clone();
        let runtime = self
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or_else(|| ParserError::NoRuntime {
                queue: name.clone(),
            })?;

        let buffer_listeners = Arc::clone(&self.buffer_listeners);
        let listeners = Arc::clone(&self.listeners);
        let error_listeners = Arc::clone(&self.listeners);

        Ok(NotificationQueue::spawn(
            name,
            &runtime,
            move |buffer: FrameBuffer| {
                let mut failures = buffer_listeners
                    .notify(&buffer, "FrameBufferReceived")
                    .into_iter();
                match failures.next() {
                    None => Ok(()),
                    Some(first) => {
                        for extra in failures {
                            raise_error(&listeners, extra);
                        }
                        Err(first)
                    }
                }
            },
            move |err| raise_error(&error_listeners, err),
        ))
    }

    /// Drop the partial frame held for `channel`
    pub fn reset_channel(&self, channel: &SourceChannel) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = channels.get_mut(channel) {
            state.reset();
            debug!(channel = %channel, "channel state reset");
        }
    }

    /// Forget a channel entirely
    pub fn remove_channel(&self, channel: &SourceChannel) -> bool {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(channel)
            .is_some()
    }

    /// Number of channels with reconstruction state
    pub fn channel_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Bytes held for an incomplete frame on `channel`
    pub fn pending_bytes(&self, channel: &SourceChannel) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(channel)
            .map_or(0, ChannelState::pending)
    }

    pub fn registry(&self) -> &TypeHandlerRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether the echo queue has been created
    pub fn is_echo_active(&self) -> bool {
        self.echo_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Human-readable status text
    pub fn status(&self) -> String {
        let m = self.metrics.snapshot();
        let mut status = String::new();

        let mut channels: Vec<(String, &'static str, usize)> = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(channel, state)| (channel.to_string(), state.phase_name(), state.pending()))
            .collect();
        channels.sort();

        let types: Vec<String> = self.registry.tags().iter().map(ToString::to_string).collect();

        status.push_str(&format!("      Channels tracked: {}\n", channels.len()));
        status.push_str(&format!("        Bytes received: {}\n", m.bytes_received));
        status.push_str(&format!("       Frames received: {}\n", m.frames_received));
        status.push_str(&format!("         Frames parsed: {}\n", m.frames_parsed));
        status.push_str(&format!("   Unknown frame types: {}\n", m.unknown_types));
        status.push_str(&format!("      Malformed frames: {}\n", m.malformed_frames));
        status.push_str(&format!("Registered frame types: {}\n", types.join(", ")));

        let echo = match self
            .echo_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(queue) => format!(
                "active, {} queued, {} delivered",
                queue.len(),
                queue.metrics().processed()
            ),
            None => "inactive".to_string(),
        };
        status.push_str(&format!("     Frame buffer echo: {echo}\n"));

        for (channel, phase, pending) in channels {
            status.push_str(&format!("    {channel}: {phase}, {pending} bytes pending\n"));
        }

        status
    }

    /// Drain and stop the echo queue
    #[instrument(name = "frame_parser_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        let queue = self
            .echo_queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(queue) = queue {
            queue.shutdown().await;
        }
        info!("frame dispatch engine shut down");
    }
}

fn raise(listeners: &ListenerSet<ParserEvent>, event: ParserEvent) {
    let failures = listeners.notify(&event, event.name());
    let is_error = matches!(event, ParserEvent::ProcessError(_));

    for failure in failures {
        if is_error {
            // Nowhere left to report
            error!(error = %failure, "process error listener failed");
        } else {
            raise_error(listeners, failure);
        }
    }
}

fn raise_error(listeners: &ListenerSet<ParserEvent>, err: ContractError) {
    counter!("concentrator_parser_errors_total", "kind" => err.kind()).increment(1);
    debug!(kind = err.kind(), error = %err, "parser process error");
    raise(listeners, ParserEvent::ProcessError(Arc::new(err)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EnvelopeHandler;
    use bytes::Bytes;
    use contracts::ChannelFrame;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Duration;

    type Recorded = Arc<Mutex<Vec<ParserEvent>>>;

    fn recorder() -> (Recorded, impl Fn(&ParserEvent) + Send + Sync + 'static) {
        let events: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        (events, move |event: &ParserEvent| {
            sink.lock().unwrap().push(event.clone())
        })
    }

    fn frames_of(events: &Recorded) -> Vec<ChannelFrame> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.frame().cloned())
            .collect()
    }

    fn errors_of(events: &Recorded) -> Vec<String> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.as_error().map(ToString::to_string))
            .collect()
    }

    fn encode(tag: u16, id_code: u16, body: &[u8]) -> Bytes {
        SyncWordClassifier::encode(TypeTag(tag), id_code, body).unwrap()
    }

    fn standard_engine() -> (FrameDispatchEngine, Recorded) {
        let (events, listener) = recorder();
        let engine = FrameDispatchEngine::builder()
            .handlers(EnvelopeHandler::standard_set())
            .on_event(listener)
            .build();
        (engine, events)
    }

    #[test]
    fn test_interleaved_channels_with_random_fragmentation() {
        let (engine, events) = standard_engine();
        let mut rng = StdRng::seed_from_u64(7);

        let a = SourceChannel::new("pmu-a");
        let b = SourceChannel::new("pmu-b");

        let mut stream_a = Vec::new();
        let mut stream_b = Vec::new();
        for i in 0..20u8 {
            stream_a.extend_from_slice(&encode(0, 1, &[i; 10]));
            stream_b.extend_from_slice(&encode(2, 2, &[i; 3]));
        }

        let (mut pos_a, mut pos_b) = (0, 0);
        while pos_a < stream_a.len() || pos_b < stream_b.len() {
            if pos_a < stream_a.len() {
                let n = rng.random_range(1..=9).min(stream_a.len() - pos_a);
                engine.parse(&a, &stream_a[pos_a..pos_a + n]);
                pos_a += n;
            }
            if pos_b < stream_b.len() {
                let n = rng.random_range(1..=9).min(stream_b.len() - pos_b);
                engine.parse(&b, &stream_b[pos_b..pos_b + n]);
                pos_b += n;
            }
        }

        let frames = frames_of(&events);
        assert_eq!(frames.len(), 40);
        assert!(errors_of(&events).is_empty());

        let from_a: Vec<_> = frames.iter().filter(|f| f.source == a).collect();
        assert_eq!(from_a.len(), 20);
        for (i, frame) in from_a.iter().enumerate() {
            assert_eq!(frame.category, FrameCategory::Data);
            assert_eq!(frame.payload[..], [i as u8; 10]);
        }
        assert!(frames
            .iter()
            .filter(|f| f.source == b)
            .all(|f| f.category == FrameCategory::Configuration && f.id_code == Some(2)));

        assert_eq!(engine.metrics().frames_parsed, 40);
        assert_eq!(engine.channel_count(), 2);
    }

    #[test]
    fn test_duplicate_type_tag_keeps_first_handler() {
        let (events, listener) = recorder();
        let engine = FrameDispatchEngine::builder()
            .on_event(listener)
            .handler(TypeTag(7), EnvelopeHandler::new("first", FrameCategory::Data))
            .handler(TypeTag(7), EnvelopeHandler::new("second", FrameCategory::Header))
            .build();

        let errors = errors_of(&events);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("duplicate frame type identifier \"7\""));

        engine.parse(&SourceChannel::new("x"), &encode(7, 1, b"v"));

        let frames = frames_of(&events);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].category, FrameCategory::Data);
    }

    #[test]
    fn test_unknown_type_tag_reported_once_and_parsing_continues() {
        let (events, listener) = recorder();
        let engine = FrameDispatchEngine::builder()
            .handler(TypeTag(0), EnvelopeHandler::new("data", FrameCategory::Data))
            .on_event(listener)
            .build();
        let channel = SourceChannel::new("x");

        engine.parse(&channel, &encode(6, 1, b"??"));
        engine.parse(&channel, &encode(0, 1, b"ok"));

        let errors = errors_of(&events);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("undefined frame type identifier \"6\""));

        let recorded = events.lock().unwrap();
        assert!(matches!(
            recorded[0],
            ParserEvent::FrameReceived {
                category: FrameCategory::Undetermined,
                ..
            }
        ));
        drop(recorded);

        assert_eq!(frames_of(&events).len(), 1);
        assert_eq!(engine.metrics().unknown_types, 1);
    }

    #[test]
    fn test_malformed_frame_resets_only_its_channel() {
        let (engine, events) = standard_engine();
        let good = SourceChannel::new("good");
        let bad = SourceChannel::new("bad");

        let frame = encode(0, 5, &[1, 2, 3]);
        engine.parse(&good, &frame[..5]);
        engine.parse(&bad, &[0x12, 0x34, 0x56, 0x78]);

        assert_eq!(engine.pending_bytes(&good), 5);
        assert_eq!(engine.pending_bytes(&bad), 0);

        engine.parse(&good, &frame[5..]);

        let errors = errors_of(&events);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("malformed frame on channel 'bad'"));
        assert_eq!(frames_of(&events).len(), 1);
        assert_eq!(engine.metrics().malformed_frames, 1);
    }

    #[test]
    fn test_checksum_failure_is_malformed() {
        let (engine, events) = standard_engine();
        let mut frame = encode(1, 5, b"header text").to_vec();
        let last = frame.len() - 1;
        frame[last] ^= 0x01;

        engine.parse(&SourceChannel::new("x"), &frame);

        assert!(frames_of(&events).is_empty());
        assert!(errors_of(&events)[0].contains("checksum mismatch"));
    }

    #[test]
    fn test_panicking_listener_reported_as_process_error() {
        let (events, listener) = recorder();
        let engine = FrameDispatchEngine::builder()
            .handlers(EnvelopeHandler::standard_set())
            .on_event(|event| {
                if let ParserEvent::DataFrame(_) = event {
                    panic!("consumer bug");
                }
            })
            .on_event(listener)
            .build();

        engine.parse(&SourceChannel::new("x"), &encode(0, 1, b"d"));

        assert_eq!(frames_of(&events).len(), 1);
        let errors = errors_of(&events);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("DataFrame notification: consumer bug"));
    }

    #[test]
    fn test_echo_without_runtime_reports_error() {
        let (events, listener) = recorder();
        let engine = FrameDispatchEngine::builder()
            .handlers(EnvelopeHandler::standard_set())
            .on_event(listener)
            .on_frame_buffer(|_| {})
            .build();

        engine.parse(&SourceChannel::new("x"), &encode(0, 1, b"d"));

        assert_eq!(frames_of(&events).len(), 1);
        assert!(errors_of(&events)[0].contains("no async runtime available"));
        assert!(!engine.is_echo_active());
    }

    #[tokio::test]
    async fn test_frame_buffers_echoed_through_queue() {
        let (engine, _events) = standard_engine();
        assert!(!engine.is_echo_active());

        let channel = SourceChannel::new("x");
        engine.parse(&channel, &encode(0, 1, b"first"));
        assert!(!engine.is_echo_active());

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        engine.subscribe_frame_buffers(move |buffer| {
            let _ = tx.send(buffer.clone());
        });

        let second = encode(0, 1, b"second");
        let third = encode(4, 1, b"third");
        engine.parse(&channel, &second);
        engine.parse(&channel, &third);
        assert!(engine.is_echo_active());

        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.bytes, second);

        engine.shutdown().await;
        assert_eq!(rx.recv().await.unwrap().bytes, third);
        assert_eq!(engine.metrics().buffers_queued, 2);
    }

    #[test]
    fn test_status_lists_channels() {
        let (engine, _events) = standard_engine();
        engine.parse(&SourceChannel::new("pmu-9"), &encode(0, 1, b"abc")[..3]);

        let status = engine.status();
        assert!(status.contains("Channels tracked: 1"));
        assert!(status.contains("Registered frame types: 0, 1, 2, 3, 4, 5"));
        assert!(status.contains("pmu-9: awaiting header, 3 bytes pending"));
        assert!(status.contains("Frame buffer echo: inactive"));
    }
}
