//! Orchestrator configuration.
//!
//! Sink configuration carries the caller-facing handle alongside the sink, so
//! a bus built from configuration stays readable: a memory sink is cloned
//! into the bus while the caller keeps a handle to snapshot, and a channel
//! sink sends into a channel whose receiver the caller kept.

use crate::event_bus::{ChannelSink, Event, EventBus, EventSink, MemorySink, StdOutSink};

/// Configuration for one [`Orchestrator`](crate::orchestrator::Orchestrator)
/// instance.
#[derive(Clone, Debug, Default)]
pub struct OrchestratorConfig {
    pub event_bus: EventBusConfig,
}

impl OrchestratorConfig {
    #[must_use]
    pub fn new(event_bus: EventBusConfig) -> Self {
        Self { event_bus }
    }

    #[must_use]
    pub fn with_event_bus(mut self, event_bus: EventBusConfig) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Stdout-only event output (the default).
    #[must_use]
    pub fn with_stdout_event_bus(self) -> Self {
        self.with_event_bus(EventBusConfig::with_stdout_only())
    }

    /// In-memory event capture; the returned [`MemorySink`] handle reads
    /// everything the configured bus captures.
    #[must_use]
    pub fn with_memory_event_bus(self) -> (Self, MemorySink) {
        let (event_bus, sink) = EventBusConfig::with_memory_sink();
        (self.with_event_bus(event_bus), sink)
    }
}

/// A sink the orchestrator's event bus starts with.
///
/// Variants that capture events hold the live handle, created through
/// [`SinkConfig::memory`] and [`SinkConfig::channel`].
#[derive(Clone, Debug)]
pub enum SinkConfig {
    StdOut,
    Memory(MemorySink),
    Channel(flume::Sender<Event>),
}

impl SinkConfig {
    /// A memory sink plus the handle to read its captured events.
    #[must_use]
    pub fn memory() -> (Self, MemorySink) {
        let sink = MemorySink::new();
        (Self::Memory(sink.clone()), sink)
    }

    /// A channel sink plus the receiver it forwards events to. `None` means
    /// an unbounded channel; `Some(n)` bounds the buffer at `n` events.
    #[must_use]
    pub fn channel(capacity: Option<usize>) -> (Self, flume::Receiver<Event>) {
        let (tx, rx) = match capacity {
            Some(n) => flume::bounded(n),
            None => flume::unbounded(),
        };
        (Self::Channel(tx), rx)
    }
}

/// Declarative event-bus setup, resolved to an [`EventBus`] at construction.
#[derive(Clone, Debug)]
pub struct EventBusConfig {
    pub sinks: Vec<SinkConfig>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self::with_stdout_only()
    }
}

impl EventBusConfig {
    #[must_use]
    pub fn new(sinks: Vec<SinkConfig>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn with_stdout_only() -> Self {
        Self::new(vec![SinkConfig::StdOut])
    }

    /// Memory capture only; the returned handle reads the captured events.
    #[must_use]
    pub fn with_memory_sink() -> (Self, MemorySink) {
        let (sink, handle) = SinkConfig::memory();
        (Self::new(vec![sink]), handle)
    }

    /// Channel forwarding only; events arrive on the returned receiver.
    #[must_use]
    pub fn with_channel_sink(capacity: Option<usize>) -> (Self, flume::Receiver<Event>) {
        let (sink, rx) = SinkConfig::channel(capacity);
        (Self::new(vec![sink]), rx)
    }

    /// Instantiate the configured sinks into a live bus.
    #[must_use]
    pub fn build_event_bus(&self) -> EventBus {
        let sinks: Vec<Box<dyn EventSink>> = self
            .sinks
            .iter()
            .map(|sink| match sink {
                SinkConfig::StdOut => Box::new(StdOutSink) as Box<dyn EventSink>,
                SinkConfig::Memory(sink) => Box::new(sink.clone()),
                SinkConfig::Channel(tx) => Box::new(ChannelSink::new(tx.clone())),
            })
            .collect();
        EventBus::with_sinks(sinks)
    }
}
