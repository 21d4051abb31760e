//! # Telemetry Events
//!
//! Defines the event type that flows through the shared bus.
//!
//! Events are `{name, payload}` pairs. Consumers discriminate on the name;
//! the payload is a tagged union so nobody has to inspect its shape.

use serde::{Deserialize, Serialize};
use shared_types::entities::{SensorReading, SourceId};

/// Event emitted once when a source is registered.
pub const DATA_SOURCE_DISCOVERED: &str = "DataSourceDiscovered";

/// Prefix of the per-source reading event, `MessageReceived_<source>`.
pub const MESSAGE_RECEIVED_PREFIX: &str = "MessageReceived_";

/// Payload carried by a [`TelemetryEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum EventPayload {
    /// A source identifier (discovery events).
    Source(SourceId),
    /// A decoded reading (per-source events).
    Reading(SensorReading),
}

/// A named event handed to the event sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    name: String,
    payload: EventPayload,
}

impl TelemetryEvent {
    /// Create an event with an arbitrary name.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// `DataSourceDiscovered` carrying the new source's identifier.
    #[must_use]
    pub fn source_discovered(source: SourceId) -> Self {
        Self::new(DATA_SOURCE_DISCOVERED, EventPayload::Source(source))
    }

    /// `MessageReceived_<source>` carrying a decoded reading.
    #[must_use]
    pub fn message_received(source: &SourceId, reading: SensorReading) -> Self {
        Self::new(
            Self::message_received_name(source),
            EventPayload::Reading(reading),
        )
    }

    /// Event name used for readings from `source`.
    #[must_use]
    pub fn message_received_name(source: &SourceId) -> String {
        format!("{MESSAGE_RECEIVED_PREFIX}{source}")
    }

    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event payload.
    #[must_use]
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Consume the event, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> EventPayload {
        self.payload
    }

    /// The reading, if this is a reading event.
    #[must_use]
    pub fn reading(&self) -> Option<&SensorReading> {
        match &self.payload {
            EventPayload::Reading(reading) => Some(reading),
            EventPayload::Source(_) => None,
        }
    }

    /// Get the topic for this event.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        if self.name == DATA_SOURCE_DISCOVERED {
            EventTopic::Discovery
        } else if self.name.starts_with(MESSAGE_RECEIVED_PREFIX) {
            EventTopic::Readings
        } else {
            EventTopic::Other
        }
    }

    /// Identifier of the source this event is about.
    ///
    /// Discovery events carry it in the payload; reading events carry it in
    /// the name suffix.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self.topic() {
            EventTopic::Discovery => match &self.payload {
                EventPayload::Source(id) => Some(id.as_str()),
                EventPayload::Reading(_) => None,
            },
            EventTopic::Readings => self.name.strip_prefix(MESSAGE_RECEIVED_PREFIX),
            EventTopic::Other | EventTopic::All => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// `DataSourceDiscovered`.
    Discovery,
    /// `MessageReceived_*`.
    Readings,
    /// Any other name.
    Other,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Sources to include. Empty means all sources.
    pub sources: Vec<SourceId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            sources: Vec::new(),
        }
    }

    /// Create a filter for events about specific sources.
    #[must_use]
    pub fn from_sources(sources: Vec<SourceId>) -> Self {
        Self {
            topics: Vec::new(),
            sources,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &TelemetryEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.sources.is_empty()
            || event
                .source()
                .is_some_and(|source| self.sources.iter().any(|s| s.as_str() == source));

        topic_match && source_match
    }
}
