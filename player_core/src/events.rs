// Event Emitter: fans scheduler/aggregator output out to sinks (analytics transport, page hooks).
// Delivery is fire-and-forget. Sink failures are logged and dropped, never retried.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AnalyticsContext;
use crate::error::PlayerError;
use crate::layer::LayerType;
use crate::types::{PlayedRange, Seconds};

/// Notification for external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Media metadata loaded; the player is ready.
    Ready { player_id: String },
    /// First notification of a layer's visible episode.
    LayerShown { layer_id: String, kind: LayerType },
    LayerDismissed { layer_id: String },
    /// 0% milestone, once per session.
    PlayStarted,
    Progress { percent: u8 },
    Complete,
    HotspotClicked { layer_id: String, hotspot_id: String },
    Analytics { record: AnalyticsRecord },
}

/// Analytics record kind. Encoded as the integer the ingestion endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AnalyticsEventType {
    PageLoad = 1,
    Heatmap = 2,
}

impl From<AnalyticsEventType> for u8 {
    fn from(kind: AnalyticsEventType) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for AnalyticsEventType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AnalyticsEventType::PageLoad),
            2 => Ok(AnalyticsEventType::Heatmap),
            other => Err(format!("unknown analytics event type {}", other)),
        }
    }
}

/// Payload POSTed to the analytics endpoint by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub event_type: AnalyticsEventType,
    pub video_id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub page_url: Option<String>,
    pub ranges: Vec<PlayedRange>,
    pub total_duration: Seconds,
}

impl AnalyticsRecord {
    pub fn new(
        event_type: AnalyticsEventType,
        video_id: &str,
        context: &AnalyticsContext,
        ranges: Vec<PlayedRange>,
        total_duration: Seconds,
    ) -> Self {
        AnalyticsRecord {
            event_type,
            video_id: video_id.to_string(),
            session_id: context.session_id.clone(),
            user_id: context.user_id.clone(),
            page_url: context.page_url.clone(),
            ranges,
            total_duration,
        }
    }
}

/// Consumer of player events.
pub trait EventSink {
    fn deliver(&mut self, event: &PlayerEvent) -> Result<(), PlayerError>;
}

/// Delivers events to every sink and buffers them for the wasm host.
#[derive(Default)]
pub struct EventEmitter {
    sinks: Vec<Box<dyn EventSink>>,
    outbox: Vec<PlayerEvent>,
}

impl EventEmitter {
    pub fn new() -> Self {
        EventEmitter::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn emit(&mut self, event: PlayerEvent) {
        for sink in self.sinks.iter_mut() {
            if let Err(err) = sink.deliver(&event) {
                warn!(error = %err, "event delivery failed, dropping");
            }
        }
        self.outbox.push(event);
    }

    pub fn emit_all<I: IntoIterator<Item = PlayerEvent>>(&mut self, events: I) {
        for event in events {
            self.emit(event);
        }
    }

    /// Take everything emitted since the last drain.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn clear_sinks(&mut self) {
        self.sinks.clear();
    }
}
