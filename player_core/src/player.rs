// Player: one instance per media element, with a single dispatch surface.
// JS forwards browser signals; the player answers with commands to apply and events to publish.
// PlayerManager owns every live player so nothing hangs off window globals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::command::{PlayerCommand, Reaction};
use crate::config::PlayerConfig;
use crate::error::PlayerError;
use crate::events::{AnalyticsEventType, AnalyticsRecord, EventEmitter, EventSink, PlayerEvent};
use crate::hotspot::{FrameGeometry, HotspotPositioner};
use crate::layer::{LayerRegistry, LayerType};
use crate::progress::{HeatmapExport, ProgressAggregator};
use crate::scheduler::{Dismissal, OverlayScheduler, UnmountedLayers};
use crate::time_source::MediaSnapshot;
use crate::timer::Timer;

/// Native media element events the host forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaEvent {
    /// `loadedmetadata`: duration is known.
    Ready,
    Play,
    Pause,
    Seeking,
    Seeked,
    Ended,
}

/// User interactions with overlays and controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserAction {
    Play,
    Dismiss { layer_id: String },
    /// An embedded form inside a layer was submitted; same effect as "continue".
    FormSubmitted { layer_id: String },
    HotspotHoverEnter { layer_id: String, hotspot_id: String },
    HotspotHoverLeave { layer_id: String, hotspot_id: String },
    HotspotClick { layer_id: String, hotspot_id: String },
}

/// Everything the host can tell a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    PositionUpdate {
        media: MediaSnapshot,
        #[serde(default)]
        unmounted: Vec<String>,
    },
    Media {
        event: MediaEvent,
        media: MediaSnapshot,
        #[serde(default)]
        now_ms: f64,
    },
    Resize {
        now_ms: f64,
        frame: FrameGeometry,
    },
    FullscreenChange {
        frame: FrameGeometry,
    },
    User {
        action: UserAction,
        #[serde(default)]
        media: Option<MediaSnapshot>,
    },
    Clock {
        now_ms: f64,
        #[serde(default)]
        media: Option<MediaSnapshot>,
    },
    ExportHeatmap,
    PageUnload,
}

/// One media element's overlay and analytics engine.
pub struct Player {
    config: PlayerConfig,
    registry: LayerRegistry,
    scheduler: OverlayScheduler,
    positioner: HotspotPositioner,
    progress: ProgressAggregator,
    emitter: EventEmitter,
    resize_debounce: Timer,
    pending_frame: Option<FrameGeometry>,
    media: MediaSnapshot,
    /// `ready` and the page-load record go out once per player.
    ready_announced: bool,
    disposed: bool,
}

impl Player {
    pub fn new(mut config: PlayerConfig) -> Self {
        let registry = LayerRegistry::build(std::mem::take(&mut config.layers));
        info!(
            player = %config.player_id,
            layers = registry.len(),
            rejected = registry.rejected().len(),
            "player created"
        );

        Player {
            scheduler: OverlayScheduler::new(config.player_id.clone(), &registry),
            positioner: HotspotPositioner::new(config.player_id.clone(), config.layout.clone()),
            progress: ProgressAggregator::new(
                config.milestones.clone(),
                config.timing.milestone_interval_ms,
            ),
            emitter: EventEmitter::new(),
            resize_debounce: Timer::new(),
            pending_frame: None,
            media: MediaSnapshot::default(),
            ready_announced: false,
            disposed: false,
            registry,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.player_id
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &OverlayScheduler {
        &self.scheduler
    }

    pub fn progress(&self) -> &ProgressAggregator {
        &self.progress
    }

    pub fn positioner(&self) -> &HotspotPositioner {
        &self.positioner
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.emitter.add_sink(sink);
    }

    /// The only entry point for host signals.
    pub fn dispatch(&mut self, signal: Signal) -> Reaction {
        if self.disposed {
            debug!(player = %self.config.player_id, "signal after disposal ignored");
            return Reaction::new();
        }

        let mut reaction = Reaction::new();
        match signal {
            Signal::PositionUpdate { media, unmounted } => {
                self.media = media;
                self.reconcile(&unmounted, &mut reaction);
            }
            Signal::Media {
                event,
                media,
                now_ms,
            } => {
                self.media = media;
                self.on_media_event(event, now_ms, &mut reaction);
            }
            Signal::Resize { now_ms, frame } => {
                self.pending_frame = Some(frame);
                self.resize_debounce
                    .arm(now_ms, self.config.timing.resize_debounce_ms);
            }
            Signal::FullscreenChange { frame } => {
                self.pending_frame = None;
                self.resize_debounce.clear();
                self.relayout(frame, &mut reaction);
            }
            Signal::User { action, media } => {
                if let Some(media) = media {
                    self.media = media;
                }
                self.on_user_action(action, &mut reaction);
            }
            Signal::Clock { now_ms, media } => {
                if let Some(media) = media {
                    self.media = media;
                }
                self.on_clock(now_ms, &mut reaction);
            }
            Signal::ExportHeatmap => self.emit_heatmap(),
            Signal::PageUnload => {
                if !self.media.played.is_empty() {
                    self.emit_heatmap();
                }
            }
        }

        reaction.events = self.emitter.drain();
        reaction
    }

    fn reconcile(&mut self, unmounted: &[String], reaction: &mut Reaction) {
        let outcome =
            self.scheduler
                .reconcile(&self.registry, &self.media, &UnmountedLayers(unmounted));
        reaction.extend(outcome.commands);

        for index in outcome.shown {
            let Some(layer) = self.registry.get(index) else {
                continue;
            };
            if layer.layer_type() == LayerType::Hotspot {
                reaction.extend(self.positioner.on_layer_shown(layer));
            }
        }

        for index in outcome.notify {
            if let Some(layer) = self.registry.get(index) {
                self.emitter.emit(PlayerEvent::LayerShown {
                    layer_id: layer.id.clone(),
                    kind: layer.layer_type(),
                });
            }
        }
    }

    fn on_media_event(&mut self, event: MediaEvent, now_ms: f64, reaction: &mut Reaction) {
        match event {
            MediaEvent::Ready => {
                if !self.ready_announced {
                    self.ready_announced = true;
                    self.emitter.emit(PlayerEvent::Ready {
                        player_id: self.config.player_id.clone(),
                    });
                    self.emit_analytics(AnalyticsEventType::PageLoad);
                }
                self.reconcile(&[], reaction);
            }
            MediaEvent::Play => {
                if let Some(pause) = self.scheduler.play_gate(&self.registry) {
                    reaction.push(pause);
                } else {
                    let events = self.progress.on_play(now_ms);
                    self.emitter.emit_all(events);
                }
            }
            MediaEvent::Pause => self.progress.on_pause(),
            MediaEvent::Seeking => self.progress.on_seeking(),
            MediaEvent::Seeked => {
                self.progress.on_seeked(now_ms, &self.media);
                self.reconcile(&[], reaction);
            }
            MediaEvent::Ended => {
                let events = self.progress.on_ended(&self.media);
                self.emitter.emit_all(events);
                self.reconcile(&[], reaction);
            }
        }
    }

    fn on_user_action(&mut self, action: UserAction, reaction: &mut Reaction) {
        match action {
            UserAction::Play => reaction.push(self.scheduler.request_play(&self.registry)),
            UserAction::Dismiss { layer_id } => {
                self.dismiss(layer_id, Dismissal::Skip, reaction)
            }
            UserAction::FormSubmitted { layer_id } => {
                self.dismiss(layer_id, Dismissal::Continue, reaction)
            }
            UserAction::HotspotHoverEnter {
                layer_id,
                hotspot_id,
            } => {
                let Some(layer) = self.registry.find(&layer_id) else {
                    warn!(layer = %layer_id, "hover on unknown layer");
                    return;
                };
                let Some(hotspot) = layer.hotspot(&hotspot_id) else {
                    warn!(layer = %layer_id, hotspot = %hotspot_id, "hover on unknown hotspot");
                    return;
                };
                if let Some(command) = self.positioner.hover_enter(layer, hotspot, self.media.paused)
                {
                    reaction.push(command);
                }
            }
            UserAction::HotspotHoverLeave {
                layer_id,
                hotspot_id,
            } => {
                if let Some(command) = self.positioner.hover_leave(&layer_id, &hotspot_id) {
                    // A blocking layer that came up mid-hover still wins.
                    if command == PlayerCommand::Play {
                        reaction.push(self.scheduler.request_play(&self.registry));
                    } else {
                        reaction.push(command);
                    }
                }
            }
            UserAction::HotspotClick {
                layer_id,
                hotspot_id,
            } => {
                let link = self
                    .registry
                    .find(&layer_id)
                    .and_then(|layer| layer.hotspot(&hotspot_id))
                    .and_then(|hotspot| hotspot.link.clone());
                if let Some(url) = link {
                    reaction.push(PlayerCommand::OpenLink { url });
                }
                self.emitter.emit(PlayerEvent::HotspotClicked {
                    layer_id,
                    hotspot_id,
                });
            }
        }
    }

    fn dismiss(&mut self, layer_id: String, how: Dismissal, reaction: &mut Reaction) {
        match self.scheduler.dismiss(&self.registry, &layer_id, how) {
            Ok(Some(commands)) => {
                reaction.extend(commands);
                self.emitter.emit(PlayerEvent::LayerDismissed { layer_id });
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "dismiss ignored"),
        }
    }

    fn on_clock(&mut self, now_ms: f64, reaction: &mut Reaction) {
        if self.resize_debounce.fire_if_due(now_ms) {
            if let Some(frame) = self.pending_frame.take() {
                self.relayout(frame, reaction);
            }
        }

        let events = self.progress.on_clock(now_ms, &self.media);
        self.emitter.emit_all(events);
    }

    fn relayout(&mut self, frame: FrameGeometry, reaction: &mut Reaction) {
        let visible = self
            .scheduler
            .visible()
            .filter_map(|index| self.registry.get(index))
            .filter(|layer| layer.layer_type() == LayerType::Hotspot);
        reaction.extend(self.positioner.relayout(frame, visible));
    }

    /// Played ranges and duration from the latest snapshot.
    pub fn export_ranges(&self) -> HeatmapExport {
        self.progress.export_ranges(&self.media)
    }

    fn emit_heatmap(&mut self) {
        self.emit_analytics(AnalyticsEventType::Heatmap);
    }

    fn emit_analytics(&mut self, event_type: AnalyticsEventType) {
        if !self.config.analytics.enabled {
            return;
        }

        let export = self.export_ranges();
        let record = AnalyticsRecord::new(
            event_type,
            &self.config.video_id,
            &self.config.analytics,
            export.ranges,
            export.total_duration,
        );
        self.emitter.emit(PlayerEvent::Analytics { record });
    }

    /// Start a fresh viewing session on the same element.
    pub fn reset_session(&mut self) -> Reaction {
        let mut reaction = Reaction::new();
        reaction.extend(self.scheduler.reset(&self.registry));
        self.positioner.reset();
        self.progress.reset();
        self.media = MediaSnapshot::default();
        reaction
    }

    /// Tear down: clear timers, drop hover captures and sinks, tell the host to detach
    /// its listeners and observers. Idempotent.
    pub fn dispose(&mut self) -> Reaction {
        let mut reaction = Reaction::new();
        if self.disposed {
            return reaction;
        }

        self.disposed = true;
        self.resize_debounce.clear();
        self.pending_frame = None;
        self.progress.stop();
        self.positioner.clear_hover();
        reaction.events = self.emitter.drain();
        self.emitter.clear_sinks();
        reaction.push(PlayerCommand::Detach {
            player_id: self.config.player_id.clone(),
        });

        info!(player = %self.config.player_id, "player disposed");
        reaction
    }
}

/// Owns every live player, keyed by player id.
#[derive(Default)]
pub struct PlayerManager {
    players: HashMap<String, Player>,
}

impl PlayerManager {
    pub fn new() -> Self {
        PlayerManager::default()
    }

    /// Create a player. An existing player with the same id is disposed first and its
    /// teardown reaction returned.
    pub fn create(&mut self, config: PlayerConfig) -> Reaction {
        let player = Player::new(config);
        let id = player.id().to_string();
        match self.players.insert(id, player) {
            Some(mut previous) => previous.dispose(),
            None => Reaction::new(),
        }
    }

    pub fn get(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn get_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    pub fn dispatch(&mut self, player_id: &str, signal: Signal) -> Result<Reaction, PlayerError> {
        self.players
            .get_mut(player_id)
            .map(|player| player.dispatch(signal))
            .ok_or_else(|| PlayerError::UnknownPlayer(player_id.to_string()))
    }

    pub fn dispose(&mut self, player_id: &str) -> Result<Reaction, PlayerError> {
        self.players
            .remove(player_id)
            .map(|mut player| player.dispose())
            .ok_or_else(|| PlayerError::UnknownPlayer(player_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
