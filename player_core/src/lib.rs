// player_core: Rust/WASM engine for in-video overlays and playback analytics.
// All scheduling decisions live here; the JS shim forwards media/DOM signals and applies
// the returned commands.

mod command;
mod config;
mod error;
mod events;
mod hotspot;
mod layer;
mod player;
mod progress;
mod scheduler;
mod time_source;
mod timer;
mod types;

use wasm_bindgen::prelude::*;

pub use command::{PlayerCommand, Reaction};
pub use config::{AnalyticsContext, LayoutSettings, MilestoneSettings, PlayerConfig, TimingSettings};
pub use error::PlayerError;
pub use events::{AnalyticsEventType, AnalyticsRecord, EventEmitter, EventSink, PlayerEvent};
pub use hotspot::{
    FrameGeometry, HotspotPlacement, HotspotPositioner, TooltipAlign, TooltipPlacement,
    TooltipSide,
};
pub use layer::{
    layer_dom_id, HotspotDescriptor, LayerConfig, LayerDescriptor, LayerKind, LayerRegistry,
    LayerType,
};
pub use player::{MediaEvent, Player, PlayerManager, Signal, UserAction};
pub use progress::{coverage, percentage_played, HeatmapExport, ProgressAggregator};
pub use scheduler::{
    AllMounted, Dismissal, LayerDom, LayerRuntimeState, OverlayScheduler, Reconciliation,
    UnmountedLayers,
};
pub use time_source::{LayerDuration, MediaSnapshot, TimeSource, TimeValue};
pub use timer::Timer;
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js(err: PlayerError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Player registry exposed to JavaScript.
/// JSON in, JSON out, one call per browser signal.
#[wasm_bindgen]
#[derive(Default)]
pub struct WasmPlayerManager {
    inner: PlayerManager,
}

#[wasm_bindgen]
impl WasmPlayerManager {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmPlayerManager {
        WasmPlayerManager::default()
    }

    /// Create a player from a `PlayerConfig` JSON document.
    /// Returns the teardown reaction of a replaced player with the same id (usually empty).
    pub fn create(&mut self, config_json: &str) -> Result<String, JsValue> {
        let config: PlayerConfig = serde_json::from_str(config_json)
            .map_err(|e| to_js(PlayerError::InvalidConfig(e.to_string())))?;
        let reaction = self.inner.create(config);

        serde_json::to_string(&reaction).map_err(|e| to_js(e.into()))
    }

    /// Forward one `Signal` JSON document; returns the `Reaction` JSON.
    pub fn dispatch(&mut self, player_id: &str, signal_json: &str) -> Result<String, JsValue> {
        let signal: Signal = serde_json::from_str(signal_json).map_err(|e| to_js(e.into()))?;
        let reaction = self.inner.dispatch(player_id, signal).map_err(to_js)?;

        serde_json::to_string(&reaction).map_err(|e| to_js(e.into()))
    }

    /// Dispose a player; returns its final reaction (including the `detach` command).
    pub fn dispose(&mut self, player_id: &str) -> Result<String, JsValue> {
        let reaction = self.inner.dispose(player_id).map_err(to_js)?;

        serde_json::to_string(&reaction).map_err(|e| to_js(e.into()))
    }

    /// Messages for layers dropped at creation because of configuration errors.
    pub fn rejected_layers(&self, player_id: &str) -> Result<String, JsValue> {
        let player = self
            .inner
            .get(player_id)
            .ok_or_else(|| to_js(PlayerError::UnknownPlayer(player_id.to_string())))?;
        let messages: Vec<String> = player
            .registry()
            .rejected()
            .iter()
            .map(ToString::to_string)
            .collect();

        serde_json::to_string(&messages).map_err(|e| to_js(e.into()))
    }

    /// Played ranges and duration for the heatmap, without emitting an analytics event.
    pub fn export_ranges(&self, player_id: &str) -> Result<String, JsValue> {
        let player = self
            .inner
            .get(player_id)
            .ok_or_else(|| to_js(PlayerError::UnknownPlayer(player_id.to_string())))?;

        serde_json::to_string(&player.export_ranges()).map_err(|e| to_js(e.into()))
    }

    pub fn player_count(&self) -> usize {
        self.inner.len()
    }
}
