// Hotspot Positioner: maps reference-canvas hotspot positions onto the rendered video frame,
// picks tooltip placement, and guards pause-on-hover against unrelated pause/play changes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::command::PlayerCommand;
use crate::config::LayoutSettings;
use crate::layer::{layer_dom_id, HotspotDescriptor, LayerDescriptor};
use crate::types::{Rect, Size};

/// Geometry reported by the host on resize/fullscreen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct FrameGeometry {
    /// Player container box in viewport coordinates.
    pub container: Rect,
    pub viewport: Size,
    /// Intrinsic video size (`videoWidth`/`videoHeight`), once known.
    #[serde(default)]
    pub video_size: Option<Size>,
    /// Rendered tooltip size used for placement.
    #[serde(default)]
    pub tooltip_size: Size,
}

impl FrameGeometry {
    /// Box the video image actually occupies.
    pub fn video_box(&self) -> Rect {
        match self.video_size {
            Some(intrinsic) => self.container.fit_contain(intrinsic),
            None => self.container,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipSide {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TooltipAlign {
    /// Tooltip extends right from the hotspot.
    Left,
    Center,
    /// Tooltip extends left from the hotspot.
    Right,
}

/// Where a hotspot's tooltip goes. The arrow sits on the edge facing the hotspot,
/// at the same horizontal alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TooltipPlacement {
    pub side: TooltipSide,
    pub align: TooltipAlign,
    pub arrow: TooltipSide,
}

/// Pixel placement of one hotspot, relative to the player container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotPlacement {
    pub hotspot_id: String,
    pub left: f64,
    pub top: f64,
    pub size: f64,
    pub tooltip: Option<TooltipPlacement>,
}

/// Lays out hotspot layers and tracks per-session hotspot DOM construction.
#[derive(Debug, Clone)]
pub struct HotspotPositioner {
    player_id: String,
    settings: LayoutSettings,
    frame: Option<FrameGeometry>,
    constructed: HashSet<String>,
    /// (layer, hotspot) -> playback was running when hover started.
    hover_was_playing: HashMap<(String, String), bool>,
}

impl HotspotPositioner {
    pub fn new(player_id: impl Into<String>, settings: LayoutSettings) -> Self {
        HotspotPositioner {
            player_id: player_id.into(),
            settings,
            frame: None,
            constructed: HashSet::new(),
            hover_was_playing: HashMap::new(),
        }
    }

    pub fn frame(&self) -> Option<&FrameGeometry> {
        self.frame.as_ref()
    }

    pub fn set_frame(&mut self, frame: FrameGeometry) {
        self.frame = Some(frame);
    }

    pub fn is_constructed(&self, layer_id: &str) -> bool {
        self.constructed.contains(layer_id)
    }

    /// Pure placement of every hotspot of `layer` inside `frame`.
    pub fn layout(&self, layer: &LayerDescriptor, frame: &FrameGeometry) -> Vec<HotspotPlacement> {
        let video = frame.video_box();
        let scale_x = ratio(video.width, self.settings.reference_width);
        let scale_y = ratio(video.height, self.settings.reference_height);

        layer
            .kind
            .hotspots()
            .iter()
            .map(|hotspot| {
                let left_in_video = hotspot.position.x * scale_x;
                let top_in_video = hotspot.position.y * scale_y;
                let size = hotspot
                    .size
                    .unwrap_or(self.settings.default_hotspot_size)
                    * scale_x;

                let tooltip = hotspot.tooltip.as_ref().map(|_| {
                    self.place_tooltip(
                        video.x + left_in_video + size / 2.0,
                        video.y + top_in_video,
                        frame,
                    )
                });

                HotspotPlacement {
                    hotspot_id: hotspot.id.clone(),
                    left: video.x - frame.container.x + left_in_video,
                    top: video.y - frame.container.y + top_in_video,
                    size,
                    tooltip,
                }
            })
            .collect()
    }

    /// Above unless there is not enough room over the hotspot; centered unless that
    /// would come within the clearance of a viewport edge.
    fn place_tooltip(&self, center_x: f64, top: f64, frame: &FrameGeometry) -> TooltipPlacement {
        let clearance = self.settings.tooltip_clearance;
        let tooltip = frame.tooltip_size;

        let side = if top < tooltip.height + clearance {
            TooltipSide::Below
        } else {
            TooltipSide::Above
        };

        let half = tooltip.width / 2.0;
        let room_left = center_x - half;
        let room_right = frame.viewport.width - (center_x + half);
        let align = if room_left >= clearance && room_right >= clearance {
            TooltipAlign::Center
        } else if room_right < clearance {
            TooltipAlign::Right
        } else {
            TooltipAlign::Left
        };

        let arrow = match side {
            TooltipSide::Above => TooltipSide::Below,
            TooltipSide::Below => TooltipSide::Above,
        };

        TooltipPlacement { side, align, arrow }
    }

    /// The layer just became visible: build its hotspot nodes the first time, then position.
    pub fn on_layer_shown(&mut self, layer: &LayerDescriptor) -> Vec<PlayerCommand> {
        let dom_id = layer_dom_id(&self.player_id, &layer.id);
        let mut commands = Vec::new();

        if self.constructed.insert(layer.id.clone()) {
            commands.push(PlayerCommand::CreateHotspots {
                dom_id: dom_id.clone(),
                layer_id: layer.id.clone(),
                hotspots: layer.kind.hotspots().to_vec(),
            });
        }

        if let Some(frame) = self.frame {
            commands.push(PlayerCommand::PositionHotspots {
                dom_id,
                placements: self.layout(layer, &frame),
            });
        }

        commands
    }

    /// Reposition the given (visible) layers against a new frame.
    pub fn relayout<'a, I>(&mut self, frame: FrameGeometry, layers: I) -> Vec<PlayerCommand>
    where
        I: IntoIterator<Item = &'a LayerDescriptor>,
    {
        self.frame = Some(frame);
        layers
            .into_iter()
            .filter(|layer| self.constructed.contains(&layer.id))
            .map(|layer| PlayerCommand::PositionHotspots {
                dom_id: layer_dom_id(&self.player_id, &layer.id),
                placements: self.layout(layer, &frame),
            })
            .collect()
    }

    /// Pause for a hover only if playback was running when the hover started.
    pub fn hover_enter(
        &mut self,
        layer: &LayerDescriptor,
        hotspot: &HotspotDescriptor,
        paused: bool,
    ) -> Option<PlayerCommand> {
        if !layer.hotspot_pauses_on_hover(hotspot) {
            return None;
        }

        let was_playing = !paused;
        self.hover_was_playing
            .insert((layer.id.clone(), hotspot.id.clone()), was_playing);
        was_playing.then_some(PlayerCommand::Pause)
    }

    /// Resume only if this hover was the one that paused.
    pub fn hover_leave(&mut self, layer_id: &str, hotspot_id: &str) -> Option<PlayerCommand> {
        let was_playing = self
            .hover_was_playing
            .remove(&(layer_id.to_string(), hotspot_id.to_string()))
            .unwrap_or(false);
        was_playing.then_some(PlayerCommand::Play)
    }

    /// Forget hover captures (disposal, session reset).
    pub fn clear_hover(&mut self) {
        self.hover_was_playing.clear();
    }

    /// New session: hotspot nodes are rebuilt on next show.
    pub fn reset(&mut self) {
        self.constructed.clear();
        self.clear_hover();
    }
}

fn ratio(actual: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        actual / reference
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerConfig, LayerRegistry};
    use proptest::prelude::*;

    fn hotspot_layer(hotspots: &str) -> LayerDescriptor {
        let json = format!(
            r#"[{{"id":"h","type":"hotspot","displayTime":0,"pauseOnHover":true,"hotspots":{}}}]"#,
            hotspots
        );
        let configs: Vec<LayerConfig> = serde_json::from_str(&json).unwrap();
        LayerRegistry::build(configs).all()[0].clone()
    }

    fn frame(width: f64, height: f64) -> FrameGeometry {
        FrameGeometry {
            container: Rect::new(0.0, 0.0, width, height),
            viewport: Size::new(width, height),
            video_size: None,
            tooltip_size: Size::new(100.0, 40.0),
        }
    }

    fn positioner() -> HotspotPositioner {
        HotspotPositioner::new("p", LayoutSettings::default())
    }

    #[test]
    fn scales_from_reference_canvas() {
        let layer = hotspot_layer(r#"[{"id":"a","position":{"x":400,"y":300},"size":40}]"#);
        let placements = positioner().layout(&layer, &frame(1600.0, 1200.0));

        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].left, 800.0);
        assert_eq!(placements[0].top, 600.0);
        assert_eq!(placements[0].size, 80.0);
        assert_eq!(placements[0].tooltip, None);
    }

    #[test]
    fn letterboxed_frame_offsets_hotspots() {
        let layer = hotspot_layer(r#"[{"id":"a","position":{"x":0,"y":0}}]"#);
        let mut geometry = frame(800.0, 600.0);
        geometry.video_size = Some(Size::new(1920.0, 1080.0));

        let placements = positioner().layout(&layer, &geometry);
        assert_eq!(placements[0].left, 0.0);
        assert_eq!(placements[0].top, 75.0);
    }

    #[test]
    fn tooltip_flips_below_near_top() {
        let layer = hotspot_layer(
            r#"[{"id":"top","position":{"x":400,"y":20},"tooltip":"t"},
                {"id":"mid","position":{"x":400,"y":300},"tooltip":"t"}]"#,
        );
        let placements = positioner().layout(&layer, &frame(800.0, 600.0));

        let top = placements[0].tooltip.unwrap();
        assert_eq!(top.side, TooltipSide::Below);
        assert_eq!(top.arrow, TooltipSide::Above);

        let mid = placements[1].tooltip.unwrap();
        assert_eq!(mid.side, TooltipSide::Above);
        assert_eq!(mid.arrow, TooltipSide::Below);
        assert_eq!(mid.align, TooltipAlign::Center);
    }

    #[test]
    fn tooltip_aligns_away_from_edges() {
        let layer = hotspot_layer(
            r#"[{"id":"left","position":{"x":5,"y":300},"size":10,"tooltip":"t"},
                {"id":"right","position":{"x":780,"y":300},"size":10,"tooltip":"t"}]"#,
        );
        let placements = positioner().layout(&layer, &frame(800.0, 600.0));

        assert_eq!(placements[0].tooltip.unwrap().align, TooltipAlign::Left);
        assert_eq!(placements[1].tooltip.unwrap().align, TooltipAlign::Right);
    }

    #[test]
    fn hotspots_are_constructed_once() {
        let layer = hotspot_layer(r#"[{"id":"a","position":{"x":1,"y":1}}]"#);
        let mut positioner = positioner();
        positioner.set_frame(frame(800.0, 600.0));

        let first = positioner.on_layer_shown(&layer);
        assert!(matches!(first[0], PlayerCommand::CreateHotspots { .. }));
        assert!(matches!(first[1], PlayerCommand::PositionHotspots { .. }));

        let second = positioner.on_layer_shown(&layer);
        assert_eq!(second.len(), 1);
        assert!(matches!(second[0], PlayerCommand::PositionHotspots { .. }));

        positioner.reset();
        assert!(!positioner.is_constructed("h"));
    }

    #[test]
    fn relayout_skips_unconstructed_layers() {
        let layer = hotspot_layer(r#"[{"id":"a","position":{"x":1,"y":1}}]"#);
        let mut positioner = positioner();
        assert!(positioner.relayout(frame(800.0, 600.0), [&layer]).is_empty());

        positioner.on_layer_shown(&layer);
        assert_eq!(positioner.relayout(frame(400.0, 300.0), [&layer]).len(), 1);
    }

    #[test]
    fn hover_resumes_only_if_it_paused() {
        let layer = hotspot_layer(r#"[{"id":"a","position":{"x":1,"y":1}}]"#);
        let hotspot = layer.hotspot("a").unwrap().clone();
        let mut positioner = positioner();

        assert_eq!(
            positioner.hover_enter(&layer, &hotspot, false),
            Some(PlayerCommand::Pause)
        );
        assert_eq!(positioner.hover_leave("h", "a"), Some(PlayerCommand::Play));

        // Already paused for another reason: hover neither pauses nor resumes.
        assert_eq!(positioner.hover_enter(&layer, &hotspot, true), None);
        assert_eq!(positioner.hover_leave("h", "a"), None);

        // Leave without enter.
        assert_eq!(positioner.hover_leave("h", "a"), None);
    }

    #[test]
    fn hover_ignored_when_policy_off() {
        let layer = hotspot_layer(r#"[{"id":"a","position":{"x":1,"y":1},"pauseOnHover":false}]"#);
        let hotspot = layer.hotspot("a").unwrap().clone();
        let mut positioner = positioner();
        assert_eq!(positioner.hover_enter(&layer, &hotspot, false), None);
        assert_eq!(positioner.hover_leave("h", "a"), None);
    }

    proptest! {
        /// Same frame and hotspot position, same placement.
        #[test]
        fn layout_is_deterministic(
            x in 0.0f64..800.0,
            y in 0.0f64..600.0,
            width in 100.0f64..3000.0,
            height in 100.0f64..2000.0,
        ) {
            let layer = hotspot_layer(&format!(
                r#"[{{"id":"a","position":{{"x":{},"y":{}}},"tooltip":"t"}}]"#,
                x, y
            ));
            let mut positioner = positioner();
            let geometry = frame(width, height);

            let first = positioner.layout(&layer, &geometry);
            positioner.on_layer_shown(&layer);
            positioner.relayout(geometry, [&layer]);
            let second = positioner.layout(&layer, &geometry);

            prop_assert_eq!(first, second);
        }
    }
}
