// Layer Registry: declarative overlay descriptors, validated once at player creation.
// Kind-specific payloads are a tagged union so each variant's fields are checked at build.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::PlayerError;
use crate::time_source::{LayerDuration, TimeSource, TimeValue};
use crate::types::{Point, Seconds};

/// Deterministic DOM id of a layer element rendered by the page.
pub fn layer_dom_id(player_id: &str, layer_id: &str) -> String {
    format!("{}-layer-{}", player_id, layer_id)
}

/// Raw layer configuration as emitted by the block renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "displayTime", default)]
    pub display_time: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub allow_skip: bool,
    #[serde(rename = "pauseOnShow", default)]
    pub pause_on_show: Option<bool>,
    #[serde(rename = "pauseOnHover", default)]
    pub pause_on_hover: bool,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub form_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub poll_id: Option<String>,
    #[serde(default)]
    pub hotspots: Vec<HotspotDescriptor>,
}

/// Spatial annotation inside a hotspot layer. Position and size are in reference-canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotDescriptor {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub position: Point,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Overrides the layer-level `pauseOnHover`.
    #[serde(rename = "pauseOnHover", default)]
    pub pause_on_hover: Option<bool>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_json(&value).ok_or_else(|| serde::de::Error::custom("id must be a string or number"))
}

fn id_from_json(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Layer kind discriminant, carried on events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Form,
    Cta,
    Poll,
    Hotspot,
    Custom,
}

impl LayerType {
    /// Form, CTA, and poll overlays block resuming playback while visible.
    pub fn gates_playback(self) -> bool {
        matches!(self, LayerType::Form | LayerType::Cta | LayerType::Poll)
    }

    fn default_pause_on_show(self) -> bool {
        self.gates_playback()
    }
}

/// Kind-specific layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Form {
        html: String,
        form_id: Option<String>,
    },
    Cta {
        html: String,
        url: Option<String>,
    },
    Poll {
        html: String,
        poll_id: Option<String>,
    },
    Hotspot {
        hotspots: Vec<HotspotDescriptor>,
        pause_on_hover: bool,
    },
    Custom {
        html: String,
        css: Option<String>,
    },
}

impl LayerKind {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerKind::Form { .. } => LayerType::Form,
            LayerKind::Cta { .. } => LayerType::Cta,
            LayerKind::Poll { .. } => LayerType::Poll,
            LayerKind::Hotspot { .. } => LayerType::Hotspot,
            LayerKind::Custom { .. } => LayerType::Custom,
        }
    }

    pub fn hotspots(&self) -> &[HotspotDescriptor] {
        match self {
            LayerKind::Hotspot { hotspots, .. } => hotspots,
            _ => &[],
        }
    }
}

/// A validated, immutable overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub id: String,
    pub display_time: TimeValue,
    pub duration: LayerDuration,
    pub allow_skip: bool,
    pub pause_on_show: bool,
    pub kind: LayerKind,
}

impl LayerDescriptor {
    pub fn layer_type(&self) -> LayerType {
        self.kind.layer_type()
    }

    /// Display window `[start, end]` resolved against the current duration.
    pub fn window<T: TimeSource + ?Sized>(&self, time: &T) -> (Seconds, Seconds) {
        let start = time.resolve(self.display_time);
        let end = self.duration.end_from(start, time.duration());
        (start, end)
    }

    /// Whether `time`'s current position falls inside the display window (inclusive).
    pub fn is_active_at<T: TimeSource + ?Sized>(&self, time: &T) -> bool {
        let (start, end) = self.window(time);
        let now = time.current_time();
        now >= start && (!end.is_finite() || now <= end)
    }

    /// Effective hover policy for one of this layer's hotspots.
    pub fn hotspot_pauses_on_hover(&self, hotspot: &HotspotDescriptor) -> bool {
        match &self.kind {
            LayerKind::Hotspot { pause_on_hover, .. } => {
                hotspot.pause_on_hover.unwrap_or(*pause_on_hover)
            }
            _ => false,
        }
    }

    pub fn hotspot(&self, hotspot_id: &str) -> Option<&HotspotDescriptor> {
        self.kind.hotspots().iter().find(|h| h.id == hotspot_id)
    }
}

impl TryFrom<LayerConfig> for LayerDescriptor {
    type Error = PlayerError;

    fn try_from(config: LayerConfig) -> Result<Self, Self::Error> {
        let id = config
            .id
            .as_ref()
            .and_then(id_from_json)
            .ok_or_else(|| PlayerError::InvalidConfig("layer without id".to_string()))?;

        let raw_display = config
            .display_time
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or_else(|| PlayerError::MissingDisplayTime {
                layer_id: id.clone(),
            })?;
        let display_time =
            TimeValue::from_json(raw_display).ok_or_else(|| PlayerError::InvalidTimeValue {
                layer_id: id.clone(),
                field: "displayTime",
                value: raw_display.to_string(),
            })?;

        let duration = LayerDuration::from_json(config.duration.as_ref()).ok_or_else(|| {
            PlayerError::InvalidTimeValue {
                layer_id: id.clone(),
                field: "duration",
                value: config
                    .duration
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_default(),
            }
        })?;

        let html = config.html.unwrap_or_default();
        let kind_name = config.kind.trim().to_ascii_lowercase();
        let kind = match kind_name.as_str() {
            "form" => LayerKind::Form {
                html,
                form_id: config.form_id,
            },
            "cta" => LayerKind::Cta {
                html,
                url: config.url,
            },
            "poll" => LayerKind::Poll {
                html,
                poll_id: config.poll_id,
            },
            "hotspot" => LayerKind::Hotspot {
                hotspots: config.hotspots,
                pause_on_hover: config.pause_on_hover,
            },
            "custom" => LayerKind::Custom {
                html,
                css: config.css,
            },
            _ => {
                return Err(PlayerError::UnknownLayerKind {
                    layer_id: id,
                    kind: config.kind,
                })
            }
        };

        let pause_on_show = config
            .pause_on_show
            .unwrap_or_else(|| kind.layer_type().default_pause_on_show());

        Ok(LayerDescriptor {
            id,
            display_time,
            duration,
            allow_skip: config.allow_skip,
            pause_on_show,
            kind,
        })
    }
}

/// Ordered, read-only collection of layers for one player.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: Vec<LayerDescriptor>,
    rejected: Vec<PlayerError>,
}

impl LayerRegistry {
    /// Validate and store layers in the order given. Invalid layers are dropped and
    /// recorded; the rest load normally.
    pub fn build(configs: Vec<LayerConfig>) -> Self {
        let mut layers: Vec<LayerDescriptor> = Vec::with_capacity(configs.len());
        let mut rejected = Vec::new();
        let mut seen = HashSet::new();

        for config in configs {
            let result = LayerDescriptor::try_from(config).and_then(|layer| {
                if seen.insert(layer.id.clone()) {
                    Ok(layer)
                } else {
                    Err(PlayerError::DuplicateLayer(layer.id))
                }
            });

            match result {
                Ok(layer) => layers.push(layer),
                Err(err) => {
                    warn!(error = %err, "skipping layer");
                    rejected.push(err);
                }
            }
        }

        LayerRegistry { layers, rejected }
    }

    pub fn all(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn get(&self, index: usize) -> Option<&LayerDescriptor> {
        self.layers.get(index)
    }

    pub fn position(&self, layer_id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == layer_id)
    }

    pub fn find(&self, layer_id: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.id == layer_id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Configuration errors for layers dropped at build.
    pub fn rejected(&self) -> &[PlayerError] {
        &self.rejected
    }
}
