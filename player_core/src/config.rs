// Player configuration passed from JS. Every tunable has a serde default.

use serde::{Deserialize, Serialize};

use crate::layer::LayerConfig;

/// Configuration for one player instance (one media element).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Player instance id; prefixes every layer DOM id.
    pub player_id: String,
    /// Video/attachment identifier reported in analytics records.
    pub video_id: String,
    #[serde(default)]
    pub analytics: AnalyticsContext,
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub timing: TimingSettings,
    #[serde(default)]
    pub milestones: MilestoneSettings,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

impl PlayerConfig {
    pub fn new(player_id: impl Into<String>, video_id: impl Into<String>) -> Self {
        PlayerConfig {
            player_id: player_id.into(),
            video_id: video_id.into(),
            analytics: AnalyticsContext::default(),
            layout: LayoutSettings::default(),
            timing: TimingSettings::default(),
            milestones: MilestoneSettings::default(),
            layers: Vec::new(),
        }
    }

    pub fn with_layers(mut self, layers: Vec<LayerConfig>) -> Self {
        self.layers = layers;
        self
    }
}

/// Session/user context stamped on every analytics record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsContext {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
}

impl Default for AnalyticsContext {
    fn default() -> Self {
        AnalyticsContext {
            enabled: true,
            session_id: String::new(),
            user_id: None,
            page_url: None,
        }
    }
}

/// Hotspot layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutSettings {
    /// Width of the design canvas hotspot positions are expressed in.
    #[serde(default = "default_reference_width")]
    pub reference_width: f64,
    /// Height of the design canvas hotspot positions are expressed in.
    #[serde(default = "default_reference_height")]
    pub reference_height: f64,
    /// Minimum gap between a tooltip and the viewport edge (px).
    #[serde(default = "default_tooltip_clearance")]
    pub tooltip_clearance: f64,
    /// Diameter used when a hotspot omits `size` (reference px).
    #[serde(default = "default_hotspot_size")]
    pub default_hotspot_size: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            reference_width: default_reference_width(),
            reference_height: default_reference_height(),
            tooltip_clearance: default_tooltip_clearance(),
            default_hotspot_size: default_hotspot_size(),
        }
    }
}

fn default_reference_width() -> f64 {
    800.0
}

fn default_reference_height() -> f64 {
    600.0
}

fn default_tooltip_clearance() -> f64 {
    10.0
}

fn default_hotspot_size() -> f64 {
    30.0
}

/// Timer settings (milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    #[serde(default = "default_resize_debounce")]
    pub resize_debounce_ms: u32,
    #[serde(default = "default_milestone_interval")]
    pub milestone_interval_ms: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        TimingSettings {
            resize_debounce_ms: default_resize_debounce(),
            milestone_interval_ms: default_milestone_interval(),
        }
    }
}

fn default_resize_debounce() -> u32 {
    100
}

fn default_milestone_interval() -> u32 {
    2_500
}

/// Progress milestone settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneSettings {
    /// Percentage thresholds; 100 is reported as `complete`.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<u8>,
    /// Coverage (percent, unrounded) required on `ended` to report completion.
    #[serde(default = "default_completion_coverage")]
    pub completion_coverage: f64,
}

impl Default for MilestoneSettings {
    fn default() -> Self {
        MilestoneSettings {
            thresholds: default_thresholds(),
            completion_coverage: default_completion_coverage(),
        }
    }
}

fn default_thresholds() -> Vec<u8> {
    vec![25, 50, 75, 100]
}

fn default_completion_coverage() -> f64 {
    99.0
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{"player_id":"p1","video_id":"42"}"#).unwrap();

        assert_eq!(config.layout.reference_width, 800.0);
        assert_eq!(config.layout.reference_height, 600.0);
        assert_eq!(config.layout.tooltip_clearance, 10.0);
        assert_eq!(config.timing.resize_debounce_ms, 100);
        assert_eq!(config.timing.milestone_interval_ms, 2_500);
        assert_eq!(config.milestones.thresholds, vec![25, 50, 75, 100]);
        assert!(config.analytics.enabled);
        assert!(config.layers.is_empty());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: PlayerConfig = serde_json::from_str(
            r#"{"player_id":"p1","video_id":"42","timing":{"milestone_interval_ms":1000}}"#,
        )
        .unwrap();

        assert_eq!(config.timing.milestone_interval_ms, 1_000);
        assert_eq!(config.timing.resize_debounce_ms, 100);
    }
}
