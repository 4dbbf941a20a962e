// Time Source: the single media element a player is bound to, seen through per-tick snapshots.
// The host forwards every native `timeupdate` (and seek completion) as a signal carrying a
// `MediaSnapshot`; scheduler and aggregator read the same snapshot within one tick.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PlayedRange, Seconds};

/// Read access to playback position, duration, and watched ranges.
pub trait TimeSource {
    fn current_time(&self) -> Seconds;

    /// `None` until the media metadata is loaded.
    fn duration(&self) -> Option<Seconds>;

    fn is_paused(&self) -> bool;

    /// Disjoint watched ranges, sorted by start.
    fn played_ranges(&self) -> &[PlayedRange];

    /// Resolve an absolute or percentage time against the current duration.
    fn resolve(&self, value: TimeValue) -> Seconds {
        value.resolve(self.duration())
    }
}

/// Point-in-time copy of the media element state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    pub current_time: Seconds,
    /// JS sends `null` for `NaN`/unknown.
    #[serde(default)]
    pub duration: Option<Seconds>,
    #[serde(default = "default_paused")]
    pub paused: bool,
    #[serde(default)]
    pub played: Vec<PlayedRange>,
}

fn default_paused() -> bool {
    true
}

impl Default for MediaSnapshot {
    fn default() -> Self {
        MediaSnapshot::new(0.0, None)
    }
}

impl MediaSnapshot {
    pub fn new(current_time: f64, duration: Option<f64>) -> Self {
        MediaSnapshot {
            current_time: Seconds::new(current_time),
            duration: duration.map(Seconds::new),
            paused: true,
            played: Vec::new(),
        }
    }

    pub fn playing(mut self) -> Self {
        self.paused = false;
        self
    }

    pub fn with_played(mut self, ranges: &[(f64, f64)]) -> Self {
        self.played = ranges.iter().copied().map(PlayedRange::from).collect();
        self
    }
}

impl TimeSource for MediaSnapshot {
    fn current_time(&self) -> Seconds {
        self.current_time
    }

    fn duration(&self) -> Option<Seconds> {
        self.duration.filter(|d| d.is_usable_duration())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn played_ranges(&self) -> &[PlayedRange] {
        &self.played
    }
}

/// A configured time: absolute seconds or a percentage of the media duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeValue {
    Absolute(Seconds),
    Percent(f64),
}

impl TimeValue {
    /// Percentages resolve to 0 while the duration is unknown. A layer may therefore
    /// briefly match its window early; the next tick after metadata loads re-resolves it.
    pub fn resolve(self, duration: Option<Seconds>) -> Seconds {
        match self {
            TimeValue::Absolute(secs) => secs,
            TimeValue::Percent(pct) => match duration {
                Some(d) if d.is_usable_duration() => Seconds::new(d.as_f64() * pct / 100.0),
                _ => Seconds::ZERO,
            },
        }
    }

    /// Accepts a JSON number, a numeric string, or an `"NN%"` string.
    pub fn from_json(value: &Value) -> Option<TimeValue> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map(|v| TimeValue::Absolute(Seconds::new(v))),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl FromStr for TimeValue {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let pct: f64 = pct.trim().parse().map_err(|_| ())?;
            return if pct.is_finite() {
                Ok(TimeValue::Percent(pct))
            } else {
                Err(())
            };
        }

        let secs: f64 = s.parse().map_err(|_| ())?;
        if secs.is_finite() {
            Ok(TimeValue::Absolute(Seconds::new(secs)))
        } else {
            Err(())
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Absolute(secs) => write!(f, "{}", secs.as_f64()),
            TimeValue::Percent(pct) => write!(f, "{}%", pct),
        }
    }
}

/// How long a layer stays up after its display time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerDuration {
    Finite(TimeValue),
    Infinite,
}

impl LayerDuration {
    /// Absent, `null`, and `"infinite"` all mean no end bound.
    pub fn from_json(value: Option<&Value>) -> Option<LayerDuration> {
        match value {
            None | Some(Value::Null) => Some(LayerDuration::Infinite),
            Some(Value::String(s)) if s.trim().eq_ignore_ascii_case("infinite") => {
                Some(LayerDuration::Infinite)
            }
            Some(v) => TimeValue::from_json(v).map(LayerDuration::Finite),
        }
    }

    /// End of a window that opens at `start`.
    pub fn end_from(self, start: Seconds, duration: Option<Seconds>) -> Seconds {
        match self {
            LayerDuration::Infinite => Seconds::INFINITY,
            LayerDuration::Finite(value) => start + value.resolve(duration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn percent_resolves_against_duration() {
        let media = MediaSnapshot::new(0.0, Some(100.0));
        assert_eq!(media.resolve(TimeValue::Percent(10.0)), Seconds::new(10.0));
        assert_eq!(
            media.resolve(TimeValue::Absolute(Seconds::new(5.0))),
            Seconds::new(5.0)
        );
    }

    #[test]
    fn percent_resolves_to_zero_without_duration() {
        let unknown = MediaSnapshot::new(0.0, None);
        assert_eq!(unknown.resolve(TimeValue::Percent(50.0)), Seconds::ZERO);

        let zero = MediaSnapshot::new(0.0, Some(0.0));
        assert_eq!(zero.resolve(TimeValue::Percent(50.0)), Seconds::ZERO);
    }

    #[test]
    fn parses_time_values_from_json() {
        assert_eq!(
            TimeValue::from_json(&json!(12)),
            Some(TimeValue::Absolute(Seconds::new(12.0)))
        );
        assert_eq!(
            TimeValue::from_json(&json!("12.5")),
            Some(TimeValue::Absolute(Seconds::new(12.5)))
        );
        assert_eq!(
            TimeValue::from_json(&json!("25%")),
            Some(TimeValue::Percent(25.0))
        );
        assert_eq!(TimeValue::from_json(&json!("soon")), None);
        assert_eq!(TimeValue::from_json(&json!(true)), None);
    }

    #[test]
    fn parses_layer_durations() {
        assert_eq!(LayerDuration::from_json(None), Some(LayerDuration::Infinite));
        assert_eq!(
            LayerDuration::from_json(Some(&json!(null))),
            Some(LayerDuration::Infinite)
        );
        assert_eq!(
            LayerDuration::from_json(Some(&json!("Infinite"))),
            Some(LayerDuration::Infinite)
        );
        assert_eq!(
            LayerDuration::from_json(Some(&json!(5))),
            Some(LayerDuration::Finite(TimeValue::Absolute(Seconds::new(5.0))))
        );
        assert_eq!(LayerDuration::from_json(Some(&json!("abc"))), None);
    }

    #[test]
    fn window_end() {
        let start = Seconds::new(10.0);
        let finite = LayerDuration::Finite(TimeValue::Absolute(Seconds::new(5.0)));
        assert_eq!(finite.end_from(start, Some(Seconds::new(100.0))), Seconds::new(15.0));
        assert_eq!(
            LayerDuration::Infinite.end_from(start, None),
            Seconds::INFINITY
        );
    }

    #[test]
    fn snapshot_json_shape() {
        let media: MediaSnapshot = serde_json::from_str(
            r#"{"current_time":12.0,"duration":null,"paused":false,"played":[[0,12]]}"#,
        )
        .unwrap();
        assert_eq!(media.duration(), None);
        assert!(!media.is_paused());
        assert_eq!(media.played_ranges().len(), 1);
    }
}
