// Strong typing over raw floats. Newtypes for media time, played ranges, and pixel geometry.

use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Media time in seconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Seconds(f64);

impl Seconds {
    pub const ZERO: Seconds = Seconds(0.0);
    pub const INFINITY: Seconds = Seconds(f64::INFINITY);

    pub fn new(secs: f64) -> Self {
        Seconds(secs)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    /// A duration the host can actually divide by: finite and strictly positive.
    pub fn is_usable_duration(&self) -> bool {
        self.0.is_finite() && self.0 > 0.0
    }
}

impl Add for Seconds {
    type Output = Seconds;

    fn add(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 + rhs.0)
    }
}

impl Sub for Seconds {
    type Output = Seconds;

    fn sub(self, rhs: Seconds) -> Seconds {
        Seconds(self.0 - rhs.0)
    }
}

/// A contiguous interval of media time the viewer actually watched.
/// Serialized as a `[start, end]` pair, the shape `HTMLMediaElement.played` is flattened to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct PlayedRange {
    pub start: Seconds,
    pub end: Seconds,
}

impl PlayedRange {
    pub fn new(start: Seconds, end: Seconds) -> Self {
        PlayedRange { start, end }
    }

    /// Length of the range, never negative.
    pub fn length(&self) -> f64 {
        (self.end.as_f64() - self.start.as_f64()).max(0.0)
    }
}

impl From<(f64, f64)> for PlayedRange {
    fn from((start, end): (f64, f64)) -> Self {
        PlayedRange::new(Seconds::new(start), Seconds::new(end))
    }
}

impl From<PlayedRange> for (f64, f64) {
    fn from(range: PlayedRange) -> Self {
        (range.start.as_f64(), range.end.as_f64())
    }
}

/// Pixel point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// Pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Pixel rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// The box a video of `intrinsic` size occupies when letterboxed inside this rect
    /// (CSS `object-fit: contain`).
    pub fn fit_contain(&self, intrinsic: Size) -> Rect {
        if intrinsic.is_empty() || self.size().is_empty() {
            return *self;
        }

        let scale = (self.width / intrinsic.width).min(self.height / intrinsic.height);
        let width = intrinsic.width * scale;
        let height = intrinsic.height * scale;

        Rect {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn played_range_serializes_as_pair() {
        let range = PlayedRange::new(Seconds::new(1.5), Seconds::new(4.0));
        assert_eq!(serde_json::to_string(&range).unwrap(), "[1.5,4.0]");

        let parsed: Vec<PlayedRange> = serde_json::from_str("[[0,30],[40,70]]").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].start, Seconds::new(40.0));
        assert_eq!(parsed[1].length(), 30.0);
    }

    #[test]
    fn inverted_range_has_zero_length() {
        let range = PlayedRange::new(Seconds::new(5.0), Seconds::new(3.0));
        assert_eq!(range.length(), 0.0);
    }

    #[test]
    fn usable_duration() {
        assert!(Seconds::new(10.0).is_usable_duration());
        assert!(!Seconds::ZERO.is_usable_duration());
        assert!(!Seconds::INFINITY.is_usable_duration());
        assert!(!Seconds::new(f64::NAN).is_usable_duration());
    }

    #[test]
    fn fit_contain_letterboxes_wide_video() {
        // 16:9 video in a 4:3 box: bars top and bottom.
        let container = Rect::new(0.0, 0.0, 800.0, 600.0);
        let frame = container.fit_contain(Size::new(1920.0, 1080.0));
        assert_eq!(frame.width, 800.0);
        assert_eq!(frame.height, 450.0);
        assert_eq!(frame.x, 0.0);
        assert_eq!(frame.y, 75.0);
    }

    #[test]
    fn fit_contain_ignores_unknown_size() {
        let container = Rect::new(10.0, 20.0, 640.0, 360.0);
        assert_eq!(container.fit_contain(Size::default()), container);
    }
}
