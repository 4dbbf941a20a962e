// Playback Progress Aggregator: played-range coverage, milestone crossings, heatmap export.
// Milestones fire at most once per session; the periodic check pauses while seeking.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MilestoneSettings;
use crate::events::PlayerEvent;
use crate::time_source::TimeSource;
use crate::timer::Timer;
use crate::types::{PlayedRange, Seconds};

/// Unrounded coverage in [0, 100]. 0 when the duration is unknown or zero.
pub fn coverage(ranges: &[PlayedRange], duration: Option<Seconds>) -> f64 {
    let Some(duration) = duration.filter(|d| d.is_usable_duration()) else {
        return 0.0;
    };

    let played: f64 = ranges.iter().map(PlayedRange::length).sum();
    (played / duration.as_f64() * 100.0).clamp(0.0, 100.0)
}

/// Coverage rounded to the nearest whole percent.
pub fn percentage_played(ranges: &[PlayedRange], duration: Option<Seconds>) -> u8 {
    coverage(ranges, duration).round() as u8
}

/// Played ranges plus total duration, as consumed by the heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapExport {
    pub ranges: Vec<PlayedRange>,
    pub total_duration: Seconds,
}

/// Per-session milestone bookkeeping.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    settings: MilestoneSettings,
    interval_ms: u32,
    /// Thresholds already emitted. Only grows within a session.
    emitted: BTreeSet<u8>,
    play_started: bool,
    playing: bool,
    seeking: bool,
    cadence: Timer,
}

impl ProgressAggregator {
    pub fn new(settings: MilestoneSettings, interval_ms: u32) -> Self {
        ProgressAggregator {
            settings,
            interval_ms,
            emitted: BTreeSet::new(),
            play_started: false,
            playing: false,
            seeking: false,
            cadence: Timer::new(),
        }
    }

    pub fn milestones(&self) -> &BTreeSet<u8> {
        &self.emitted
    }

    pub fn is_checking(&self) -> bool {
        self.cadence.is_armed()
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// Playback started or resumed. The first start of a session reports the 0% milestone.
    pub fn on_play(&mut self, now_ms: f64) -> Vec<PlayerEvent> {
        self.playing = true;
        if !self.seeking {
            self.cadence.arm(now_ms, self.interval_ms);
        }

        if self.play_started {
            Vec::new()
        } else {
            self.play_started = true;
            vec![PlayerEvent::PlayStarted]
        }
    }

    pub fn on_pause(&mut self) {
        self.playing = false;
        self.cadence.clear();
    }

    pub fn on_seeking(&mut self) {
        self.seeking = true;
        self.cadence.clear();
    }

    /// Seek finished; resume the cadence only if playback is actually running.
    pub fn on_seeked<T: TimeSource + ?Sized>(&mut self, now_ms: f64, time: &T) {
        self.seeking = false;
        self.playing = !time.is_paused();
        if self.playing {
            self.cadence.arm(now_ms, self.interval_ms);
        }
    }

    /// Playback ended: completion fires if nearly everything was watched.
    pub fn on_ended<T: TimeSource + ?Sized>(&mut self, time: &T) -> Vec<PlayerEvent> {
        self.playing = false;
        self.cadence.clear();

        let covered = coverage(time.played_ranges(), time.duration());
        if covered >= self.settings.completion_coverage && self.emitted.insert(100) {
            vec![PlayerEvent::Complete]
        } else {
            Vec::new()
        }
    }

    /// Periodic check, driven by the player's clock signal.
    pub fn on_clock<T: TimeSource + ?Sized>(&mut self, now_ms: f64, time: &T) -> Vec<PlayerEvent> {
        if !self.cadence.fire_if_due(now_ms) {
            return Vec::new();
        }
        if !self.playing || self.seeking {
            return Vec::new();
        }

        self.cadence.arm(now_ms, self.interval_ms);
        self.check(time)
    }

    /// Emit every configured threshold reached and not yet emitted.
    pub fn check<T: TimeSource + ?Sized>(&mut self, time: &T) -> Vec<PlayerEvent> {
        let percent = percentage_played(time.played_ranges(), time.duration());
        let mut events = Vec::new();

        for &threshold in &self.settings.thresholds {
            if percent >= threshold && self.emitted.insert(threshold) {
                debug!(threshold, percent, "milestone reached");
                events.push(if threshold >= 100 {
                    PlayerEvent::Complete
                } else {
                    PlayerEvent::Progress { percent: threshold }
                });
            }
        }

        events
    }

    /// Snapshot for the heatmap. Same input, same output.
    pub fn export_ranges<T: TimeSource + ?Sized>(&self, time: &T) -> HeatmapExport {
        HeatmapExport {
            ranges: time.played_ranges().to_vec(),
            total_duration: time.duration().unwrap_or(Seconds::ZERO),
        }
    }

    /// Stop the cadence (disposal).
    pub fn stop(&mut self) {
        self.playing = false;
        self.seeking = false;
        self.cadence.clear();
    }

    /// New viewing session.
    pub fn reset(&mut self) {
        self.stop();
        self.emitted.clear();
        self.play_started = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_source::MediaSnapshot;
    use proptest::prelude::*;

    fn aggregator() -> ProgressAggregator {
        ProgressAggregator::new(MilestoneSettings::default(), 2_500)
    }

    fn played(ranges: &[(f64, f64)], duration: f64) -> MediaSnapshot {
        MediaSnapshot::new(0.0, Some(duration))
            .playing()
            .with_played(ranges)
    }

    #[test]
    fn percentage_examples() {
        let media = played(&[(0.0, 30.0), (40.0, 70.0)], 100.0);
        assert_eq!(percentage_played(media.played_ranges(), media.duration()), 60);

        assert_eq!(percentage_played(&[], Some(Seconds::new(100.0))), 0);
        assert_eq!(
            percentage_played(&[PlayedRange::from((0.0, 10.0))], Some(Seconds::ZERO)),
            0
        );
        assert_eq!(percentage_played(&[PlayedRange::from((0.0, 10.0))], None), 0);

        // Overlap-accounting quirks clamp to 100.
        let over = [PlayedRange::from((0.0, 80.0)), PlayedRange::from((20.0, 100.0))];
        assert_eq!(percentage_played(&over, Some(Seconds::new(100.0))), 100);
    }

    #[test]
    fn sixty_percent_emits_25_and_50() {
        let mut progress = aggregator();
        let events = progress.check(&played(&[(0.0, 30.0), (40.0, 70.0)], 100.0));
        assert_eq!(
            events,
            vec![
                PlayerEvent::Progress { percent: 25 },
                PlayerEvent::Progress { percent: 50 },
            ]
        );
        assert_eq!(progress.milestones().iter().copied().collect::<Vec<_>>(), vec![25, 50]);

        // Nothing new: nothing emitted.
        assert!(progress.check(&played(&[(0.0, 30.0), (40.0, 70.0)], 100.0)).is_empty());
    }

    #[test]
    fn jump_past_several_thresholds_emits_each_once() {
        let mut progress = aggregator();
        let events = progress.check(&played(&[(0.0, 80.0)], 100.0));
        assert_eq!(events.len(), 3);

        let events = progress.check(&played(&[(0.0, 100.0)], 100.0));
        assert_eq!(events, vec![PlayerEvent::Complete]);
    }

    #[test]
    fn play_started_fires_once() {
        let mut progress = aggregator();
        assert_eq!(progress.on_play(0.0), vec![PlayerEvent::PlayStarted]);
        progress.on_pause();
        assert!(progress.on_play(5_000.0).is_empty());
    }

    #[test]
    fn cadence_runs_while_playing() {
        let mut progress = aggregator();
        let media = played(&[(0.0, 30.0)], 100.0);
        progress.on_play(0.0);

        assert!(progress.on_clock(1_000.0, &media).is_empty());
        assert_eq!(
            progress.on_clock(2_500.0, &media),
            vec![PlayerEvent::Progress { percent: 25 }]
        );
        assert!(progress.is_checking());

        progress.on_pause();
        assert!(!progress.is_checking());
        assert!(progress.on_clock(10_000.0, &played(&[(0.0, 60.0)], 100.0)).is_empty());
    }

    #[test]
    fn seeking_suspends_cadence() {
        let mut progress = aggregator();
        progress.on_play(0.0);
        progress.on_seeking();
        assert!(!progress.is_checking());
        assert!(progress.on_clock(5_000.0, &played(&[(0.0, 60.0)], 100.0)).is_empty());

        // Seek completes while paused: stays off.
        progress.on_seeked(5_000.0, &MediaSnapshot::new(60.0, Some(100.0)));
        assert!(!progress.is_checking());

        // Seek completes while playing: back on.
        progress.on_seeking();
        progress.on_seeked(6_000.0, &played(&[(0.0, 60.0)], 100.0));
        assert!(progress.is_checking());
        assert_eq!(progress.on_clock(8_500.0, &played(&[(0.0, 60.0)], 100.0)).len(), 2);
    }

    #[test]
    fn ended_requires_near_full_coverage() {
        let mut progress = aggregator();
        assert!(progress.on_ended(&played(&[(0.0, 98.0)], 100.0)).is_empty());

        let mut progress = aggregator();
        assert_eq!(
            progress.on_ended(&played(&[(0.0, 99.2)], 100.0)),
            vec![PlayerEvent::Complete]
        );
        assert!(progress.on_ended(&played(&[(0.0, 100.0)], 100.0)).is_empty());
        assert!(progress.check(&played(&[(0.0, 100.0)], 100.0)).iter().all(|e| *e != PlayerEvent::Complete));
    }

    #[test]
    fn export_is_idempotent() {
        let progress = aggregator();
        let media = played(&[(0.0, 12.0), (20.0, 25.0)], 60.0);
        let first = progress.export_ranges(&media);
        assert_eq!(first, progress.export_ranges(&media));
        assert_eq!(first.total_duration, Seconds::new(60.0));
        assert_eq!(first.ranges.len(), 2);
    }

    #[test]
    fn reset_starts_new_session() {
        let mut progress = aggregator();
        progress.on_play(0.0);
        progress.check(&played(&[(0.0, 60.0)], 100.0));
        progress.reset();

        assert!(progress.milestones().is_empty());
        assert!(!progress.is_checking());
        assert_eq!(progress.on_play(0.0), vec![PlayerEvent::PlayStarted]);
    }

    /// Strategy: a growing sequence of played prefixes, the way the media element reports them.
    fn growing_ranges() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..=100.0, 1..30).prop_map(|mut ends| {
            ends.sort_by(|a, b| a.partial_cmp(b).unwrap());
            ends
        })
    }

    proptest! {
        #[test]
        fn percentage_is_bounded(
            ranges in prop::collection::vec((0.0f64..500.0, 0.0f64..500.0), 0..10),
            duration in prop_oneof![Just(0.0f64), 0.0f64..1000.0],
        ) {
            let ranges: Vec<PlayedRange> = ranges.into_iter().map(PlayedRange::from).collect();
            let pct = percentage_played(&ranges, Some(Seconds::new(duration)));
            prop_assert!(pct <= 100);
            if duration == 0.0 {
                prop_assert_eq!(pct, 0);
            }
        }

        #[test]
        fn milestones_are_monotone_and_unique(ends in growing_ranges()) {
            let mut progress = aggregator();
            let mut previous = BTreeSet::new();
            let mut emitted: Vec<PlayerEvent> = Vec::new();

            for end in ends {
                emitted.extend(progress.check(&played(&[(0.0, end)], 100.0)));
                prop_assert!(previous.is_subset(progress.milestones()));
                previous = progress.milestones().clone();
            }

            for threshold in [25u8, 50, 75] {
                let count = emitted
                    .iter()
                    .filter(|e| **e == PlayerEvent::Progress { percent: threshold })
                    .count();
                prop_assert!(count <= 1);
            }
            prop_assert!(emitted.iter().filter(|e| **e == PlayerEvent::Complete).count() <= 1);
        }
    }
}
