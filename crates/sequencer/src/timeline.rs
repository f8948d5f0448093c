use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::SequencerError;

pub const SECONDS_PER_BEAT: u32 = 30;
pub const MAX_DURATION_SECONDS: u32 = 180;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineConfig {
    pub seconds_per_beat: u32,
    pub max_duration: u32,
    pub tick_interval: Duration,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            seconds_per_beat: SECONDS_PER_BEAT,
            max_duration: MAX_DURATION_SECONDS,
            tick_interval: TICK_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Beat<P> {
    pub index: usize,
    pub offset_seconds: u32,
    pub title: String,
    pub payload: P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlaybackState {
    pub current_beat_index: usize,
    pub elapsed_seconds: u32,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineEvent {
    Started { elapsed_seconds: u32 },
    Paused { elapsed_seconds: u32 },
    Ticked { elapsed_seconds: u32 },
    BeatChanged { from: usize, to: usize },
    Finished { elapsed_seconds: u32 },
}

/// Playback over a fixed list of beats.
///
/// Pure state: every operation mutates in place and reports what changed.
/// Timers live in [`crate::PlaybackDriver`].
#[derive(Debug, Clone)]
pub struct Timeline<P> {
    config: TimelineConfig,
    beats: Vec<Beat<P>>,
    state: PlaybackState,
}

impl<P> Timeline<P> {
    pub fn new<T: Into<String>>(
        config: TimelineConfig,
        steps: impl IntoIterator<Item = (T, P)>,
    ) -> Result<Self, SequencerError> {
        if config.seconds_per_beat == 0 {
            return Err(SequencerError::ZeroBeatLength);
        }
        if config.max_duration == 0 {
            return Err(SequencerError::ZeroDuration);
        }
        // every beat must start within the playable range
        let beats = steps
            .into_iter()
            .enumerate()
            .map(|(index, (title, payload))| {
                let offset_seconds = u32::try_from(index)
                    .ok()
                    .and_then(|i| i.checked_mul(config.seconds_per_beat))
                    .filter(|offset| *offset <= config.max_duration)
                    .ok_or(SequencerError::BeatPastEnd { index })?;
                Ok(Beat {
                    index,
                    offset_seconds,
                    title: title.into(),
                    payload,
                })
            })
            .collect::<Result<Vec<_>, SequencerError>>()?;
        if beats.is_empty() {
            return Err(SequencerError::EmptyTimeline);
        }
        Ok(Self {
            config,
            beats,
            state: PlaybackState::default(),
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn beats(&self) -> &[Beat<P>] {
        &self.beats
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_beat(&self) -> &Beat<P> {
        &self.beats[self.state.current_beat_index]
    }

    pub fn beat_count(&self) -> usize {
        self.beats.len()
    }

    pub fn beat_index_for(&self, elapsed_seconds: u32) -> usize {
        let index = (elapsed_seconds / self.config.seconds_per_beat) as usize;
        index.min(self.beats.len() - 1)
    }

    pub fn is_at_end(&self) -> bool {
        self.state.elapsed_seconds >= self.config.max_duration
    }

    /// Share of the maximum duration already played, `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        f64::from(self.state.elapsed_seconds.min(self.config.max_duration))
            / f64::from(self.config.max_duration)
    }

    pub fn start(&mut self) -> Vec<TimelineEvent> {
        if self.state.is_playing {
            return Vec::new();
        }
        let mut events = Vec::new();
        if self.is_at_end() {
            self.state.elapsed_seconds = 0;
            self.sync_beat(&mut events);
        }
        self.state.is_playing = true;
        info!(elapsed = self.state.elapsed_seconds, "timeline started");
        events.push(TimelineEvent::Started {
            elapsed_seconds: self.state.elapsed_seconds,
        });
        events
    }

    pub fn tick(&mut self) -> Vec<TimelineEvent> {
        if !self.state.is_playing {
            return Vec::new();
        }
        let mut events = Vec::new();
        let elapsed = self.state.elapsed_seconds.saturating_add(1);
        let finished = elapsed >= self.config.max_duration;
        self.state.elapsed_seconds = elapsed.min(self.config.max_duration);
        if finished {
            self.state.is_playing = false;
        }

        self.sync_beat(&mut events);
        debug!(elapsed = self.state.elapsed_seconds, beat = self.state.current_beat_index, "tick");
        events.push(TimelineEvent::Ticked {
            elapsed_seconds: self.state.elapsed_seconds,
        });
        if finished {
            info!(elapsed = self.state.elapsed_seconds, "timeline finished");
            events.push(TimelineEvent::Finished {
                elapsed_seconds: self.state.elapsed_seconds,
            });
        }
        events
    }

    pub fn pause(&mut self) -> Vec<TimelineEvent> {
        if !self.state.is_playing {
            return Vec::new();
        }
        self.state.is_playing = false;
        info!(elapsed = self.state.elapsed_seconds, "timeline paused");
        vec![TimelineEvent::Paused {
            elapsed_seconds: self.state.elapsed_seconds,
        }]
    }

    /// Jumps to beat `n` (clamped) and rewrites elapsed to the beat's start.
    pub fn go_to_beat(&mut self, n: usize) -> Vec<TimelineEvent> {
        let target = n.min(self.beats.len() - 1);
        let from = self.state.current_beat_index;
        self.state.current_beat_index = target;
        self.state.elapsed_seconds = self.beats[target].offset_seconds;
        debug!(from, to = target, "jumped to beat");
        if from == target {
            Vec::new()
        } else {
            vec![TimelineEvent::BeatChanged { from, to: target }]
        }
    }

    /// Rewinds to the first beat and plays, whatever the current state.
    pub fn replay(&mut self) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        self.state.is_playing = false;
        self.state.elapsed_seconds = 0;
        self.sync_beat(&mut events);
        events.extend(self.start());
        events
    }

    fn sync_beat(&mut self, events: &mut Vec<TimelineEvent>) {
        let from = self.state.current_beat_index;
        let to = self.beat_index_for(self.state.elapsed_seconds);
        if from != to {
            self.state.current_beat_index = to;
            events.push(TimelineEvent::BeatChanged { from, to });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_beats() -> Timeline<()> {
        Timeline::new(
            TimelineConfig::default(),
            (0..6).map(|i| (format!("beat {i}"), ())),
        )
        .expect("timeline")
    }

    fn play_for(timeline: &mut Timeline<()>, seconds: u32) -> Vec<TimelineEvent> {
        (0..seconds).flat_map(|_| timeline.tick()).collect()
    }

    #[test]
    fn rejects_degenerate_configuration() {
        let empty: Vec<(String, ())> = Vec::new();
        assert!(matches!(
            Timeline::new(TimelineConfig::default(), empty),
            Err(SequencerError::EmptyTimeline)
        ));
        let zero = TimelineConfig {
            seconds_per_beat: 0,
            ..TimelineConfig::default()
        };
        assert!(matches!(
            Timeline::new(zero, [("a", ())]),
            Err(SequencerError::ZeroBeatLength)
        ));
    }

    #[test]
    fn rejects_beats_starting_after_the_end() {
        let short = TimelineConfig {
            max_duration: 100,
            ..TimelineConfig::default()
        };
        assert!(matches!(
            Timeline::new(short, (0..6).map(|i| (format!("beat {i}"), ()))),
            Err(SequencerError::BeatPastEnd { index: 4 })
        ));

        let huge = TimelineConfig {
            seconds_per_beat: u32::MAX,
            max_duration: u32::MAX,
            ..TimelineConfig::default()
        };
        assert!(matches!(
            Timeline::new(huge, [("a", ()), ("b", ()), ("c", ())]),
            Err(SequencerError::BeatPastEnd { index: 2 })
        ));
    }

    #[test]
    fn go_to_last_beat_stays_within_max_duration() {
        let exact = TimelineConfig {
            max_duration: 150,
            ..TimelineConfig::default()
        };
        let mut timeline =
            Timeline::new(exact, (0..6).map(|i| (format!("beat {i}"), ()))).expect("timeline");
        timeline.go_to_beat(99);
        let state = timeline.state();
        assert_eq!(state.current_beat_index, 5);
        assert_eq!(state.elapsed_seconds, 150);
        assert!(timeline.is_at_end());
    }

    #[test]
    fn beats_are_offset_by_beat_length() {
        let timeline = six_beats();
        let offsets: Vec<u32> = timeline.beats().iter().map(|b| b.offset_seconds).collect();
        assert_eq!(offsets, vec![0, 30, 60, 90, 120, 150]);
    }

    #[test]
    fn beat_index_is_a_function_of_elapsed_for_the_whole_range() {
        let mut timeline = six_beats();
        timeline.start();
        for elapsed in 1..=MAX_DURATION_SECONDS {
            timeline.tick();
            let state = timeline.state();
            assert_eq!(state.elapsed_seconds, elapsed);
            assert_eq!(
                state.current_beat_index,
                ((elapsed / SECONDS_PER_BEAT) as usize).min(5),
                "elapsed {elapsed}"
            );
        }
    }

    #[test]
    fn elapsed_95_is_beat_3_and_180_stops_on_the_last_beat() {
        let mut timeline = six_beats();
        timeline.start();
        play_for(&mut timeline, 95);
        assert_eq!(timeline.state().current_beat_index, 3);

        let events = play_for(&mut timeline, 85);
        let state = timeline.state();
        assert_eq!(state.elapsed_seconds, 180);
        assert_eq!(state.current_beat_index, 5);
        assert!(!state.is_playing);
        assert_eq!(
            events.last(),
            Some(&TimelineEvent::Finished { elapsed_seconds: 180 })
        );

        // further ticks after finishing change nothing
        assert!(timeline.tick().is_empty());
        assert_eq!(timeline.state().elapsed_seconds, 180);
    }

    #[test]
    fn beat_change_is_reported_once_per_boundary() {
        let mut timeline = six_beats();
        timeline.start();
        let events = play_for(&mut timeline, 61);
        let changes: Vec<_> = events
            .into_iter()
            .filter(|e| matches!(e, TimelineEvent::BeatChanged { .. }))
            .collect();
        assert_eq!(
            changes,
            vec![
                TimelineEvent::BeatChanged { from: 0, to: 1 },
                TimelineEvent::BeatChanged { from: 1, to: 2 },
            ]
        );
    }

    #[test]
    fn pause_then_start_resumes_from_the_same_elapsed() {
        let mut timeline = six_beats();
        timeline.start();
        play_for(&mut timeline, 42);
        assert_eq!(
            timeline.pause(),
            vec![TimelineEvent::Paused { elapsed_seconds: 42 }]
        );
        assert!(timeline.pause().is_empty());
        assert!(timeline.tick().is_empty());

        timeline.start();
        assert_eq!(timeline.state().elapsed_seconds, 42);
        timeline.tick();
        assert_eq!(timeline.state().elapsed_seconds, 43);
    }

    #[test]
    fn start_at_max_rewinds_first() {
        let mut timeline = six_beats();
        timeline.start();
        play_for(&mut timeline, 200);
        assert!(timeline.is_at_end());

        let events = timeline.start();
        assert_eq!(
            events,
            vec![
                TimelineEvent::BeatChanged { from: 5, to: 0 },
                TimelineEvent::Started { elapsed_seconds: 0 },
            ]
        );
        assert!(timeline.state().is_playing);
    }

    #[test]
    fn starting_twice_is_a_no_op() {
        let mut timeline = six_beats();
        assert_eq!(timeline.start().len(), 1);
        assert!(timeline.start().is_empty());
    }

    #[test]
    fn go_to_beat_rewrites_elapsed_and_keeps_play_state() {
        let mut timeline = six_beats();
        for k in 0..6 {
            timeline.go_to_beat(k);
            let state = timeline.state();
            assert_eq!(state.current_beat_index, k);
            assert_eq!(state.elapsed_seconds, k as u32 * SECONDS_PER_BEAT);
            assert!(!state.is_playing);
        }

        timeline.start();
        timeline.go_to_beat(1);
        assert!(timeline.state().is_playing);

        timeline.go_to_beat(42);
        assert_eq!(timeline.state().current_beat_index, 5);
        assert_eq!(timeline.state().elapsed_seconds, 150);
    }

    #[test]
    fn replay_rewinds_and_plays_from_anywhere() {
        let mut timeline = six_beats();
        timeline.go_to_beat(3);
        timeline.replay();
        let state = timeline.state();
        assert_eq!(state.elapsed_seconds, 0);
        assert_eq!(state.current_beat_index, 0);
        assert!(state.is_playing);
        assert_eq!(timeline.progress(), 0.0);
    }
}
