//! Visual beat clock.
//!
//! The clock never sleeps or spawns anything. The event loop asks how long it
//! may block ([`BeatClock::time_until_next_tick`]) and then calls
//! [`BeatClock::tick`] with the current instant. Every state change takes the
//! instant explicitly so the timing rules can be tested without waiting.

use std::time::{Duration, Instant};

use crate::models::clamp_tempo;

/// Whether the beat indicator is advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
}

/// Length of one beat at `tempo` BPM (`60000 / tempo` ms).
pub fn beat_interval(tempo: i64) -> Duration {
    let tempo = clamp_tempo(tempo) as u64;
    Duration::from_nanos(60_000_000_000 / tempo)
}

/// Two-phase beat indicator driven by a deadline.
#[derive(Debug, Clone)]
pub struct BeatClock {
    state: ClockState,
    interval: Duration,
    /// Deadline of the pending tick. `None` whenever the clock is stopped, so a
    /// stop always cancels the tick that was about to fire.
    next_tick: Option<Instant>,
    /// Visible phase, 1 or 2.
    beat: u8,
}

impl BeatClock {
    pub fn new(tempo: i64) -> Self {
        Self {
            state: ClockState::Stopped,
            interval: beat_interval(tempo),
            next_tick: None,
            beat: 1,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn beat(&self) -> u8 {
        self.beat
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Begin ticking; the first flip happens one interval after `now`.
    /// Starting a running clock changes nothing.
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            return;
        }
        self.state = ClockState::Running;
        self.next_tick = Some(now + self.interval);
    }

    /// Stop and drop the pending tick. The visible beat keeps its value.
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.next_tick = None;
    }

    /// Recompute the interval. While running, the next tick is re-armed a full
    /// new interval after `now`.
    pub fn set_tempo(&mut self, tempo: i64, now: Instant) {
        self.interval = beat_interval(tempo);
        if self.is_running() {
            self.next_tick = Some(now + self.interval);
        }
    }

    /// Flip the beat if the pending deadline has passed. At most one flip per
    /// call; a loop that fell behind is re-anchored to `now` instead of
    /// replaying the ticks it missed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_tick else {
            return false;
        };
        if now < due {
            return false;
        }

        self.beat = if self.beat == 1 { 2 } else { 1 };
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_tick = Some(next);
        true
    }

    /// Time left before the pending tick, or `None` when stopped.
    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.next_tick
            .map(|due| due.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn interval_follows_tempo() {
        assert_eq!(beat_interval(120), Duration::from_millis(500));
        assert_eq!(beat_interval(60), Duration::from_millis(1000));
        assert_eq!(beat_interval(240), Duration::from_millis(250));
        assert_eq!(beat_interval(10), Duration::from_millis(2000));
    }

    #[test]
    fn stopped_clock_never_ticks() {
        let t0 = Instant::now();
        let mut clock = BeatClock::new(120);

        assert!(!clock.tick(t0 + 10_000 * MS));
        assert_eq!(clock.beat(), 1);
        assert_eq!(clock.time_until_next_tick(t0), None);
    }

    #[test]
    fn running_clock_alternates_beats() {
        let t0 = Instant::now();
        let mut clock = BeatClock::new(120);
        clock.start(t0);

        assert!(!clock.tick(t0 + 499 * MS));
        assert!(clock.tick(t0 + 500 * MS));
        assert_eq!(clock.beat(), 2);
        assert!(!clock.tick(t0 + 700 * MS));
        assert!(clock.tick(t0 + 1000 * MS));
        assert_eq!(clock.beat(), 1);
    }

    #[test]
    fn tempo_change_while_running_rearms_without_double_fire() {
        let t0 = Instant::now();
        let mut clock = BeatClock::new(120);
        clock.start(t0);
        assert_eq!(clock.interval(), 500 * MS);

        clock.set_tempo(60, t0 + 400 * MS);
        assert_eq!(clock.interval(), 1000 * MS);
        assert_eq!(clock.time_until_next_tick(t0 + 400 * MS), Some(1000 * MS));

        assert!(!clock.tick(t0 + 500 * MS));
        assert!(!clock.tick(t0 + 1399 * MS));
        assert!(clock.tick(t0 + 1400 * MS));
        assert!(!clock.tick(t0 + 1400 * MS));
        assert_eq!(clock.beat(), 2);
    }

    #[test]
    fn stop_cancels_pending_tick() {
        let t0 = Instant::now();
        let mut clock = BeatClock::new(120);
        clock.start(t0);
        clock.stop();

        assert!(!clock.tick(t0 + 600 * MS));

        clock.set_tempo(60, t0 + 600 * MS);
        clock.start(t0 + 700 * MS);
        assert!(!clock.tick(t0 + 1200 * MS));
        assert!(clock.tick(t0 + 1700 * MS));
    }

    #[test]
    fn stop_leaves_visible_beat() {
        let t0 = Instant::now();
        let mut clock = BeatClock::new(120);
        clock.start(t0);
        clock.tick(t0 + 500 * MS);
        clock.stop();
        assert_eq!(clock.beat(), 2);
        assert_eq!(clock.state(), ClockState::Stopped);
    }

    #[test]
    fn late_tick_fires_once_and_reanchors() {
        let t0 = Instant::now();
        let mut clock = BeatClock::new(120);
        clock.start(t0);

        assert!(clock.tick(t0 + 2600 * MS));
        assert!(!clock.tick(t0 + 2700 * MS));
        assert_eq!(clock.time_until_next_tick(t0 + 2600 * MS), Some(500 * MS));
    }

    #[test]
    fn start_twice_keeps_deadline() {
        let t0 = Instant::now();
        let mut clock = BeatClock::new(120);
        clock.start(t0);
        clock.start(t0 + 300 * MS);
        assert!(clock.tick(t0 + 500 * MS));
    }
}
