mod barline;

use std::ops::Range;

use crate::{config::TimingConfig, Note};

pub use barline::derive_barlines;

/// Lifecycle of a play session's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    /// Pre-roll countdown driven by elapsed wall time.
    Starting,
    /// Driven by the audio position.
    Running,
    Paused { in_pre_roll: bool },
    Ended,
}

/// Side effects the caller must carry out after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    StartAudio,
}

/// The single time value every per-frame consumer reads.
///
/// Transitions take the clock by value and hand back the next one, so a
/// frame can never observe a half-applied transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameClock {
    state: ClockState,
    current_time_ms: f64,
    pre_roll_elapsed_ms: f64,
    wait_time_ms: f64,
    offset_ms: f64,
}

impl GameClock {
    pub fn new(wait_time_ms: f64, offset_ms: f64) -> Self {
        Self {
            state: ClockState::Idle,
            current_time_ms: offset_ms - wait_time_ms,
            pre_roll_elapsed_ms: 0.0,
            wait_time_ms,
            offset_ms,
        }
    }

    pub fn from_config(timing: &TimingConfig) -> Self {
        Self::new(timing.wait_time_ms, timing.offset_ms)
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn current_time_ms(&self) -> f64 {
        self.current_time_ms
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, ClockState::Starting | ClockState::Running)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, ClockState::Paused { .. })
    }

    pub fn is_audio_playing(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn is_ended(&self) -> bool {
        self.state == ClockState::Ended
    }

    /// Idle -> Starting. The clock begins `wait_time_ms` before zero.
    pub fn start(self) -> Self {
        if self.state != ClockState::Idle {
            tracing::debug!(state = ?self.state, "ignoring start on a clock that already started");
            return self;
        }
        tracing::debug!(wait_ms = self.wait_time_ms, "clock pre-roll started");
        Self {
            state: ClockState::Starting,
            current_time_ms: self.offset_ms - self.wait_time_ms,
            pre_roll_elapsed_ms: 0.0,
            ..self
        }
    }

    /// Advances the clock by one frame.
    ///
    /// `audio_position_ms` is only read once the pre-roll is over. Returns
    /// [`ClockSignal::StartAudio`] on the frame the pre-roll completes.
    pub fn tick(self, frame_delta_ms: f64, audio_position_ms: f64) -> (Self, Option<ClockSignal>) {
        match self.state {
            ClockState::Starting => {
                let elapsed = self.pre_roll_elapsed_ms + frame_delta_ms.max(0.0);
                if elapsed >= self.wait_time_ms {
                    tracing::debug!("clock pre-roll finished, following audio");
                    let next = Self {
                        state: ClockState::Running,
                        pre_roll_elapsed_ms: elapsed,
                        current_time_ms: self.follow_audio(audio_position_ms),
                        ..self
                    };
                    (next, Some(ClockSignal::StartAudio))
                } else {
                    let next = Self {
                        pre_roll_elapsed_ms: elapsed,
                        current_time_ms: elapsed - self.wait_time_ms + self.offset_ms,
                        ..self
                    };
                    (next, None)
                }
            }
            ClockState::Running => {
                let next = Self {
                    current_time_ms: self.follow_audio(audio_position_ms),
                    ..self
                };
                (next, None)
            }
            _ => (self, None),
        }
    }

    pub fn pause(self) -> Self {
        let in_pre_roll = match self.state {
            ClockState::Starting => true,
            ClockState::Running => false,
            _ => return self,
        };
        tracing::debug!(at_ms = self.current_time_ms, in_pre_roll, "clock paused");
        Self {
            state: ClockState::Paused { in_pre_roll },
            ..self
        }
    }

    /// Paused -> whichever phase was interrupted.
    pub fn resume(self) -> Self {
        let state = match self.state {
            ClockState::Paused { in_pre_roll: true } => ClockState::Starting,
            ClockState::Paused { in_pre_roll: false } => ClockState::Running,
            _ => return self,
        };
        tracing::debug!(at_ms = self.current_time_ms, "clock resumed");
        Self { state, ..self }
    }

    /// Any state -> Ended. Terminal.
    pub fn finish(self) -> Self {
        Self {
            state: ClockState::Ended,
            ..self
        }
    }

    // Audio APIs may report a position slightly behind the previous read;
    // the clock never runs backwards.
    fn follow_audio(&self, audio_position_ms: f64) -> f64 {
        (audio_position_ms + self.offset_ms).max(self.current_time_ms)
    }
}

/// Anything placed on the chart timeline.
pub trait Timed {
    fn time_stamp(&self) -> f64;
}

impl Timed for Note {
    fn time_stamp(&self) -> f64 {
        self.time_stamp
    }
}

impl Timed for f64 {
    fn time_stamp(&self) -> f64 {
        *self
    }
}

/// Forward-only pointer that activates items once the clock enters their
/// lookahead window. Items must be time-sorted.
#[derive(Debug, Default, Clone)]
pub struct SpawnScheduler {
    next_index: usize,
    lookahead_ms: f64,
}

impl SpawnScheduler {
    pub fn new(lookahead_ms: f64) -> Self {
        Self {
            next_index: 0,
            lookahead_ms,
        }
    }

    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Returns the indices activated during this tick.
    pub fn tick<T: Timed>(&mut self, now_ms: f64, items: &[T]) -> Range<usize> {
        let first = self.next_index;
        while let Some(item) = items.get(self.next_index) {
            if now_ms < item.time_stamp() - self.lookahead_ms {
                break;
            }
            self.next_index += 1;
        }
        first..self.next_index
    }

    pub fn is_exhausted(&self, len: usize) -> bool {
        self.next_index >= len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_roll_counts_up_from_negative_wait() {
        let clock = GameClock::new(1500.0, 20.0).start();
        assert_eq!(clock.state(), ClockState::Starting);
        assert_eq!(clock.current_time_ms(), -1480.0);

        let (clock, signal) = clock.tick(500.0, 0.0);
        assert_eq!(signal, None);
        assert_eq!(clock.current_time_ms(), -980.0);
        assert!(clock.is_playing());
        assert!(!clock.is_audio_playing());
    }

    #[test]
    fn crossing_the_wait_starts_audio() {
        let (clock, _) = GameClock::new(1000.0, 0.0).start().tick(900.0, 0.0);
        let (clock, signal) = clock.tick(200.0, 0.0);
        assert_eq!(signal, Some(ClockSignal::StartAudio));
        assert_eq!(clock.state(), ClockState::Running);
        assert_eq!(clock.current_time_ms(), 0.0);

        let (clock, signal) = clock.tick(16.0, 250.0);
        assert_eq!(signal, None);
        assert_eq!(clock.current_time_ms(), 250.0);
    }

    #[test]
    fn running_clock_never_goes_backwards() {
        let (clock, _) = GameClock::new(0.0, 0.0).start().tick(0.0, 0.0);
        let (clock, _) = clock.tick(16.0, 500.0);
        let (clock, _) = clock.tick(16.0, 490.0);
        assert_eq!(clock.current_time_ms(), 500.0);
    }

    #[test]
    fn pause_freezes_and_resume_returns_to_phase() {
        let (clock, _) = GameClock::new(1000.0, 0.0).start().tick(100.0, 0.0);
        let paused = clock.pause();
        assert!(paused.is_paused());
        assert!(!paused.is_playing());

        let (still, signal) = paused.tick(5000.0, 9999.0);
        assert_eq!(signal, None);
        assert_eq!(still.current_time_ms(), -900.0);

        let resumed = still.resume();
        assert_eq!(resumed.state(), ClockState::Starting);

        let (running, _) = resumed.tick(900.0, 0.0);
        let resumed = running.pause().resume();
        assert_eq!(resumed.state(), ClockState::Running);
    }

    #[test]
    fn invalid_transitions_are_no_ops() {
        let idle = GameClock::new(1000.0, 0.0);
        assert_eq!(idle.pause(), idle);
        assert_eq!(idle.resume(), idle);

        let ended = idle.start().finish();
        assert!(ended.is_ended());
        assert_eq!(ended.start(), ended);
        assert_eq!(ended.tick(100.0, 100.0).0, ended);
    }

    #[test]
    fn scheduler_activates_within_lookahead_once() {
        let stamps = vec![1000.0, 1200.0, 3000.0];
        let mut scheduler = SpawnScheduler::new(1000.0);

        assert_eq!(scheduler.tick(-1.0, &stamps), 0..0);
        assert_eq!(scheduler.tick(0.0, &stamps), 0..1);
        assert_eq!(scheduler.tick(0.0, &stamps), 1..1);
        assert_eq!(scheduler.tick(500.0, &stamps), 1..2);
        assert_eq!(scheduler.tick(10_000.0, &stamps), 2..3);
        assert!(scheduler.is_exhausted(stamps.len()));
        assert_eq!(scheduler.tick(20_000.0, &stamps), 3..3);
    }
}
