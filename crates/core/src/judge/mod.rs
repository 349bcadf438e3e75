//! Judgment queue state machine and scoring.

mod score;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    config::TimingConfig,
    deferred::{DeferredAction, DeferredQueue},
    Cell, Note, NoteKind, PlayEvent,
};

pub use score::{Scoreboard, MAX_GRADE_POINTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgment {
    Perfect,
    Good,
    Bad,
    Miss,
}

impl Judgment {
    pub fn points(self) -> u32 {
        match self {
            Self::Perfect => 5,
            Self::Good => 3,
            Self::Bad => 1,
            Self::Miss => 0,
        }
    }

    pub fn keeps_combo(self) -> bool {
        matches!(self, Self::Perfect | Self::Good)
    }
}

/// Timing tolerance bands in milliseconds, `perfect <= good <= bad`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingWindows {
    pub perfect_ms: f64,
    pub good_ms: f64,
    pub bad_ms: f64,
}

impl Default for TimingWindows {
    fn default() -> Self {
        Self::from_config(&TimingConfig::default())
    }
}

impl TimingWindows {
    pub fn from_config(timing: &TimingConfig) -> Self {
        Self {
            perfect_ms: timing.perfect_window_ms,
            good_ms: timing.good_window_ms,
            bad_ms: timing.bad_window_ms,
        }
    }

    /// Grades a timing difference. Edges belong to the tighter grade.
    /// Differences beyond the bad window never get here: the queue sweeps
    /// them out as misses first.
    pub fn judge(&self, delta_ms: f64) -> Judgment {
        let delta = delta_ms.abs();
        if delta <= self.perfect_ms {
            Judgment::Perfect
        } else if delta <= self.good_ms {
            Judgment::Good
        } else {
            Judgment::Bad
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteState {
    Waiting,
    Queued,
    /// Left the queue; its Perfect lands through a deferred action.
    Deferred,
    Judged,
}

/// Owns the judgment queue: indices of notes within the bad window of the
/// clock, ascending by time. Each note enters once and leaves once.
#[derive(Debug, Clone)]
pub struct JudgmentEngine {
    windows: TimingWindows,
    queue: VecDeque<usize>,
    next_unqueued: usize,
    states: Vec<NoteState>,
    faded: Vec<bool>,
    pending_drags: usize,
    scoreboard: Scoreboard,
}

impl JudgmentEngine {
    pub fn new(windows: TimingWindows, note_count: usize) -> Self {
        Self {
            windows,
            queue: VecDeque::new(),
            next_unqueued: 0,
            states: vec![NoteState::Waiting; note_count],
            faded: vec![false; note_count],
            pending_drags: 0,
            scoreboard: Scoreboard::default(),
        }
    }

    pub fn windows(&self) -> &TimingWindows {
        &self.windows
    }

    pub fn queue(&self) -> impl Iterator<Item = usize> + '_ {
        self.queue.iter().copied()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Index of the first note that has not entered the queue yet.
    pub fn next_unqueued(&self) -> usize {
        self.next_unqueued
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Whether the note has left the queue, judged or awaiting a deferred
    /// Perfect.
    pub fn is_resolved(&self, index: usize) -> bool {
        matches!(
            self.states.get(index),
            Some(NoteState::Deferred | NoteState::Judged)
        )
    }

    pub fn has_pending_judgments(&self) -> bool {
        !self.queue.is_empty() || self.pending_drags > 0
    }

    /// The play is over once the clock passed the last note and nothing is
    /// left to judge.
    pub fn is_complete(&self, now_ms: f64, notes: &[Note]) -> bool {
        let past_last = notes
            .last()
            .map_or(true, |last| now_ms >= last.time_stamp);
        past_last && self.next_unqueued >= notes.len() && !self.has_pending_judgments()
    }

    /// One judgment pass: enqueue, sweep misses, then evaluate the queue
    /// against this tick's input.
    pub fn update(
        &mut self,
        now_ms: f64,
        notes: &[Note],
        tap_count: u32,
        cursor_cell: Cell,
        deferred: &mut DeferredQueue<DeferredAction>,
        events: &mut Vec<PlayEvent>,
    ) {
        self.enqueue(now_ms, notes);
        self.sweep_missed(now_ms, notes, events);
        self.evaluate(now_ms, notes, tap_count, cursor_cell, deferred, events);
    }

    fn enqueue(&mut self, now_ms: f64, notes: &[Note]) {
        while let Some(note) = notes.get(self.next_unqueued) {
            if note.time_stamp - now_ms > self.windows.bad_ms {
                break;
            }
            self.states[self.next_unqueued] = NoteState::Queued;
            self.queue.push_back(self.next_unqueued);
            self.next_unqueued += 1;
        }
    }

    fn sweep_missed(&mut self, now_ms: f64, notes: &[Note], events: &mut Vec<PlayEvent>) {
        while let Some(&front) = self.queue.front() {
            if notes[front].time_stamp - now_ms >= -self.windows.bad_ms {
                break;
            }
            self.queue.pop_front();
            self.states[front] = NoteState::Judged;
            events.push(PlayEvent::Release { index: front });
            record(&mut self.scoreboard, events, Judgment::Miss, None, false);
        }
    }

    fn evaluate(
        &mut self,
        now_ms: f64,
        notes: &[Note],
        tap_count: u32,
        cursor_cell: Cell,
        deferred: &mut DeferredQueue<DeferredAction>,
        events: &mut Vec<PlayEvent>,
    ) {
        let mut taps_left = tap_count;

        for &index in &self.queue {
            let note = &notes[index];
            let delta = note.time_stamp - now_ms;
            let same_cell = note.cell == cursor_cell;

            if delta <= 0.0 && !self.faded[index] {
                self.faded[index] = true;
                events.push(PlayEvent::Fade { index });
            }

            let next_state = match note.kind {
                NoteKind::Tap => {
                    if taps_left == 0 || !same_cell {
                        continue;
                    }
                    taps_left -= 1;
                    let judgment = self.windows.judge(delta);
                    events.push(PlayEvent::Release { index });
                    record(&mut self.scoreboard, events, judgment, Some(index), true);
                    NoteState::Judged
                }
                NoteKind::Drag => {
                    if !same_cell || self.windows.judge(delta) == Judgment::Bad {
                        continue;
                    }
                    events.push(PlayEvent::Release { index });
                    if delta > 0.0 {
                        tracing::debug!(index, delay_ms = delta, "deferring early drag");
                        deferred.schedule(note.time_stamp, DeferredAction::ResolveDrag { index });
                        self.pending_drags += 1;
                        NoteState::Deferred
                    } else {
                        record(&mut self.scoreboard, events, Judgment::Perfect, Some(index), true);
                        NoteState::Judged
                    }
                }
                NoteKind::Block => {
                    if delta >= 0.0 {
                        continue;
                    }
                    events.push(PlayEvent::Release { index });
                    if same_cell {
                        record(&mut self.scoreboard, events, Judgment::Miss, None, false);
                        events.push(PlayEvent::Shake);
                    } else {
                        record(&mut self.scoreboard, events, Judgment::Perfect, None, false);
                    }
                    NoteState::Judged
                }
            };
            self.states[index] = next_state;
        }

        let states = &self.states;
        self.queue.retain(|&index| states[index] == NoteState::Queued);
    }

    /// Lands the Perfect of a Drag note that was reached early. Ignored for
    /// notes that are not waiting on one.
    pub fn complete_drag(&mut self, index: usize, events: &mut Vec<PlayEvent>) {
        if self.states.get(index) != Some(&NoteState::Deferred) {
            return;
        }
        self.states[index] = NoteState::Judged;
        self.pending_drags -= 1;
        record(&mut self.scoreboard, events, Judgment::Perfect, Some(index), true);
    }

    /// Forgets deferred Perfects whose actions were dropped with the session.
    pub fn cancel_pending(&mut self) {
        for state in &mut self.states {
            if *state == NoteState::Deferred {
                *state = NoteState::Judged;
            }
        }
        self.pending_drags = 0;
    }
}

fn record(
    scoreboard: &mut Scoreboard,
    events: &mut Vec<PlayEvent>,
    judgment: Judgment,
    index: Option<usize>,
    hit: bool,
) {
    scoreboard.record(judgment);
    events.push(PlayEvent::Judged {
        judgment,
        index,
        hit: hit && judgment != Judgment::Miss,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURSOR: Cell = Cell::new(1, 1);
    const ELSEWHERE: Cell = Cell::new(3, 0);

    fn note(time_stamp: f64, kind: NoteKind, cell: Cell) -> Note {
        Note {
            time_stamp,
            cell,
            ordinal: 0,
            kind,
        }
    }

    struct Harness {
        engine: JudgmentEngine,
        notes: Vec<Note>,
        deferred: DeferredQueue<DeferredAction>,
        events: Vec<PlayEvent>,
    }

    impl Harness {
        fn new(notes: Vec<Note>) -> Self {
            Self {
                engine: JudgmentEngine::new(TimingWindows::default(), notes.len()),
                notes,
                deferred: DeferredQueue::new(),
                events: Vec::new(),
            }
        }

        fn tick(&mut self, now_ms: f64, taps: u32, cursor: Cell) {
            for action in self.deferred.drain_due(now_ms) {
                if let DeferredAction::ResolveDrag { index } = action {
                    self.engine.complete_drag(index, &mut self.events);
                }
            }
            self.engine.update(
                now_ms,
                &self.notes,
                taps,
                cursor,
                &mut self.deferred,
                &mut self.events,
            );
        }

        fn judgments(&self) -> Vec<Judgment> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    PlayEvent::Judged { judgment, .. } => Some(*judgment),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn window_edges_belong_to_the_tighter_grade() {
        let windows = TimingWindows::default();
        assert_eq!(windows.judge(0.0), Judgment::Perfect);
        assert_eq!(windows.judge(60.0), Judgment::Perfect);
        assert_eq!(windows.judge(-60.0), Judgment::Perfect);
        assert_eq!(windows.judge(61.0), Judgment::Good);
        assert_eq!(windows.judge(90.0), Judgment::Good);
        assert_eq!(windows.judge(-90.0), Judgment::Good);
        assert_eq!(windows.judge(91.0), Judgment::Bad);
        assert_eq!(windows.judge(120.0), Judgment::Bad);
        assert_eq!(windows.judge(-120.0), Judgment::Bad);
    }

    #[test]
    fn enqueues_only_inside_the_bad_window() {
        let mut h = Harness::new(vec![
            note(1000.0, NoteKind::Tap, CURSOR),
            note(1200.0, NoteKind::Tap, CURSOR),
        ]);
        h.tick(879.0, 0, ELSEWHERE);
        assert_eq!(h.engine.queue_len(), 0);
        h.tick(880.0, 0, ELSEWHERE);
        assert_eq!(h.engine.queue().collect::<Vec<_>>(), vec![0]);
        assert_eq!(h.engine.next_unqueued(), 1);
    }

    #[test]
    fn tap_needs_a_tap_in_the_right_cell() {
        let mut h = Harness::new(vec![note(1000.0, NoteKind::Tap, CURSOR)]);
        h.tick(970.0, 0, CURSOR);
        h.tick(975.0, 1, ELSEWHERE);
        assert!(h.judgments().is_empty());

        h.tick(1070.0, 1, CURSOR);
        assert_eq!(h.judgments(), vec![Judgment::Good]);
        assert_eq!(h.engine.queue_len(), 0);
        assert!(h.engine.is_resolved(0));
        assert!(h.events.contains(&PlayEvent::Judged {
            judgment: Judgment::Good,
            index: Some(0),
            hit: true,
        }));
    }

    #[test]
    fn one_tap_resolves_one_note_earliest_first() {
        let mut h = Harness::new(vec![
            note(1000.0, NoteKind::Tap, CURSOR),
            note(1010.0, NoteKind::Tap, CURSOR),
            note(1020.0, NoteKind::Tap, CURSOR),
        ]);
        h.tick(1000.0, 2, CURSOR);
        assert_eq!(h.judgments(), vec![Judgment::Perfect, Judgment::Perfect]);
        assert_eq!(h.engine.queue().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn stale_notes_are_missed_exactly_once() {
        let mut h = Harness::new(vec![
            note(1000.0, NoteKind::Tap, CURSOR),
            note(1050.0, NoteKind::Drag, ELSEWHERE),
            note(5000.0, NoteKind::Tap, CURSOR),
        ]);
        h.tick(900.0, 0, ELSEWHERE);
        // Frame stall: both queued notes fall out in one pass.
        h.tick(1300.0, 0, ELSEWHERE);
        h.tick(1400.0, 3, CURSOR);
        h.tick(1500.0, 0, CURSOR);
        assert_eq!(h.judgments(), vec![Judgment::Miss, Judgment::Miss]);
        assert_eq!(h.engine.scoreboard().miss_count, 2);
        assert_eq!(h.engine.scoreboard().combo, 0);
    }

    #[test]
    fn sweep_boundary_is_strict() {
        let mut h = Harness::new(vec![note(1000.0, NoteKind::Tap, CURSOR)]);
        h.tick(1000.0, 0, ELSEWHERE);
        h.tick(1120.0, 0, ELSEWHERE);
        assert!(h.judgments().is_empty());
        h.tick(1120.0, 1, CURSOR);
        assert_eq!(h.judgments(), vec![Judgment::Bad]);
    }

    #[test]
    fn early_drag_lands_its_perfect_on_time() {
        let mut h = Harness::new(vec![note(1000.0, NoteKind::Drag, CURSOR)]);
        h.tick(930.0, 0, CURSOR);
        // 70ms early is Good, so the drag resolves now but scores later.
        assert_eq!(h.engine.queue_len(), 0);
        assert!(h.judgments().is_empty());
        assert!(h.engine.has_pending_judgments());
        assert!(!h.engine.is_complete(999.0, &h.notes));

        h.tick(999.0, 0, ELSEWHERE);
        assert!(h.judgments().is_empty());
        h.tick(1000.0, 0, ELSEWHERE);
        assert_eq!(h.judgments(), vec![Judgment::Perfect]);
        assert!(h.engine.is_complete(1000.0, &h.notes));
    }

    #[test]
    fn drag_is_not_taken_from_the_bad_band() {
        let mut h = Harness::new(vec![note(1000.0, NoteKind::Drag, CURSOR)]);
        h.tick(890.0, 0, CURSOR);
        assert_eq!(h.engine.queue_len(), 1);
        h.tick(1005.0, 0, CURSOR);
        assert_eq!(h.judgments(), vec![Judgment::Perfect]);
        assert!(h.deferred.is_empty());
    }

    #[test]
    fn block_punishes_only_a_cursor_in_its_cell() {
        let mut h = Harness::new(vec![
            note(1000.0, NoteKind::Block, CURSOR),
            note(1000.0, NoteKind::Block, ELSEWHERE),
        ]);
        h.tick(1000.0, 5, CURSOR);
        assert!(h.judgments().is_empty());

        h.tick(1001.0, 0, CURSOR);
        assert_eq!(h.judgments(), vec![Judgment::Miss, Judgment::Perfect]);
        assert_eq!(
            h.events.iter().filter(|e| **e == PlayEvent::Shake).count(),
            1
        );
        // Blocks never carry hit feedback.
        assert!(h.events.iter().all(|event| !matches!(
            event,
            PlayEvent::Judged { hit: true, .. } | PlayEvent::Judged { index: Some(_), .. }
        )));
    }

    #[test]
    fn fade_is_signalled_once_when_time_arrives() {
        let mut h = Harness::new(vec![note(1000.0, NoteKind::Tap, CURSOR)]);
        h.tick(990.0, 0, ELSEWHERE);
        h.tick(1000.0, 0, ELSEWHERE);
        h.tick(1010.0, 0, ELSEWHERE);
        let fades = h
            .events
            .iter()
            .filter(|event| matches!(event, PlayEvent::Fade { index: 0 }))
            .count();
        assert_eq!(fades, 1);
    }

    #[test]
    fn every_note_is_judged_once_under_arbitrary_ticks() {
        let notes: Vec<Note> = (0..40)
            .map(|i| {
                let kind = match i % 3 {
                    0 => NoteKind::Tap,
                    1 => NoteKind::Drag,
                    _ => NoteKind::Block,
                };
                note(500.0 + i as f64 * 37.0, kind, Cell::new(i % 4, i % 3))
            })
            .collect();
        let mut h = Harness::new(notes);

        // Small deterministic LCG for frame lengths, taps and cursor cells.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (seed >> 33) as u32
        };

        let mut now = 0.0;
        while !h.engine.is_complete(now, &h.notes) {
            now += f64::from(next() % 90);
            let cursor = Cell::new(next() % 4, next() % 3);
            h.tick(now, next() % 3, cursor);
            assert!(now < 100_000.0, "session never completed");
        }

        let board = h.engine.scoreboard();
        assert_eq!(board.judged_count(), 40);
        assert_eq!(board.reference_score, 40 * MAX_GRADE_POINTS);

        let mut released = vec![0; h.notes.len()];
        for event in &h.events {
            if let PlayEvent::Release { index } = event {
                released[*index] += 1;
            }
        }
        assert!(released.iter().all(|&count| count == 1));
    }
}
