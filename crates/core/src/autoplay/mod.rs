//! Scripted player that synthesizes perfectly timed input.

use std::collections::HashSet;

use crate::{
    config::AutoplayConfig,
    deferred::{DeferredAction, DeferredQueue},
    Cell, GridModel, JudgmentEngine, Note, NoteKind,
};

/// Neighbor probe order when escaping a Block: right, left, down, up.
const ESCAPE_OFFSETS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

#[derive(Debug, Clone)]
pub struct AutoplayAgent {
    grid: GridModel,
    lookahead_ms: f64,
    avoidance_window_ms: f64,
    start_pos: (f32, f32),
    start_time: f64,
    target_pos: (f32, f32),
    target_time: f64,
    target_cell: Cell,
    scheduled_taps: HashSet<usize>,
    pending_taps: u32,
    synthetic_taps: u32,
}

impl AutoplayAgent {
    pub fn new(grid: GridModel, config: &AutoplayConfig) -> Self {
        let origin = (0.0, 0.0);
        Self {
            grid,
            lookahead_ms: config.lookahead_ms,
            avoidance_window_ms: config.avoidance_window_ms,
            start_pos: origin,
            start_time: 0.0,
            target_pos: origin,
            target_time: 0.0,
            target_cell: grid.local_to_cell(origin.0, origin.1),
            scheduled_taps: HashSet::new(),
            pending_taps: 0,
            synthetic_taps: 0,
        }
    }

    /// Cursor position in center-origin coordinates.
    pub fn position_at(&self, now_ms: f64) -> (f32, f32) {
        interpolate(
            (self.start_pos, self.start_time),
            (self.target_pos, self.target_time),
            now_ms,
        )
    }

    pub fn target_cell(&self) -> Cell {
        self.target_cell
    }

    /// Taps that were already due when scheduled. Delivered on the next tick.
    pub fn take_pending_taps(&mut self) -> u32 {
        std::mem::take(&mut self.pending_taps)
    }

    /// Total synthetic taps this agent has ever issued.
    pub fn synthetic_taps(&self) -> u32 {
        self.synthetic_taps
    }

    /// Picks the next note, steers toward it and schedules its tap.
    pub fn update(
        &mut self,
        now_ms: f64,
        notes: &[Note],
        engine: &JudgmentEngine,
        deferred: &mut DeferredQueue<DeferredAction>,
    ) {
        let here = self.position_at(now_ms);
        let current_cell = self.grid.local_to_cell(here.0, here.1);
        let target = self.select_target(now_ms, notes, engine);

        // Without a target the cursor stays put indefinitely.
        let (desired_cell, desired_time) = match target {
            Some(index) => (notes[index].cell, notes[index].time_stamp),
            None => (current_cell, f64::INFINITY),
        };

        let danger_here = self.danger_time(current_cell, now_ms, f64::INFINITY, notes, engine);
        // A Block striking the target only matters if it lands before we do;
        // later strikes are dodged once the cursor is there.
        let desired_safe = self
            .danger_time(desired_cell, now_ms, desired_time, notes, engine)
            .is_none();

        match (danger_here, desired_safe) {
            (None, true) => {
                if target.is_some() {
                    let arrive_ms = desired_time.max(now_ms);
                    if self.crosses_block(now_ms, here, desired_cell, arrive_ms, notes, engine) {
                        // Let the Block on the way strike first, then go.
                        self.hold(now_ms, here);
                    } else {
                        self.steer(now_ms, here, desired_cell, arrive_ms);
                    }
                }
            }
            // Wait where we are until the Block on the target cell passes.
            (None, false) => self.hold(now_ms, here),
            // Leave before the Block strikes.
            (Some(strike), true) => {
                self.steer(now_ms, here, desired_cell, desired_time.min(strike));
            }
            (Some(strike), false) => {
                let escape = ESCAPE_OFFSETS
                    .iter()
                    .map(|&(d_col, d_row)| self.grid.offset_cell(current_cell, d_col, d_row))
                    .find(|&cell| {
                        cell != current_cell
                            && self
                                .danger_time(cell, now_ms, f64::INFINITY, notes, engine)
                                .is_none()
                    });
                match escape {
                    Some(cell) => {
                        tracing::debug!(?cell, "autoplay dodging a block");
                        self.steer(now_ms, here, cell, strike);
                    }
                    None => self.steer(now_ms, here, desired_cell, desired_time),
                }
            }
        }

        if let Some(index) = target {
            let note = &notes[index];
            if note.kind == NoteKind::Tap && self.scheduled_taps.insert(index) {
                self.synthetic_taps += 1;
                if note.time_stamp > now_ms {
                    deferred.schedule(note.time_stamp, DeferredAction::SyntheticTap { index });
                } else {
                    self.pending_taps += 1;
                }
            }
        }
    }

    fn select_target(&self, now_ms: f64, notes: &[Note], engine: &JudgmentEngine) -> Option<usize> {
        engine
            .queue()
            .find(|&index| notes[index].kind != NoteKind::Block)
            .or_else(|| {
                notes
                    .iter()
                    .enumerate()
                    .skip(engine.next_unqueued())
                    .take_while(|(_, note)| note.time_stamp - now_ms <= self.lookahead_ms)
                    .find(|(_, note)| note.kind != NoteKind::Block)
                    .map(|(index, _)| index)
            })
    }

    /// Earliest time, no later than `until_ms`, a queued Block inside the
    /// avoidance window strikes `cell`.
    fn danger_time(
        &self,
        cell: Cell,
        now_ms: f64,
        until_ms: f64,
        notes: &[Note],
        engine: &JudgmentEngine,
    ) -> Option<f64> {
        self.striking_blocks(now_ms, notes, engine)
            .filter(|note| note.cell == cell && note.time_stamp <= until_ms)
            .map(|note| note.time_stamp)
            .min_by(|a, b| a.total_cmp(b))
    }

    fn striking_blocks<'a>(
        &'a self,
        now_ms: f64,
        notes: &'a [Note],
        engine: &'a JudgmentEngine,
    ) -> impl Iterator<Item = &'a Note> + 'a {
        engine.queue().map(|index| &notes[index]).filter(move |note| {
            note.kind == NoteKind::Block
                && (note.time_stamp - now_ms).abs() <= self.avoidance_window_ms
        })
    }

    /// Whether the straight move from `here` to `cell` would sit on some other
    /// cell while a queued Block strikes it. A strike is judged on the first
    /// frame after its time, so the check covers one avoidance window past it.
    fn crosses_block(
        &self,
        now_ms: f64,
        here: (f32, f32),
        cell: Cell,
        arrive_ms: f64,
        notes: &[Note],
        engine: &JudgmentEngine,
    ) -> bool {
        let here_cell = self.grid.local_to_cell(here.0, here.1);
        let start = (here, now_ms);
        let end = (self.grid.cell_center_local(cell.col, cell.row), arrive_ms);

        self.striking_blocks(now_ms, notes, engine)
            .filter(|block| block.cell != cell && block.cell != here_cell)
            .any(|block| {
                let from = interpolate(start, end, block.time_stamp);
                let to = interpolate(start, end, block.time_stamp + self.avoidance_window_ms);
                self.segment_touches_cell(from, to, block.cell)
            })
    }

    /// Segment-rectangle clip in top-left coordinates.
    fn segment_touches_cell(&self, from: (f32, f32), to: (f32, f32), cell: Cell) -> bool {
        let (x0, y0) = self.grid.local_to_top_left(from.0, from.1);
        let (x1, y1) = self.grid.local_to_top_left(to.0, to.1);
        let (cell_w, cell_h) = self.grid.cell_size();
        let (min_x, min_y) = (cell.col as f32 * cell_w, cell.row as f32 * cell_h);
        let (max_x, max_y) = (min_x + cell_w, min_y + cell_h);
        let (dx, dy) = (x1 - x0, y1 - y0);

        let mut enter = 0.0_f32;
        let mut leave = 1.0_f32;
        for (p, q) in [
            (-dx, x0 - min_x),
            (dx, max_x - x0),
            (-dy, y0 - min_y),
            (dy, max_y - y0),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                enter = enter.max(r);
            } else {
                leave = leave.min(r);
            }
            if enter > leave {
                return false;
            }
        }
        true
    }

    fn steer(&mut self, now_ms: f64, here: (f32, f32), cell: Cell, arrive_ms: f64) {
        let arrive_ms = arrive_ms.max(now_ms);
        if cell == self.target_cell && arrive_ms == self.target_time {
            return;
        }
        self.start_pos = here;
        self.start_time = now_ms;
        self.target_pos = self.grid.cell_center_local(cell.col, cell.row);
        self.target_time = arrive_ms;
        self.target_cell = cell;
    }

    fn hold(&mut self, now_ms: f64, here: (f32, f32)) {
        self.start_pos = here;
        self.start_time = now_ms;
        self.target_pos = here;
        self.target_time = now_ms;
        self.target_cell = self.grid.local_to_cell(here.0, here.1);
    }
}

/// Linear move from `start` to `end`, each a position and a time; snaps to
/// the end point once its time is reached.
fn interpolate(start: ((f32, f32), f64), end: ((f32, f32), f64), at_ms: f64) -> (f32, f32) {
    let ((start_pos, start_time), (end_pos, end_time)) = (start, end);
    let span = end_time - start_time;
    if at_ms >= end_time || span <= 0.0 {
        return end_pos;
    }
    let t = ((at_ms - start_time) / span).clamp(0.0, 1.0) as f32;
    (
        start_pos.0 + (end_pos.0 - start_pos.0) * t,
        start_pos.1 + (end_pos.1 - start_pos.1) * t,
    )
}
