//! Chart model, text parser and writer.
//!
//! A [`Chart`] is always time-ordered: its constructor sorts notes and events
//! stably by time stamp, so schedulers can walk it with a forward pointer.

mod parser;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Cell, GridBeatError, GridModel, Result};

pub use parser::{parse_chart, ParsedChart};

/// Extra time after the last note covered by the final barline segment.
pub const CHART_TAIL_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    Tap,
    Drag,
    /// Anti-note: the player must keep the cursor out of its cell.
    Block,
}

impl NoteKind {
    /// Decodes a chart type bitmask. Bit value 4 wins over 2; anything else
    /// (including 1 and 0) is a Tap. Bits above 2 are ignored.
    pub fn from_type_bits(bits: u32) -> Self {
        if bits & 0b100 != 0 {
            Self::Block
        } else if bits & 0b010 != 0 {
            Self::Drag
        } else {
            Self::Tap
        }
    }

    pub fn type_bits(self) -> u32 {
        match self {
            Self::Tap => 1,
            Self::Drag => 2,
            Self::Block => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Judgment-target instant in milliseconds.
    pub time_stamp: f64,
    pub cell: Cell,
    /// 1-based file position, only used for display layering.
    pub ordinal: u32,
    pub kind: NoteKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Bpm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEvent {
    pub time_stamp: f64,
    pub kind: EventKind,
    /// Kept as text; for bpm events this is the beat length in milliseconds.
    pub payload: String,
}

impl ChartEvent {
    pub fn bpm(time_stamp: f64, beat_length_ms: impl Into<String>) -> Self {
        Self {
            time_stamp,
            kind: EventKind::Bpm,
            payload: beat_length_ms.into(),
        }
    }

    pub fn beat_length_ms(&self) -> Option<f64> {
        match self.kind {
            EventKind::Bpm => self
                .payload
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    notes: Vec<Note>,
    events: Vec<ChartEvent>,
}

impl Chart {
    pub fn new(mut notes: Vec<Note>, mut events: Vec<ChartEvent>) -> Self {
        notes.sort_by(|a, b| a.time_stamp.total_cmp(&b.time_stamp));
        events.sort_by(|a, b| a.time_stamp.total_cmp(&b.time_stamp));
        Self { notes, events }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn events(&self) -> &[ChartEvent] {
        &self.events
    }

    pub fn bpm_events(&self) -> impl Iterator<Item = &ChartEvent> {
        self.events
            .iter()
            .filter(|event| event.kind == EventKind::Bpm)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn last_note_time(&self) -> Option<f64> {
        self.notes.last().map(|note| note.time_stamp)
    }

    pub fn count_of(&self, kind: NoteKind) -> usize {
        self.notes.iter().filter(|note| note.kind == kind).count()
    }

    /// Serialises the chart back into the text format [`parse_chart`] reads.
    /// Notes are written at the pixel center of their cell.
    pub fn to_text(&self, grid: &GridModel) -> String {
        let mut out = String::new();
        out.push_str("[General]\n");
        out.push_str("AudioFilename: track.mp3\n");
        out.push_str("AudioLeadIn: 0\n\n");

        out.push_str("[TimingPoints]\n");
        for event in self.bpm_events() {
            out.push_str(&format!(
                "{},{},4,1,0,100,1,0\n",
                event.time_stamp,
                event.payload.trim()
            ));
        }
        out.push('\n');

        out.push_str("[HitObjects]\n");
        for note in &self.notes {
            let (x, y) = grid.cell_center_top_left(note.cell.col, note.cell.row);
            out.push_str(&format!(
                "{x:.0},{y:.0},{},0,{}\n",
                note.time_stamp,
                note.kind.type_bits()
            ));
        }
        out
    }
}

/// Reads and parses a chart file. A file that does not exist is reported as
/// [`GridBeatError::MissingResource`].
pub fn load(path: impl AsRef<Path>, grid: &GridModel) -> Result<ParsedChart> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(GridBeatError::MissingResource {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)?;
    let parsed = parse_chart(&text, grid);
    tracing::info!(
        path = %path.display(),
        notes = parsed.chart.notes().len(),
        events = parsed.chart.events().len(),
        skipped = parsed.skipped.len(),
        "loaded chart"
    );
    Ok(parsed)
}

/// Like [`load`], but any failure degrades to an empty chart with a warning.
pub fn load_or_empty(path: impl AsRef<Path>, grid: &GridModel) -> Chart {
    match load(path.as_ref(), grid) {
        Ok(parsed) => parsed.chart,
        Err(err) => {
            tracing::warn!(%err, "falling back to an empty chart");
            Chart::empty()
        }
    }
}
