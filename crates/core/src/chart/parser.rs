use std::str::FromStr;

use super::{Chart, ChartEvent, Note, NoteKind};
use crate::{GridBeatError, GridModel};

/// A parsed chart plus every line that had to be skipped.
#[derive(Debug)]
pub struct ParsedChart {
    pub chart: Chart,
    pub skipped: Vec<GridBeatError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    TimingPoints,
    HitObjects,
    Ignored,
}

impl Section {
    fn from_name(name: &str) -> Self {
        match name.trim() {
            "TimingPoints" => Self::TimingPoints,
            "HitObjects" => Self::HitObjects,
            _ => Self::Ignored,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::TimingPoints => "TimingPoints",
            Self::HitObjects => "HitObjects",
            Self::Ignored => "",
        }
    }
}

/// Parses chart text. Malformed lines are logged, recorded in
/// [`ParsedChart::skipped`] and otherwise ignored.
pub fn parse_chart(text: &str, grid: &GridModel) -> ParsedChart {
    let mut section = Section::Ignored;
    let mut notes = Vec::new();
    let mut events = Vec::new();
    let mut skipped = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
            section = Section::from_name(name);
            continue;
        }

        let outcome = match section {
            Section::Ignored => continue,
            Section::TimingPoints => parse_timing_point(line).map(|event| {
                events.extend(event);
            }),
            Section::HitObjects => {
                let ordinal = notes.len() as u32 + 1;
                parse_hit_object(line, grid, ordinal).map(|note| notes.push(note))
            }
        };

        if let Err(reason) = outcome {
            let line_number = index + 1;
            tracing::warn!(
                line = line_number,
                section = section.name(),
                %reason,
                "skipping malformed chart line"
            );
            skipped.push(GridBeatError::ChartLine {
                line: line_number,
                section: section.name().to_string(),
                reason,
            });
        }
    }

    ParsedChart {
        chart: Chart::new(notes, events),
        skipped,
    }
}

/// `time,beatLength,meter,sampleSet,sampleIndex,volume,uninherited,effects`.
/// Only uninherited lines produce an event.
fn parse_timing_point(line: &str) -> Result<Option<ChartEvent>, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 7 {
        return Err(format!("expected at least 7 fields, found {}", fields.len()));
    }

    let time: f64 = field(&fields, 0, "time")?;
    if !time.is_finite() {
        return Err(format!("time `{}` is not finite", fields[0]));
    }
    if fields[6] != "1" {
        return Ok(None);
    }

    let beat_length: f64 = field(&fields, 1, "beat length")?;
    if !beat_length.is_finite() {
        return Err(format!("beat length `{}` is not finite", fields[1]));
    }
    Ok(Some(ChartEvent::bpm(time, fields[1])))
}

/// `x,y,time,unused,typeBitmask[,...]`.
fn parse_hit_object(line: &str, grid: &GridModel, ordinal: u32) -> Result<Note, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(format!("expected at least 5 fields, found {}", fields.len()));
    }

    let x: f32 = field(&fields, 0, "x")?;
    let y: f32 = field(&fields, 1, "y")?;
    let time_stamp: f64 = field(&fields, 2, "time")?;
    let bits: u32 = field(&fields, 4, "type")?;

    if !(time_stamp.is_finite() && time_stamp >= 0.0) {
        return Err(format!("time `{}` must be a non-negative number", fields[2]));
    }

    Ok(Note {
        time_stamp,
        cell: grid.top_left_to_cell(x, y),
        ordinal,
        kind: NoteKind::from_type_bits(bits),
    })
}

fn field<T: FromStr>(fields: &[&str], index: usize, name: &str) -> Result<T, String> {
    let raw = fields
        .get(index)
        .ok_or_else(|| format!("missing {name} field"))?;
    raw.parse()
        .map_err(|_| format!("invalid {name} `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cell;

    const CHART: &str = "\
[General]
AudioFilename: track.mp3

[TimingPoints]
0,500,4,1,0,100,1,0
2000,-50,4,1,0,100,0,0
4000,400,4,1,0,100,1,0

[Metadata]
Title: 1,2,3,4,5

[HitObjects]
100,50,3000,0,1
500,380,1000,0,2
256,192,2000,0,4
256,192,2000,0,5
";

    fn grid() -> GridModel {
        GridModel::new(4, 3, 512.0, 384.0).unwrap()
    }

    #[test]
    fn parses_sections_and_ignores_others() {
        let parsed = parse_chart(CHART, &grid());
        assert!(parsed.skipped.is_empty(), "{:?}", parsed.skipped);

        let events = parsed.chart.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].payload, "500");
        assert_eq!(events[1].time_stamp, 4000.0);

        let notes = parsed.chart.notes();
        assert_eq!(notes.len(), 4);
    }

    #[test]
    fn notes_come_out_time_sorted_with_file_ordinals() {
        let parsed = parse_chart(CHART, &grid());
        let summary: Vec<(f64, u32, NoteKind)> = parsed
            .chart
            .notes()
            .iter()
            .map(|n| (n.time_stamp, n.ordinal, n.kind))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1000.0, 2, NoteKind::Drag),
                (2000.0, 3, NoteKind::Block),
                (2000.0, 4, NoteKind::Block),
                (3000.0, 1, NoteKind::Tap),
            ]
        );
    }

    #[test]
    fn quantizes_positions_to_cells() {
        let parsed = parse_chart(CHART, &grid());
        let notes = parsed.chart.notes();
        assert_eq!(notes[0].cell, Cell::new(3, 2));
        assert_eq!(notes[1].cell, Cell::new(2, 1));
        assert_eq!(notes[3].cell, Cell::new(0, 0));
    }

    #[test]
    fn skips_malformed_lines_and_keeps_going() {
        let text = "\
[TimingPoints]
0,500
abc,500,4,1,0,100,1,0
[HitObjects]
1,2,3
10,10,oops,0,1
10,10,-5,0,1
10,10,100,0,1
";
        let parsed = parse_chart(text, &grid());
        assert_eq!(parsed.skipped.len(), 5);
        assert!(parsed.chart.events().is_empty());

        let notes = parsed.chart.notes();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].ordinal, 1);

        match &parsed.skipped[3] {
            GridBeatError::ChartLine { line, section, reason } => {
                assert_eq!(*line, 6);
                assert_eq!(section, "HitObjects");
                assert!(reason.contains("oops"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let text = "[HitObjects]\r\n10,10,100,0,2\r\n";
        let parsed = parse_chart(text, &grid());
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.chart.notes()[0].kind, NoteKind::Drag);
    }
}
