use crate::{chart::CHART_TAIL_MS, Chart};

const BEATS_PER_MEASURE: f64 = 4.0;

/// Measure-line time stamps derived from the chart's bpm events.
///
/// Each bpm event opens a segment that runs to the next event, or to
/// `CHART_TAIL_MS` past the last note for the final one. A barline sits at
/// every segment start and at each whole measure inside the segment.
pub fn derive_barlines(chart: &Chart) -> Vec<f64> {
    let mut segments: Vec<(f64, f64)> = chart
        .bpm_events()
        .filter_map(|event| match event.beat_length_ms() {
            Some(beat_ms) => Some((event.time_stamp, beat_ms.max(1.0))),
            None => {
                tracing::debug!(payload = %event.payload, "ignoring bpm event without a beat length");
                None
            }
        })
        .collect();
    segments.sort_by(|a, b| a.0.total_cmp(&b.0));

    let chart_end = chart.last_note_time().unwrap_or(0.0) + CHART_TAIL_MS;
    let mut barlines: Vec<f64> = Vec::new();

    for (index, &(start, beat_ms)) in segments.iter().enumerate() {
        let end = segments
            .get(index + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(chart_end);
        let measure_ms = beat_ms * BEATS_PER_MEASURE;

        if barlines.last() != Some(&start) {
            barlines.push(start);
        }

        // Multiply rather than accumulate to keep long segments exact.
        let mut measure = 1.0;
        loop {
            let time = start + measure * measure_ms;
            if time > end {
                break;
            }
            barlines.push(time);
            measure += 1.0;
        }
    }

    barlines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cell, ChartEvent, Note, NoteKind};

    fn chart(events: &[(f64, &str)], last_note: Option<f64>) -> Chart {
        let notes = last_note
            .map(|time_stamp| Note {
                time_stamp,
                cell: Cell::new(0, 0),
                ordinal: 1,
                kind: NoteKind::Tap,
            })
            .into_iter()
            .collect();
        let events = events
            .iter()
            .map(|&(time, payload)| ChartEvent::bpm(time, payload))
            .collect();
        Chart::new(notes, events)
    }

    #[test]
    fn single_tempo_runs_past_the_last_note() {
        let barlines = derive_barlines(&chart(&[(0.0, "500")], Some(3000.0)));
        assert_eq!(barlines, vec![0.0, 2000.0, 4000.0]);
    }

    #[test]
    fn tempo_change_opens_a_new_segment() {
        let barlines = derive_barlines(&chart(&[(0.0, "500"), (3000.0, "250")], Some(3000.0)));
        assert_eq!(barlines, vec![0.0, 2000.0, 3000.0, 4000.0]);
    }

    #[test]
    fn segment_start_on_a_previous_barline_is_not_duplicated() {
        let barlines = derive_barlines(&chart(&[(0.0, "500"), (2000.0, "500")], Some(2000.0)));
        assert_eq!(barlines, vec![0.0, 2000.0]);
    }

    #[test]
    fn tiny_beat_lengths_are_clamped() {
        let barlines = derive_barlines(&chart(&[(0.0, "0")], Some(0.0)));
        // Measure of 4ms up to the 1000ms tail.
        assert_eq!(barlines.len(), 251);
        assert_eq!(barlines[1], 4.0);
    }

    #[test]
    fn no_bpm_events_means_no_barlines() {
        assert!(derive_barlines(&chart(&[], Some(5000.0))).is_empty());
    }
}
