use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Cell, Judgment, NoteKind};

/// Signals handed to whatever draws the playfield. Notes are referred to by
/// their index in [`crate::Chart::notes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayEvent {
    Activate {
        index: usize,
        kind: NoteKind,
        cell: Cell,
        time_stamp: f64,
    },
    Barline {
        time_stamp: f64,
    },
    /// The note's time has arrived. Sent at most once per note.
    Fade {
        index: usize,
    },
    /// The note left the judgment queue.
    Release {
        index: usize,
    },
    /// `hit` is set when input landed on a note and hit feedback should play.
    Judged {
        judgment: Judgment,
        index: Option<usize>,
        hit: bool,
    },
    /// The cursor sat on a Block note when it struck.
    Shake,
}

/// Presentation backend abstraction.
pub trait Presenter {
    fn present(&mut self, event: PlayEvent);
}

/// Records every event, mostly for tests and replays.
impl Presenter for Vec<PlayEvent> {
    fn present(&mut self, event: PlayEvent) {
        self.push(event);
    }
}

/// Discards every event.
impl Presenter for () {
    fn present(&mut self, _event: PlayEvent) {}
}

/// Headless presenter that tracks what would currently be on screen.
#[derive(Debug, Default, Clone)]
pub struct NoteBoard {
    visible: BTreeSet<usize>,
    fading: BTreeSet<usize>,
    barlines: usize,
    shakes: usize,
    hits: usize,
    last_judgment: Option<Judgment>,
}

impl NoteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visible(&self) -> impl Iterator<Item = usize> + '_ {
        self.visible.iter().copied()
    }

    pub fn is_fading(&self, index: usize) -> bool {
        self.fading.contains(&index)
    }

    pub fn barlines(&self) -> usize {
        self.barlines
    }

    pub fn shakes(&self) -> usize {
        self.shakes
    }

    /// Number of judgments that would have played hit audio.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn last_judgment(&self) -> Option<Judgment> {
        self.last_judgment
    }
}

impl Presenter for NoteBoard {
    fn present(&mut self, event: PlayEvent) {
        match event {
            PlayEvent::Activate { index, .. } => {
                self.visible.insert(index);
            }
            PlayEvent::Barline { .. } => self.barlines += 1,
            PlayEvent::Fade { index } => {
                if self.visible.contains(&index) {
                    self.fading.insert(index);
                }
            }
            PlayEvent::Release { index } => {
                self.visible.remove(&index);
                self.fading.remove(&index);
            }
            PlayEvent::Judged { judgment, hit, .. } => {
                self.last_judgment = Some(judgment);
                if hit {
                    self.hits += 1;
                }
            }
            PlayEvent::Shake => self.shakes += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_board_tracks_note_lifecycle() {
        let mut board = NoteBoard::new();
        board.present(PlayEvent::Activate {
            index: 3,
            kind: NoteKind::Tap,
            cell: Cell::new(1, 1),
            time_stamp: 500.0,
        });
        board.present(PlayEvent::Fade { index: 3 });
        assert!(board.is_fading(3));
        assert_eq!(board.visible().collect::<Vec<_>>(), vec![3]);

        board.present(PlayEvent::Release { index: 3 });
        board.present(PlayEvent::Judged {
            judgment: Judgment::Good,
            index: Some(3),
            hit: true,
        });
        assert_eq!(board.visible().count(), 0);
        assert!(!board.is_fading(3));
        assert_eq!(board.hits(), 1);
        assert_eq!(board.last_judgment(), Some(Judgment::Good));
    }

    #[test]
    fn fade_for_an_unseen_note_is_ignored() {
        let mut board = NoteBoard::new();
        board.present(PlayEvent::Fade { index: 9 });
        board.present(PlayEvent::Shake);
        assert!(!board.is_fading(9));
        assert_eq!(board.shakes(), 1);
    }
}
