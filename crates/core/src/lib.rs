//! Core library for the GridBeat rhythm game.
//!
//! Everything here is headless: a play session is driven one frame at a
//! time and reports what happened through [`PlayEvent`]s, so rendering,
//! audio output and input capture live with whoever embeds the crate.
//! Each module owns one subsystem (chart loading, the game clock,
//! judgment, autoplay, scoring) and [`Session`] ties them together.

pub mod audio;
pub mod autoplay;
pub mod chart;
pub mod config;
pub mod deferred;
pub mod error;
pub mod grid;
pub mod judge;
pub mod record;
pub mod render;
pub mod session;
pub mod timeline;

pub use audio::{AudioDevice, SimulatedAudio};
pub use autoplay::AutoplayAgent;
pub use chart::{parse_chart, Chart, ChartEvent, EventKind, Note, NoteKind, ParsedChart};
pub use config::AppConfig;
pub use deferred::{DeferredAction, DeferredQueue};
pub use error::{GridBeatError, Result};
pub use grid::{Cell, GridModel};
pub use judge::{Judgment, JudgmentEngine, Scoreboard, TimingWindows, MAX_GRADE_POINTS};
pub use record::{PlayResult, Rank};
pub use render::{NoteBoard, PlayEvent, Presenter};
pub use session::{InputFrame, Session, TickReport};
pub use timeline::{derive_barlines, ClockSignal, ClockState, GameClock, SpawnScheduler, Timed};
