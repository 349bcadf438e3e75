//! The per-frame pass tying every component together.
//!
//! Order inside one [`Session::tick`]: clock, spawn schedulers, due deferred
//! actions, judgment, autoplay, completion check. Nothing is re-entered
//! mid-tick and input is a snapshot for the whole pass.

use crate::{
    deferred::{DeferredAction, DeferredQueue},
    derive_barlines, AppConfig, AudioDevice, AutoplayAgent, Chart, ClockSignal, ClockState,
    GameClock, GridModel, JudgmentEngine, PlayEvent, PlayResult, Presenter, Result, Scoreboard,
    SpawnScheduler, TimingWindows,
};

/// What the input source saw this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputFrame {
    pub tap_count: u32,
    /// Center-origin cursor position.
    pub cursor: (f32, f32),
}

impl InputFrame {
    pub fn new(tap_count: u32, cursor: (f32, f32)) -> Self {
        Self { tap_count, cursor }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub now_ms: f64,
    pub state: ClockState,
}

impl TickReport {
    pub fn finished(&self) -> bool {
        self.state == ClockState::Ended
    }
}

pub struct Session<P, A> {
    config: AppConfig,
    grid: GridModel,
    chart: Chart,
    barlines: Vec<f64>,
    clock: GameClock,
    note_spawner: SpawnScheduler,
    barline_spawner: SpawnScheduler,
    judge: JudgmentEngine,
    autoplay: Option<AutoplayAgent>,
    deferred: DeferredQueue<DeferredAction>,
    events: Vec<PlayEvent>,
    presenter: P,
    audio: A,
}

impl<P: Presenter, A: AudioDevice> Session<P, A> {
    /// Fails on configuration that would make judgment meaningless.
    pub fn new(config: AppConfig, chart: Chart, presenter: P, audio: A) -> Result<Self> {
        config.validate()?;
        let grid = GridModel::from_config(&config)?;
        let timing = &config.timing;

        Ok(Self {
            grid,
            barlines: derive_barlines(&chart),
            clock: GameClock::from_config(timing),
            note_spawner: SpawnScheduler::new(timing.spawn_lookahead_ms),
            barline_spawner: SpawnScheduler::new(timing.spawn_lookahead_ms),
            judge: JudgmentEngine::new(TimingWindows::from_config(timing), chart.notes().len()),
            autoplay: None,
            deferred: DeferredQueue::new(),
            events: Vec::new(),
            chart,
            config,
            presenter,
            audio,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn barlines(&self) -> &[f64] {
        &self.barlines
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        self.judge.scoreboard()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_ended()
    }

    pub fn result(&self) -> PlayResult {
        PlayResult::from_scoreboard(self.judge.scoreboard())
    }

    pub fn autoplay_enabled(&self) -> bool {
        self.autoplay.is_some()
    }

    /// While enabled, the agent's cursor and taps replace the player's input.
    pub fn set_autoplay(&mut self, enabled: bool) {
        match (enabled, self.autoplay.is_some()) {
            (true, false) => {
                self.autoplay = Some(AutoplayAgent::new(self.grid, &self.config.autoplay));
            }
            (false, true) => {
                self.autoplay = None;
                self.deferred
                    .retain(|action| !matches!(action, DeferredAction::SyntheticTap { .. }));
            }
            _ => {}
        }
    }

    /// Rewinds the audio and begins the pre-roll.
    pub fn start(&mut self) -> Result<()> {
        if self.clock.state() != ClockState::Idle {
            return Ok(());
        }
        self.audio.seek(0.0)?;
        self.audio.pause()?;
        self.clock = self.clock.start();
        tracing::info!(
            notes = self.chart.notes().len(),
            barlines = self.barlines.len(),
            autoplay = self.autoplay_enabled(),
            "session started"
        );
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if !self.clock.is_playing() {
            return Ok(());
        }
        let audio_was_playing = self.clock.is_audio_playing();
        self.clock = self.clock.pause();
        if audio_was_playing {
            self.audio.pause()?;
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if !self.clock.is_paused() {
            return Ok(());
        }
        self.clock = self.clock.resume();
        if self.clock.is_audio_playing() {
            self.audio.play()?;
        }
        Ok(())
    }

    /// Ends the session early or on completion. Pending deferred actions are
    /// dropped so nothing fires into a finished session.
    pub fn end(&mut self) -> Result<()> {
        if self.clock.is_ended() {
            return Ok(());
        }
        self.clock = self.clock.finish();
        self.deferred.clear();
        self.judge.cancel_pending();
        self.audio.stop()?;

        let board = self.judge.scoreboard();
        tracing::info!(
            accuracy = board.accuracy(),
            max_combo = board.max_combo,
            misses = board.miss_count,
            "session ended"
        );
        Ok(())
    }

    /// Runs one frame.
    pub fn tick(&mut self, frame_delta_ms: f64, input: InputFrame) -> Result<TickReport> {
        if self.clock.is_ended() {
            return Ok(self.report());
        }

        let audio_ms = self.audio.position_secs()? * 1000.0;
        let (clock, signal) = self.clock.tick(frame_delta_ms, audio_ms);
        self.clock = clock;
        if signal == Some(ClockSignal::StartAudio) {
            self.audio.play()?;
        }
        if !self.clock.is_playing() {
            return Ok(self.report());
        }

        let now = self.clock.current_time_ms();
        let notes = self.chart.notes();

        for index in self.note_spawner.tick(now, notes) {
            let note = &notes[index];
            self.events.push(PlayEvent::Activate {
                index,
                kind: note.kind,
                cell: note.cell,
                time_stamp: note.time_stamp,
            });
        }
        for index in self.barline_spawner.tick(now, &self.barlines) {
            self.events.push(PlayEvent::Barline {
                time_stamp: self.barlines[index],
            });
        }

        let mut taps = match &mut self.autoplay {
            Some(agent) => agent.take_pending_taps(),
            None => input.tap_count,
        };
        for action in self.deferred.drain_due(now) {
            match action {
                DeferredAction::ResolveDrag { index } => {
                    self.judge.complete_drag(index, &mut self.events);
                }
                DeferredAction::SyntheticTap { .. } => taps += 1,
            }
        }

        let cursor = match &self.autoplay {
            Some(agent) => agent.position_at(now),
            None => input.cursor,
        };
        let cursor_cell = self.grid.local_to_cell(cursor.0, cursor.1);

        self.judge.update(
            now,
            notes,
            taps,
            cursor_cell,
            &mut self.deferred,
            &mut self.events,
        );

        if let Some(agent) = &mut self.autoplay {
            agent.update(now, notes, &self.judge, &mut self.deferred);
        }

        for event in self.events.drain(..) {
            self.presenter.present(event);
        }

        if self.judge.is_complete(now, notes) {
            self.end()?;
        }
        Ok(self.report())
    }

    fn report(&self) -> TickReport {
        TickReport {
            now_ms: self.clock.current_time_ms(),
            state: self.clock.state(),
        }
    }
}
