use std::sync::{Arc, Mutex, MutexGuard};

use crate::{GridBeatError, Result};

/// The music transport a session follows. The clock only reads the position
/// and never seeks except when a session starts.
pub trait AudioDevice {
    fn position_secs(&self) -> Result<f64>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn seek(&mut self, position_secs: f64) -> Result<()>;
}

#[derive(Debug, Default)]
struct Transport {
    position_secs: f64,
    playing: bool,
}

/// Manually driven transport for headless runs and tests.
///
/// Clones share the same transport, so a driver can keep one clone to
/// advance time while the session owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAudio {
    shared: Arc<Mutex<Transport>>,
}

impl SimulatedAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the play head forward if the transport is playing.
    pub fn advance(&self, delta_ms: f64) -> Result<()> {
        let mut transport = self.lock()?;
        if transport.playing {
            transport.position_secs += delta_ms.max(0.0) / 1000.0;
        }
        Ok(())
    }

    pub fn is_playing(&self) -> Result<bool> {
        Ok(self.lock()?.playing)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Transport>> {
        self.shared
            .lock()
            .map_err(|_| GridBeatError::msg("audio transport has been poisoned"))
    }
}

impl AudioDevice for SimulatedAudio {
    fn position_secs(&self) -> Result<f64> {
        Ok(self.lock()?.position_secs)
    }

    fn play(&mut self) -> Result<()> {
        self.lock()?.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.lock()?.playing = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut transport = self.lock()?;
        transport.playing = false;
        transport.position_secs = 0.0;
        Ok(())
    }

    fn seek(&mut self, position_secs: f64) -> Result<()> {
        self.lock()?.position_secs = position_secs.max(0.0);
        Ok(())
    }
}
