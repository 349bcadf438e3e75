use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{GridBeatError, Result};

/// Top-level configuration structure for a play session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub grid: GridConfig,
    pub playfield: PlayfieldConfig,
    pub timing: TimingConfig,
    pub autoplay: AutoplayConfig,
}

impl AppConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GridBeatError::MissingResource {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Rejects configurations that would make judgment meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.grid.columns == 0 || self.grid.rows == 0 {
            return Err(GridBeatError::config(format!(
                "grid must have at least one cell, got {}x{}",
                self.grid.columns, self.grid.rows
            )));
        }
        let (width, height) = (self.playfield.width, self.playfield.height);
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(GridBeatError::config(format!(
                "playfield must have a positive size, got {width}x{height}"
            )));
        }

        let timing = &self.timing;
        for (name, value) in [
            ("timing.perfect_window_ms", timing.perfect_window_ms),
            ("timing.good_window_ms", timing.good_window_ms),
            ("timing.bad_window_ms", timing.bad_window_ms),
            ("timing.spawn_lookahead_ms", timing.spawn_lookahead_ms),
            ("timing.wait_time_ms", timing.wait_time_ms),
            ("autoplay.lookahead_ms", self.autoplay.lookahead_ms),
            ("autoplay.avoidance_window_ms", self.autoplay.avoidance_window_ms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GridBeatError::config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !timing.offset_ms.is_finite() {
            return Err(GridBeatError::config("timing.offset_ms must be finite"));
        }
        if timing.perfect_window_ms > timing.good_window_ms
            || timing.good_window_ms > timing.bad_window_ms
        {
            return Err(GridBeatError::config(format!(
                "judgment windows must satisfy perfect <= good <= bad, got {}/{}/{}",
                timing.perfect_window_ms, timing.good_window_ms, timing.bad_window_ms
            )));
        }

        Ok(())
    }
}

/// Discrete column x row partition of the playfield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub columns: u32,
    pub rows: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { columns: 4, rows: 3 }
    }
}

/// Playfield rectangle in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayfieldConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for PlayfieldConfig {
    fn default() -> Self {
        Self {
            width: 512.0,
            height: 384.0,
        }
    }
}

/// Judgment windows and clock parameters, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub perfect_window_ms: f64,
    pub good_window_ms: f64,
    pub bad_window_ms: f64,
    pub spawn_lookahead_ms: f64,
    pub wait_time_ms: f64,
    /// User calibration added to every clock reading.
    pub offset_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            perfect_window_ms: 60.0,
            good_window_ms: 90.0,
            bad_window_ms: 120.0,
            spawn_lookahead_ms: 1000.0,
            wait_time_ms: 1500.0,
            offset_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    /// How far past the enqueue pointer the agent looks for its next target.
    pub lookahead_ms: f64,
    /// Half-width of the window around "now" in which a Block note makes its
    /// cell unsafe.
    pub avoidance_window_ms: f64,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: 1000.0,
            avoidance_window_ms: 120.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid.columns, 4);
        assert_eq!(config.timing.bad_window_ms, 120.0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "timing": { "offset_ms": -25 }, "grid": { "rows": 4 } }"#)
                .unwrap();
        assert_eq!(config.timing.offset_ms, -25.0);
        assert_eq!(config.timing.perfect_window_ms, 60.0);
        assert_eq!(config.grid.rows, 4);
        assert_eq!(config.grid.columns, 4);
    }

    #[test]
    fn rejects_zero_sized_grid() {
        let err = AppConfig::from_json_str(r#"{ "grid": { "columns": 0 } }"#).unwrap_err();
        assert!(matches!(err, GridBeatError::Config(_)));
    }

    #[test]
    fn rejects_unordered_windows() {
        let mut config = AppConfig::default();
        config.timing.good_window_ms = 150.0;
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("perfect <= good <= bad"));
    }

    #[test]
    fn missing_file_is_reported_as_missing_resource() {
        let err = AppConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, GridBeatError::MissingResource { .. }));
    }
}
