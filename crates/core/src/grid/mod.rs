use serde::{Deserialize, Serialize};

use crate::{AppConfig, GridBeatError, Result};

/// One cell of the playfield's column x row partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub col: u32,
    pub row: u32,
}

impl Cell {
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// Maps the fixed playfield rectangle onto a small grid.
///
/// Two coordinate spaces are in play: top-left pixels (chart files, y grows
/// downward) and center-origin local coordinates (runtime cursor, y grows
/// upward). Every conversion clamps into the grid instead of rejecting input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridModel {
    columns: u32,
    rows: u32,
    width: f32,
    height: f32,
}

impl GridModel {
    pub fn new(columns: u32, rows: u32, width: f32, height: f32) -> Result<Self> {
        if columns == 0 || rows == 0 {
            return Err(GridBeatError::config(format!(
                "grid must have at least one cell, got {columns}x{rows}"
            )));
        }
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(GridBeatError::config(format!(
                "playfield must have a positive size, got {width}x{height}"
            )));
        }
        Ok(Self {
            columns,
            rows,
            width,
            height,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.grid.columns,
            config.grid.rows,
            config.playfield.width,
            config.playfield.height,
        )
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn cell_size(&self) -> (f32, f32) {
        (
            self.width / self.columns as f32,
            self.height / self.rows as f32,
        )
    }

    pub fn top_left_to_cell(&self, x: f32, y: f32) -> Cell {
        let (cell_w, cell_h) = self.cell_size();
        Cell {
            col: quantize(x / cell_w, self.columns),
            row: quantize(y / cell_h, self.rows),
        }
    }

    /// Quantizes a center-origin point (y up) to a cell.
    pub fn local_to_cell(&self, local_x: f32, local_y: f32) -> Cell {
        let (x, y) = self.local_to_top_left(local_x, local_y);
        self.top_left_to_cell(x, y)
    }

    pub fn local_to_top_left(&self, local_x: f32, local_y: f32) -> (f32, f32) {
        (local_x + self.width * 0.5, self.height * 0.5 - local_y)
    }

    pub fn top_left_to_local(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.width * 0.5, self.height * 0.5 - y)
    }

    /// Center of a cell in center-origin coordinates.
    pub fn cell_center_local(&self, col: u32, row: u32) -> (f32, f32) {
        let (x, y) = self.cell_center_top_left(col, row);
        self.top_left_to_local(x, y)
    }

    pub fn cell_center_top_left(&self, col: u32, row: u32) -> (f32, f32) {
        let (cell_w, cell_h) = self.cell_size();
        let col = col.min(self.columns - 1);
        let row = row.min(self.rows - 1);
        ((col as f32 + 0.5) * cell_w, (row as f32 + 0.5) * cell_h)
    }

    /// The cell offset by `(d_col, d_row)` from `cell`, clamped to the grid.
    pub fn offset_cell(&self, cell: Cell, d_col: i64, d_row: i64) -> Cell {
        Cell {
            col: (cell.col as i64 + d_col).clamp(0, self.columns as i64 - 1) as u32,
            row: (cell.row as i64 + d_row).clamp(0, self.rows as i64 - 1) as u32,
        }
    }
}

// NaN floors to 0 through the saturating float-to-int cast.
fn quantize(scaled: f32, count: u32) -> u32 {
    (scaled.floor() as i64).clamp(0, count as i64 - 1) as u32
}
