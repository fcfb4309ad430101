use serde::{Deserialize, Serialize};

use crate::error::{VizError, VizResult};

use super::LayoutMetrics;

/// Matrix geometry of a grid (small-multiple / waffle) chart.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub columns: Option<u32>,
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default = "default_gap")]
    pub gap_px: f64,
}

/// Upper bound on `columns * rows`.
pub const MAX_GRID_CELLS: u32 = 10_000;

fn default_gap() -> f64 {
    2.0
}

impl GridConfig {
    #[must_use]
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns: Some(columns),
            rows: Some(rows),
            gap_px: default_gap(),
        }
    }

    /// Returns `(columns, rows)` or a configuration error.
    pub fn dimensions(&self) -> VizResult<(u32, u32)> {
        match (self.columns, self.rows) {
            (Some(columns), Some(rows)) if columns > 0 && rows > 0 => {
                match columns.checked_mul(rows) {
                    Some(cells) if cells <= MAX_GRID_CELLS => Ok((columns, rows)),
                    _ => Err(VizError::Configuration(format!(
                        "grid of {columns}x{rows} exceeds {MAX_GRID_CELLS} cells"
                    ))),
                }
            }
            (None, _) | (_, None) => Err(VizError::Configuration(
                "grid layout requires both `columns` and `rows`".to_owned(),
            )),
            _ => Err(VizError::Configuration(
                "grid `columns` and `rows` must be > 0".to_owned(),
            )),
        }
    }
}

/// Position of one grid cell in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub column: u32,
    pub row: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Splits the inner drawing area into `columns x rows` cells, row-major.
pub fn compute_grid_cells(grid: &GridConfig, metrics: LayoutMetrics) -> VizResult<Vec<GridCell>> {
    let (columns, rows) = grid.dimensions()?;
    let gap = if grid.gap_px.is_finite() {
        grid.gap_px.max(0.0)
    } else {
        0.0
    };

    let cell_width =
        ((metrics.inner_width - gap * f64::from(columns - 1)) / f64::from(columns)).max(0.0);
    let cell_height =
        ((metrics.inner_height - gap * f64::from(rows - 1)) / f64::from(rows)).max(0.0);

    let mut cells = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        for column in 0..columns {
            cells.push(GridCell {
                column,
                row,
                x: metrics.left + f64::from(column) * (cell_width + gap),
                y: metrics.top + f64::from(row) * (cell_height + gap),
                width: cell_width,
                height: cell_height,
            });
        }
    }
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> LayoutMetrics {
        LayoutMetrics {
            top: 10.0,
            right: 0.0,
            bottom: 0.0,
            left: 20.0,
            inner_width: 98.0,
            inner_height: 48.0,
        }
    }

    #[test]
    fn missing_rows_is_a_configuration_error() {
        let grid = GridConfig {
            columns: Some(4),
            rows: None,
            gap_px: 0.0,
        };
        assert!(matches!(
            compute_grid_cells(&grid, metrics()),
            Err(VizError::Configuration(_))
        ));
    }

    #[test]
    fn cells_are_row_major_with_gaps() {
        let cells = compute_grid_cells(&GridConfig::new(2, 2), metrics()).expect("cells");
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[1].x, 20.0 + 48.0 + 2.0);
        assert_eq!(cells[2].y, 10.0 + 23.0 + 2.0);
        assert_eq!(cells[3].width, 48.0);
        assert_eq!(cells[3].height, 23.0);
    }

    #[test]
    fn oversized_grids_are_rejected_before_allocating() {
        for grid in [GridConfig::new(70_000, 70_000), GridConfig::new(101, 100)] {
            assert!(matches!(
                compute_grid_cells(&grid, metrics()),
                Err(VizError::Configuration(_))
            ));
        }
        let cells = compute_grid_cells(&GridConfig::new(100, 100), metrics()).expect("cells");
        assert_eq!(cells.len(), MAX_GRID_CELLS as usize);
    }
}
