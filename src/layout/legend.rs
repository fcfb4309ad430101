use serde::{Deserialize, Serialize};

use super::{LayoutConfig, LayoutMetrics};

const SWATCH_PX: f64 = 12.0;
const ITEM_HEIGHT_PX: f64 = 20.0;
const OFFSET_PX: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendItem {
    pub name: String,
    pub swatch_x: f64,
    pub swatch_y: f64,
    pub label_x: f64,
    pub label_y: f64,
}

/// Legend block stacked vertically in the right margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub swatch_size: f64,
    pub items: Vec<LegendItem>,
}

/// Lays out one legend row per series name.
///
/// Returns `None` when the legend is disabled or there is at most one series,
/// mirroring when the right margin is widened.
#[must_use]
pub fn compute_legend(
    names: &[String],
    metrics: LayoutMetrics,
    config: &LayoutConfig,
) -> Option<LegendGeometry> {
    if !config.show_legend || names.len() <= 1 {
        return None;
    }

    let x = metrics.left + metrics.inner_width + OFFSET_PX;
    let y = metrics.top;
    let longest = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    let width = SWATCH_PX + 6.0 + longest as f64 * config.tuning.char_width_px;

    let items = names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let row_y = y + index as f64 * ITEM_HEIGHT_PX;
            LegendItem {
                name: name.clone(),
                swatch_x: x,
                swatch_y: row_y,
                label_x: x + SWATCH_PX + 6.0,
                label_y: row_y + SWATCH_PX * 0.5,
            }
        })
        .collect::<Vec<_>>();

    Some(LegendGeometry {
        x,
        y,
        width,
        height: items.len() as f64 * ITEM_HEIGHT_PX,
        swatch_size: SWATCH_PX,
        items,
    })
}
