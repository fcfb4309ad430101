use crate::core::{ChartKind, Viewport};
use crate::error::{VizError, VizResult};
use crate::render::Color;

use super::ChartConfig;

pub(super) fn validate_viewport(viewport: Viewport) -> VizResult<Viewport> {
    if !viewport.is_valid() {
        return Err(VizError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }
    Ok(viewport)
}

/// Checks everything a render step cannot recover from.
///
/// Bad numbers inside the dataset are not checked here; they are coerced
/// while grouping. Invalid transition overrides are left to the policy,
/// which ignores them.
pub(super) fn validate_chart_config(config: &ChartConfig) -> VizResult<()> {
    if config.fields.x.trim().is_empty() {
        return Err(VizError::Configuration("x field name must not be empty".to_owned()));
    }
    if config.fields.y.trim().is_empty() {
        return Err(VizError::Configuration("y field name must not be empty".to_owned()));
    }
    if config.kind == ChartKind::Grid {
        let Some(grid) = &config.grid else {
            return Err(VizError::Configuration(
                "grid charts require grid columns and rows".to_owned(),
            ));
        };
        grid.dimensions()?;
        if !grid.gap_px.is_finite() || grid.gap_px < 0.0 {
            return Err(VizError::Configuration(
                "grid gap must be finite and >= 0".to_owned(),
            ));
        }
    }

    validate_non_negative("diff duration", config.diff_duration_ms)?;
    validate_non_negative("point radius", config.point_radius)?;
    validate_non_negative("minimum inner width", config.min_inner_width)?;
    validate_non_negative("minimum inner height", config.min_inner_height)?;

    for hex in &config.palette {
        if Color::from_hex(hex).is_none() {
            return Err(VizError::Configuration(format!(
                "palette color `{hex}` is not a #rrggbb hex color"
            )));
        }
    }
    Ok(())
}

fn validate_non_negative(what: &str, value: f64) -> VizResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(VizError::Configuration(format!(
            "{what} must be finite and >= 0"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::GridConfig;

    #[test]
    fn grid_kind_requires_dimensions() {
        let config = ChartConfig::new(ChartKind::Grid);
        assert!(matches!(
            validate_chart_config(&config),
            Err(VizError::Configuration(_))
        ));
        let config = config.with_grid(GridConfig::new(4, 3));
        assert!(validate_chart_config(&config).is_ok());
    }

    #[test]
    fn grid_with_overflowing_cell_count_is_rejected() {
        let config = ChartConfig::new(ChartKind::Grid).with_grid(GridConfig::new(70_000, 70_000));
        assert!(matches!(
            validate_chart_config(&config),
            Err(VizError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_bad_palette_and_negative_durations() {
        let config = ChartConfig::default().with_palette(vec!["teal".to_owned()]);
        assert!(validate_chart_config(&config).is_err());

        let config = ChartConfig::default().with_diff_duration_ms(-1.0);
        assert!(validate_chart_config(&config).is_err());
    }

    #[test]
    fn zero_viewport_is_rejected() {
        assert_eq!(
            validate_viewport(Viewport::new(0, 10)),
            Err(VizError::InvalidViewport {
                width: 0,
                height: 10
            })
        );
    }
}
