use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::primitives::coerce_number;
use crate::core::{DataPoint, Dataset, Row, Series};

/// Names of the dataset columns the engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default = "default_x_field")]
    pub x: String,
    #[serde(default = "default_y_field")]
    pub y: String,
    #[serde(default = "default_series_field")]
    pub series: String,
    /// Series name used for rows without a series column.
    #[serde(default = "default_series_name")]
    pub default_series: String,
    /// Replacement for values that cannot be coerced to a number.
    #[serde(default)]
    pub fallback_value: f64,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            x: default_x_field(),
            y: default_y_field(),
            series: default_series_field(),
            default_series: default_series_name(),
            fallback_value: 0.0,
        }
    }
}

fn default_x_field() -> String {
    "year".to_owned()
}

fn default_y_field() -> String {
    "value".to_owned()
}

fn default_series_field() -> String {
    "series".to_owned()
}

fn default_series_name() -> String {
    "default".to_owned()
}

impl FieldMapping {
    #[must_use]
    pub fn new(x: impl Into<String>, y: impl Into<String>, series: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            series: series.into(),
            ..Self::default()
        }
    }

    /// Series name of `row`, falling back to `default_series`.
    #[must_use]
    pub fn series_name(&self, row: &Row) -> String {
        match row.get(&self.series) {
            Some(value) if !value.is_missing() => {
                let name = value.to_string();
                if name.is_empty() {
                    self.default_series.clone()
                } else {
                    name
                }
            }
            _ => self.default_series.clone(),
        }
    }
}

/// Non-fatal problem found while reading a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DataShapeWarning {
    pub row_index: usize,
    pub field: String,
    pub message: String,
}

/// Reads `field` from `row` as a number.
///
/// Missing or non-numeric cells yield `fallback` together with a warning.
pub fn numeric_field(
    row: &Row,
    row_index: usize,
    field: &str,
    fallback: f64,
) -> (f64, Option<DataShapeWarning>) {
    match row.get(field) {
        None => (
            fallback,
            Some(DataShapeWarning {
                row_index,
                field: field.to_owned(),
                message: "field is missing".to_owned(),
            }),
        ),
        Some(value) => match coerce_number(value) {
            Some(number) => (number, None),
            None => (
                fallback,
                Some(DataShapeWarning {
                    row_index,
                    field: field.to_owned(),
                    message: format!("`{value}` is not numeric"),
                }),
            ),
        },
    }
}

/// Result of grouping a dataset into series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupedSeries {
    pub series: Vec<Series>,
    pub warnings: Vec<DataShapeWarning>,
}

/// Groups `dataset` into series keyed by the mapping's series field.
///
/// Series keep first-appearance order and points keep dataset order. Values
/// that cannot be read are coerced to `mapping.fallback_value`; each such cell
/// produces one warning.
#[must_use]
pub fn group_series(dataset: &Dataset, mapping: &FieldMapping) -> GroupedSeries {
    let mut grouped: IndexMap<String, Vec<DataPoint>> = IndexMap::new();
    let mut warnings = Vec::new();

    for (row_index, row) in dataset.iter().enumerate() {
        let (x, x_warning) = numeric_field(row, row_index, &mapping.x, mapping.fallback_value);
        let (y, y_warning) = numeric_field(row, row_index, &mapping.y, mapping.fallback_value);
        warnings.extend(x_warning);
        warnings.extend(y_warning);

        let name = mapping.series_name(row);
        grouped
            .entry(name)
            .or_default()
            .push(DataPoint::with_row(x, y, row.clone()));
    }

    if !warnings.is_empty() {
        warn!(
            count = warnings.len(),
            first_row = warnings[0].row_index,
            first_field = %warnings[0].field,
            "coerced malformed dataset values"
        );
    }
    debug!(
        rows = dataset.len(),
        series = grouped.len(),
        "grouped dataset into series"
    );

    GroupedSeries {
        series: grouped
            .into_iter()
            .map(|(name, values)| Series::new(name, values))
            .collect(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::row;

    #[test]
    fn groups_by_series_in_first_appearance_order() {
        let dataset = Dataset::new(vec![
            row([("year", 2000.into()), ("value", 1.into()), ("series", "b".into())]),
            row([("year", 2000.into()), ("value", 2.into()), ("series", "a".into())]),
            row([("year", 2001.into()), ("value", 3.into()), ("series", "b".into())]),
        ]);

        let grouped = group_series(&dataset, &FieldMapping::default());
        let names: Vec<_> = grouped.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(grouped.series[0].values.len(), 2);
        assert!(grouped.warnings.is_empty());
    }

    #[test]
    fn malformed_values_fall_back_with_warnings() {
        let dataset = Dataset::new(vec![row([
            ("year", 2000.into()),
            ("value", "oops".into()),
        ])]);

        let grouped = group_series(&dataset, &FieldMapping::default());
        assert_eq!(grouped.series.len(), 1);
        assert_eq!(grouped.series[0].name, "default");
        assert_eq!(grouped.series[0].values[0].y, 0.0);
        assert_eq!(grouped.warnings.len(), 1);
        assert_eq!(grouped.warnings[0].field, "value");
    }

    #[test]
    fn mapping_fills_defaults_and_keeps_the_fallback() {
        let mapping: FieldMapping =
            serde_json::from_str(r#"{"y":"count","fallback_value":-1.5}"#).expect("mapping");
        assert_eq!(
            mapping,
            FieldMapping {
                y: "count".to_owned(),
                fallback_value: -1.5,
                ..FieldMapping::default()
            }
        );

        let dataset = Dataset::new(vec![row([("year", 2000.into()), ("count", "n/a".into())])]);
        let grouped = group_series(&dataset, &mapping);
        assert_eq!(grouped.series[0].values[0].y, -1.5);
    }
}
