use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::primitives::datetime_to_fractional_year;

/// Screen size handed to the engine by the host container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Chart families known to the engine.
///
/// Transition defaults exist for `Line`, `Bar`, `Pie` and `Grid`; `Area` and
/// `Scatter` only carry their own base margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Area,
    Bar,
    Scatter,
    Pie,
    Grid,
}

impl ChartKind {
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "line" => Some(Self::Line),
            "area" => Some(Self::Area),
            "bar" => Some(Self::Bar),
            "scatter" => Some(Self::Scatter),
            "pie" => Some(Self::Pie),
            "grid" => Some(Self::Grid),
            _ => None,
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Line => "line",
            Self::Area => "area",
            Self::Bar => "bar",
            Self::Scatter => "scatter",
            Self::Pie => "pie",
            Self::Grid => "grid",
        };
        f.write_str(name)
    }
}

/// One cell of a dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Missing,
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Missing => Ok(()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Field name to value mapping; field order is preserved.
pub type Row = IndexMap<String, FieldValue>;

/// Builds a row from `(field, value)` pairs.
#[must_use]
pub fn row<K, I>(fields: I) -> Row
where
    K: Into<String>,
    I: IntoIterator<Item = (K, FieldValue)>,
{
    fields
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect()
}

/// Ordered, immutable sequence of rows.
///
/// Rows are shared behind `Arc` so data points and bound entities can point
/// back at their source row without copying it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Row>", into = "Vec<Row>")]
pub struct Dataset {
    rows: Vec<Arc<Row>>,
}

impl Dataset {
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter().map(Arc::new).collect(),
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Row>> {
        self.rows.iter()
    }
}

impl From<Vec<Row>> for Dataset {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl From<Dataset> for Vec<Row> {
    fn from(dataset: Dataset) -> Self {
        dataset
            .rows
            .into_iter()
            .map(|row| Arc::try_unwrap(row).unwrap_or_else(|shared| (*shared).clone()))
            .collect()
    }
}

/// One plotted sample of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub source_row: Arc<Row>,
}

impl DataPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            source_row: Arc::new(Row::new()),
        }
    }

    #[must_use]
    pub fn with_row(x: f64, y: f64, source_row: Arc<Row>) -> Self {
        Self { x, y, source_row }
    }

    /// Builds a point whose x key is the fractional calendar year of `time`.
    #[must_use]
    pub fn from_datetime(time: DateTime<Utc>, y: f64) -> Self {
        Self::new(datetime_to_fractional_year(time), y)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Named, ordered list of points grouped from a dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub name: String,
    pub values: Vec<DataPoint>,
}

impl Series {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<DataPoint>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns values sorted by x without touching the original order.
    #[must_use]
    pub fn sorted_values(&self) -> Vec<DataPoint> {
        let mut values = self.values.clone();
        values.sort_by(|a, b| a.x.total_cmp(&b.x));
        values
    }
}
