use serde::{Deserialize, Serialize};

use crate::core::Dataset;
use crate::error::{VizError, VizResult};

use super::ChartConfig;

pub const CHART_CONFIG_JSON_SCHEMA_V1: u32 = 1;
pub const STEP_JSON_SCHEMA_V1: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfigJsonContractV1 {
    pub schema_version: u32,
    pub config: ChartConfig,
}

/// One narrative step as handed over by a step dispatcher: what to draw and
/// the rows to draw it from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepDefinition {
    #[serde(default)]
    pub config: ChartConfig,
    #[serde(default)]
    pub data: Dataset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinitionJsonContractV1 {
    pub schema_version: u32,
    pub step: StepDefinition,
}

impl ChartConfig {
    pub fn to_json_contract_v1_pretty(&self) -> VizResult<String> {
        let payload = ChartConfigJsonContractV1 {
            schema_version: CHART_CONFIG_JSON_SCHEMA_V1,
            config: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            VizError::InvalidData(format!("failed to serialize chart config contract v1: {e}"))
        })
    }

    /// Accepts a bare config object or a versioned v1 contract.
    pub fn from_json_compat_str(input: &str) -> VizResult<Self> {
        let value: serde_json::Value = serde_json::from_str(input).map_err(|e| {
            VizError::InvalidData(format!("failed to parse chart config json: {e}"))
        })?;
        if value.get("schema_version").is_none() {
            return serde_json::from_value(value).map_err(|e| {
                VizError::InvalidData(format!("failed to parse chart config json: {e}"))
            });
        }
        let payload: ChartConfigJsonContractV1 = serde_json::from_value(value).map_err(|e| {
            VizError::InvalidData(format!("failed to parse chart config json payload: {e}"))
        })?;
        if payload.schema_version != CHART_CONFIG_JSON_SCHEMA_V1 {
            return Err(VizError::InvalidData(format!(
                "unsupported chart config schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.config)
    }
}

impl StepDefinition {
    pub fn to_json_contract_v1_pretty(&self) -> VizResult<String> {
        let payload = StepDefinitionJsonContractV1 {
            schema_version: STEP_JSON_SCHEMA_V1,
            step: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            VizError::InvalidData(format!("failed to serialize step contract v1: {e}"))
        })
    }

    pub fn from_json_compat_str(input: &str) -> VizResult<Self> {
        let value: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| VizError::InvalidData(format!("failed to parse step json: {e}")))?;
        if value.get("schema_version").is_none() {
            return serde_json::from_value(value)
                .map_err(|e| VizError::InvalidData(format!("failed to parse step json: {e}")));
        }
        let payload: StepDefinitionJsonContractV1 = serde_json::from_value(value).map_err(|e| {
            VizError::InvalidData(format!("failed to parse step json payload: {e}"))
        })?;
        if payload.schema_version != STEP_JSON_SCHEMA_V1 {
            return Err(VizError::InvalidData(format!(
                "unsupported step schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.step)
    }
}

impl Dataset {
    /// Parses a JSON array of flat objects. `null` fields become missing
    /// values.
    pub fn from_json_str(input: &str) -> VizResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| VizError::InvalidData(format!("failed to parse dataset json: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ChartKind, FieldValue};

    #[test]
    fn config_contract_round_trips_and_accepts_bare_objects() {
        let config = ChartConfig::new(ChartKind::Bar).with_title("Exports");
        let json = config.to_json_contract_v1_pretty().expect("serialize");
        assert_eq!(ChartConfig::from_json_compat_str(&json).expect("parse"), config);

        let bare = ChartConfig::from_json_compat_str(r#"{"kind":"pie"}"#).expect("bare");
        assert_eq!(bare.kind, ChartKind::Pie);
        assert_eq!(bare.diff_duration_ms, 1000.0);
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let err = ChartConfig::from_json_compat_str(r#"{"schema_version":9,"config":{}}"#)
            .expect_err("version");
        assert!(matches!(err, VizError::InvalidData(_)));
    }

    #[test]
    fn dataset_parses_mixed_fields() {
        let dataset =
            Dataset::from_json_str(r#"[{"year":2000,"value":"12.5","series":"a","note":null}]"#)
                .expect("dataset");
        let row = &dataset.rows()[0];
        assert_eq!(row.get("year"), Some(&FieldValue::Number(2000.0)));
        assert_eq!(row.get("value"), Some(&FieldValue::Text("12.5".to_owned())));
        assert_eq!(row.get("note"), Some(&FieldValue::Missing));
    }
}
