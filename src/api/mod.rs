//! Host-facing entry point: one `StoryChart` per chart container.

mod engine;
mod engine_accessors;
mod engine_config;
mod engine_init;
mod json_contract;
mod step_coordinator;
mod validation;

pub use engine::StoryChart;
pub use engine_config::ChartConfig;
pub use json_contract::{
    CHART_CONFIG_JSON_SCHEMA_V1, ChartConfigJsonContractV1, STEP_JSON_SCHEMA_V1, StepDefinition,
    StepDefinitionJsonContractV1,
};
pub use step_coordinator::{
    bar_layer, grid_layer, legend_label_layer, legend_swatch_layer, pie_layer, placeholder_layer,
    series_target, title_layer,
};
