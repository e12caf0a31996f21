//! Report configuration, read from JSON.
//!
//! Operator tokens stay plain strings here; they are validated when the
//! configuration is turned into [`FilterSpec`]s and a [`RequirementSet`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::data::model::Value;
use crate::error::Result;
use crate::pipeline::filter::FilterSpec;
use crate::pipeline::normalize::NormalizeConfig;
use crate::pipeline::requirement::{RequirementSet, RequirementSpec};

/// One optional filter as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Display name of the filter ("Minutos", "Entidad", ...).
    #[serde(default)]
    pub name: String,
    pub field: String,
    pub operator: String,
    pub value: JsonValue,
    #[serde(default)]
    pub enabled: bool,
}

/// One minimum requirement as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementConfig {
    pub name: String,
    pub field: String,
    pub operator: String,
    pub threshold: f64,
    pub output_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub normalize: NormalizeConfig,
    pub filters: Vec<FilterConfig>,
    pub requirements: Vec<RequirementConfig>,
    /// Column holding the AND of all requirement columns.
    pub combined_column: String,
    /// Column the breakdowns are grouped by.
    pub group_by: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let filter = |name: &str, field: &str, operator: &str, value: JsonValue| FilterConfig {
            name: name.to_string(),
            field: field.to_string(),
            operator: operator.to_string(),
            value,
            enabled: false,
        };
        let requirement = |name: &str, field: &str, output: &str| RequirementConfig {
            name: name.to_string(),
            field: field.to_string(),
            operator: ">=".to_string(),
            threshold: 0.0,
            output_column: output.to_string(),
        };
        Self {
            normalize: NormalizeConfig::default(),
            filters: vec![
                filter("Entidad", "Entidad", "=", JsonValue::from("Nuevo León")),
                filter("Asistencias", "total_asist", ">", JsonValue::from(0)),
                filter("Minutos", "minutos_app", ">", JsonValue::from(0)),
            ],
            requirements: vec![
                requirement("Minutos", "minutos_app", "Cumple_Minutos"),
                requirement("Asistencias", "total_asist", "Cumple_Asistencias"),
            ],
            combined_column: "Cumple_Ambos".to_string(),
            group_by: "Fecha".to_string(),
        }
    }
}

impl ReportConfig {
    /// Load a configuration file. Missing keys take their default values.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Every input column this configuration reads.
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut columns = self.normalize.columns();
        columns.extend(
            self.filters
                .iter()
                .filter(|f| f.enabled)
                .map(|f| f.field.clone()),
        );
        columns.extend(self.requirements.iter().map(|r| r.field.clone()));
        columns.push(self.group_by.clone());
        columns
    }

    /// Validated filter specs, in configuration order.
    pub fn filter_specs(&self) -> Result<Vec<FilterSpec>> {
        self.filters
            .iter()
            .map(|f| {
                FilterSpec::new(
                    f.field.as_str(),
                    &f.operator,
                    Value::from_json(&f.value),
                    f.enabled,
                )
            })
            .collect()
    }

    /// Validated requirement set, in configuration order.
    pub fn requirement_set(&self) -> Result<RequirementSet> {
        self.requirements
            .iter()
            .try_fold(RequirementSet::new(&self.combined_column), |set, r| {
                let spec = RequirementSpec::new(
                    r.field.as_str(),
                    &r.operator,
                    r.threshold,
                    r.output_column.as_str(),
                )?;
                set.with(r.name.as_str(), spec)
            })
    }
}
