//! Record normalization: region and sex canonicalization, column pruning and
//! date parsing.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::data::model::{field, Dataset, Record, Sex, Value};
use crate::error::{PipelineError, Result, Stage};

/// Date layouts accepted for text date cells, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// How raw records are cleaned before filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Column holding the region (entidad) name.
    pub region_column: String,
    /// Column holding the raw sex/gender label, if the source has one.
    pub sex_column: Option<String>,
    /// Columns parsed into calendar dates.
    pub date_columns: Vec<String>,
    /// Columns removed from the output.
    pub drop_columns: Vec<String>,
    /// Regions kept; rows from any other region are dropped.
    pub allowed_regions: Vec<String>,
    /// Region spelling variant → canonical region name.
    pub region_aliases: Vec<(String, String)>,
    /// Raw sex label → canonical category. Unlisted labels become `Unknown`.
    pub sex_labels: Vec<(String, Sex)>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        let pairs = |items: &[(&str, &str)]| -> Vec<(String, String)> {
            items
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect()
        };
        Self {
            region_column: "Entidad".to_string(),
            sex_column: Some("Sexo".to_string()),
            date_columns: vec!["Fecha".to_string()],
            drop_columns: vec!["Puesto".to_string(), "total_encuestas".to_string()],
            allowed_regions: [
                "Sonora",
                "Oaxaca",
                "Querétaro",
                "Nuevo León",
                "Campeche",
                "Coahuila",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            region_aliases: pairs(&[
                ("Ciudad De México", "Ciudad de México"),
                ("Estado De México", "Estado de México"),
                ("Queretaro", "Querétaro"),
                ("Nuevo Leon", "Nuevo León"),
            ]),
            sex_labels: vec![
                ("femenino".to_string(), Sex::Female),
                ("Masculino".to_string(), Sex::Male),
                ("Otro".to_string(), Sex::Unknown),
                ("Prefiero No Contestar".to_string(), Sex::Unknown),
            ],
        }
    }
}

impl NormalizeConfig {
    /// Columns every normalized dataset carries.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![self.region_column.clone()];
        columns.extend(self.sex_column.iter().cloned());
        columns.extend(self.date_columns.iter().cloned());
        columns
    }
}

/// Lookup key for categorical labels: trimmed, NFC. Case is significant;
/// case variants are listed in `region_aliases` / `sex_labels`.
pub fn label_key(input: &str) -> String {
    input.trim().nfc().collect()
}

/// Pre-built lookup tables for one normalization run.
struct Canonicalizer<'a> {
    config: &'a NormalizeConfig,
    regions: HashMap<String, &'a str>,
    sexes: HashMap<String, Sex>,
}

impl<'a> Canonicalizer<'a> {
    /// Build the lookup tables, rejecting entries that would remap a
    /// canonical output on a second pass.
    fn new(config: &'a NormalizeConfig) -> Result<Self> {
        let mut regions: HashMap<String, &str> = config
            .allowed_regions
            .iter()
            .map(|r| (label_key(r), r.as_str()))
            .collect();
        for (variant, canonical) in &config.region_aliases {
            let key = label_key(variant);
            if let Some(kept) = config.allowed_regions.iter().find(|r| label_key(r) == key) {
                if key != label_key(canonical) {
                    return Err(PipelineError::InvalidParameter(format!(
                        "region alias '{variant}' -> '{canonical}' renames the kept region '{kept}'"
                    )));
                }
            }
            // An alias only matters when its target is kept.
            if let Some(target) = config.allowed_regions.iter().find(|r| *r == canonical) {
                regions.insert(key, target.as_str());
            }
        }

        let fixed_labels: HashMap<String, Sex> = Sex::ALL
            .iter()
            .map(|s| (label_key(s.label()), *s))
            .collect();
        let mut sexes = fixed_labels.clone();
        for (label, sex) in &config.sex_labels {
            let key = label_key(label);
            if let Some(fixed) = fixed_labels.get(&key) {
                if fixed != sex {
                    return Err(PipelineError::InvalidParameter(format!(
                        "sex label '{label}' is the canonical label of {fixed:?}, not {sex:?}"
                    )));
                }
            }
            sexes.insert(key, *sex);
        }

        Ok(Self {
            config,
            regions,
            sexes,
        })
    }

    fn region(&self, value: &Value) -> Option<&'a str> {
        value
            .as_str()
            .and_then(|s| self.regions.get(&label_key(s)).copied())
    }

    fn sex(&self, value: &Value) -> Sex {
        value
            .as_str()
            .and_then(|s| self.sexes.get(&label_key(s)).copied())
            .unwrap_or(Sex::Unknown)
    }
}

/// Parse a cell into a calendar date. Already-parsed dates pass through.
fn parse_date(value: &Value, row: usize, column: &str) -> Result<NaiveDate> {
    let malformed = || PipelineError::MalformedDate {
        row,
        column: column.to_string(),
        value: value.to_string(),
    };
    let text = match value {
        Value::Date(d) => return Ok(*d),
        Value::Text(s) => s.trim(),
        _ => return Err(malformed()),
    };
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .ok_or_else(malformed)
}

fn require_column(dataset: &Dataset, column: &str) -> Result<()> {
    if dataset.has_column(column) {
        Ok(())
    } else {
        Err(PipelineError::UnknownField {
            field: column.to_string(),
            stage: Stage::Normalize,
        })
    }
}

/// Produce the canonical dataset.
///
/// Rows outside the region allow-list are dropped silently. Errors carry the
/// index of the row in `raw`. Running it on its own output changes nothing.
///
/// A blank input (no rows and no columns, e.g. an empty JSON array) has no
/// schema to check and yields an empty dataset with the configured columns.
pub fn normalize(raw: &Dataset, config: &NormalizeConfig) -> Result<Dataset> {
    let canon = Canonicalizer::new(config)?;
    if raw.is_blank() {
        return Ok(Dataset::with_schema(Vec::new(), &config.columns()));
    }

    require_column(raw, &config.region_column)?;
    if let Some(sex_col) = &config.sex_column {
        require_column(raw, sex_col)?;
    }
    for date_col in &config.date_columns {
        require_column(raw, date_col)?;
    }

    let mut records: Vec<Record> = Vec::with_capacity(raw.len());

    for (row, rec) in raw.records.iter().enumerate() {
        let Some(region) = canon.region(field(rec, &config.region_column)) else {
            continue;
        };

        let mut out: Record = rec
            .iter()
            .filter(|(col, _)| !canon.config.drop_columns.contains(col))
            .map(|(col, val)| (col.clone(), val.clone()))
            .collect();

        out.insert(config.region_column.clone(), Value::Text(region.to_string()));
        if let Some(sex_col) = &config.sex_column {
            let sex = canon.sex(field(rec, sex_col));
            out.insert(sex_col.clone(), Value::Text(sex.label().to_string()));
        }
        for date_col in &config.date_columns {
            let date = parse_date(field(rec, date_col), row, date_col)?;
            out.insert(date_col.clone(), Value::Date(date));
        }

        records.push(out);
    }

    let schema: Vec<String> = raw
        .column_names
        .iter()
        .filter(|c| !config.drop_columns.contains(c))
        .cloned()
        .collect();

    log::debug!(
        "normalize: kept {} of {} rows, dropped columns {:?}",
        records.len(),
        raw.len(),
        config.drop_columns
    );
    Ok(Dataset::with_schema(records, &schema))
}
