//! Report pipeline: from raw records to chart-ready breakdowns.
//!
//! Architecture:
//! ```text
//!   raw Dataset (loader)
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ normalize │  allow-listed regions, canonical labels, parsed dates
//!   └───────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │  filter   │  enabled FilterSpecs, ANDed
//!   └───────────┘
//!        │
//!        ▼
//!   ┌─────────────┐
//!   │ requirement │  Sí/No column per requirement + combined column
//!   └─────────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate │  counts and percentages per date
//!   └───────────┘
//! ```
//!
//! `operator` is shared by `filter` and `requirement`. Every stage returns a
//! new `Dataset`; inputs are never modified.

pub mod aggregate;
pub mod filter;
pub mod normalize;
pub mod operator;
pub mod requirement;

use serde::Serialize;

use crate::config::ReportConfig;
use crate::data::model::Dataset;
use crate::error::Result;

use aggregate::{count_values, CountTable};
use filter::apply_filters;
use normalize::normalize;
use requirement::evaluate;

/// Counts of one requirement column per group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub column: String,
    pub table: CountTable,
}

/// Everything one report run produces.
#[derive(Debug, Clone)]
pub struct Report {
    pub normalized: Dataset,
    pub filtered: Dataset,
    pub evaluated: Dataset,
    /// Combined column first, then each requirement column in set order.
    pub breakdowns: Vec<Breakdown>,
}

/// Run every stage for one configuration.
///
/// Specs are validated before any data is touched, so a bad operator token
/// fails without doing work. A blank input (no rows, no header) takes the
/// columns the configuration reads as its schema and produces empty
/// breakdowns.
pub fn run_report(raw: &Dataset, config: &ReportConfig) -> Result<Report> {
    let filters = config.filter_specs()?;
    let requirements = config.requirement_set()?;

    let seeded;
    let raw = if raw.is_blank() {
        log::warn!("report: input has no rows and no columns");
        seeded = Dataset::with_schema(Vec::new(), &config.referenced_columns());
        &seeded
    } else {
        raw
    };

    let normalized = normalize(raw, &config.normalize)?;
    let filtered = apply_filters(&normalized, &filters)?;
    let evaluated = evaluate(&filtered, &requirements)?;

    let columns = std::iter::once(requirements.combined_column())
        .chain(requirements.output_columns());
    let breakdowns = columns
        .map(|column| -> Result<Breakdown> {
            Ok(Breakdown {
                column: column.to_string(),
                table: count_values(&evaluated, &config.group_by, column)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    log::info!(
        "report: {} raw rows, {} normalized, {} after filters, {} breakdown(s)",
        raw.len(),
        normalized.len(),
        filtered.len(),
        breakdowns.len()
    );
    Ok(Report {
        normalized,
        filtered,
        evaluated,
        breakdowns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Record, Value};
    use crate::error::PipelineError;

    fn raw_row(date: &str, region: &str, minutes: i64, visits: i64) -> Record {
        let mut r = Record::new();
        r.insert("Fecha".into(), date.into());
        r.insert("Entidad".into(), region.into());
        r.insert("Sexo".into(), "femenino".into());
        r.insert("minutos_app".into(), Value::Integer(minutes));
        r.insert("total_asist".into(), Value::Integer(visits));
        r.insert("Puesto".into(), "Docente".into());
        r
    }

    #[test]
    fn test_default_report_has_three_breakdowns() {
        let raw = Dataset::from_records(vec![
            raw_row("2024-01-08", "Sonora", 20, 2),
            raw_row("2024-01-08", "Jalisco", 20, 2),
            raw_row("2024-01-15", "Oaxaca", 0, 0),
        ]);
        let report = run_report(&raw, &ReportConfig::default()).unwrap();
        assert_eq!(report.normalized.len(), 2);
        assert_eq!(report.filtered.len(), 2);
        let cols: Vec<&str> = report.breakdowns.iter().map(|b| b.column.as_str()).collect();
        assert_eq!(cols, vec!["Cumple_Ambos", "Cumple_Minutos", "Cumple_Asistencias"]);
        // Thresholds default to ">= 0": everyone meets them.
        assert!(report.breakdowns[0]
            .table
            .rows
            .iter()
            .all(|r| r.category == Value::from("Sí") && r.pct == 100.0));
    }

    #[test]
    fn test_bad_config_fails_before_normalizing() {
        let mut config = ReportConfig::default();
        config.filters[0].operator = "equals".into();
        // Raw data lacks every configured column; the operator error wins.
        let raw = Dataset::from_records(vec![Record::new()]);
        assert!(matches!(
            run_report(&raw, &config),
            Err(PipelineError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_blank_input_gives_empty_breakdowns() {
        let mut config = ReportConfig::default();
        config.filters[2].enabled = true;
        let report = run_report(&Dataset::from_records(Vec::new()), &config).unwrap();
        assert!(report.evaluated.is_empty());
        assert!(report.evaluated.has_column("Cumple_Ambos"));
        assert_eq!(report.breakdowns.len(), 3);
        assert!(report.breakdowns.iter().all(|b| b.table.is_empty()));
    }
}
