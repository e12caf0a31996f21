//! Derived "meets requirement" columns.
//!
//! Each requirement compares a numeric metric against a threshold and writes
//! a `Sí`/`No` column. A combined column is `Sí` only when every individual
//! requirement column is `Sí`.

use std::collections::BTreeSet;

use serde::Serialize;

use super::operator::Operator;
use crate::data::model::{field, Dataset, Record, Value};
use crate::error::{PipelineError, Result, Stage};

/// Label for a met requirement.
pub const YES: &str = "Sí";
/// Label for an unmet requirement.
pub const NO: &str = "No";

/// Display label for a requirement outcome.
pub fn label(met: bool) -> Value {
    Value::Text(if met { YES } else { NO }.to_string())
}

/// One `source_field <op> threshold` requirement producing `output_column`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementSpec {
    pub source_field: String,
    pub operator: Operator,
    pub threshold: f64,
    pub output_column: String,
}

impl RequirementSpec {
    pub fn new(
        source_field: impl Into<String>,
        token: &str,
        threshold: f64,
        output_column: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            source_field: source_field.into(),
            operator: token.parse()?,
            threshold,
            output_column: output_column.into(),
        })
    }

    fn meets(&self, record: &Record) -> Result<bool> {
        self.operator
            .compare(field(record, &self.source_field), &Value::Float(self.threshold))
    }
}

/// Ordered, named requirements plus the name of the combined column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementSet {
    requirements: Vec<(String, RequirementSpec)>,
    combined_column: String,
}

impl RequirementSet {
    pub fn new(combined_column: impl Into<String>) -> Self {
        Self {
            requirements: Vec::new(),
            combined_column: combined_column.into(),
        }
    }

    /// Add a named requirement. Output columns must be distinct from each
    /// other and from the combined column.
    pub fn with(mut self, name: impl Into<String>, spec: RequirementSpec) -> Result<Self> {
        let clashes = spec.output_column == self.combined_column
            || self
                .requirements
                .iter()
                .any(|(_, s)| s.output_column == spec.output_column);
        if clashes {
            return Err(PipelineError::DuplicateColumn(spec.output_column));
        }
        self.requirements.push((name.into(), spec));
        Ok(self)
    }

    pub fn requirements(&self) -> &[(String, RequirementSpec)] {
        &self.requirements
    }

    pub fn combined_column(&self) -> &str {
        &self.combined_column
    }

    /// Output columns in set order, without the combined column.
    pub fn output_columns(&self) -> Vec<&str> {
        self.requirements
            .iter()
            .map(|(_, s)| s.output_column.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Add one label column per requirement and the combined column.
///
/// Every source field is checked against the schema before any row is
/// evaluated. An empty set marks every row as meeting the combined
/// requirement.
pub fn evaluate(dataset: &Dataset, set: &RequirementSet) -> Result<Dataset> {
    if let Some((_, missing)) = set
        .requirements
        .iter()
        .find(|(_, s)| !dataset.has_column(&s.source_field))
    {
        return Err(PipelineError::UnknownField {
            field: missing.source_field.clone(),
            stage: Stage::Requirement,
        });
    }

    let records = dataset
        .records
        .iter()
        .map(|rec| -> Result<Record> {
            let mut out = rec.clone();
            let mut all_met = true;
            for (_, spec) in &set.requirements {
                let met = spec.meets(rec)?;
                all_met &= met;
                out.insert(spec.output_column.clone(), label(met));
            }
            out.insert(set.combined_column.clone(), label(all_met));
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut schema: BTreeSet<String> = dataset.column_names.iter().cloned().collect();
    schema.extend(set.output_columns().into_iter().map(str::to_string));
    schema.insert(set.combined_column.clone());
    let schema: Vec<String> = schema.into_iter().collect();

    log::debug!(
        "requirement: evaluated {} requirement(s) over {} rows",
        set.requirements.len(),
        records.len()
    );
    Ok(Dataset::with_schema(records, &schema))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(minutes: i64, visits: i64) -> Record {
        let mut r = Record::new();
        r.insert("minutes".into(), Value::Integer(minutes));
        r.insert("visits".into(), Value::Integer(visits));
        r
    }

    fn two_requirements() -> RequirementSet {
        RequirementSet::new("meets_all")
            .with("minutes", RequirementSpec::new("minutes", ">", 10.0, "meets_minutes").unwrap())
            .unwrap()
            .with("visits", RequirementSpec::new("visits", ">", 2.0, "meets_visits").unwrap())
            .unwrap()
    }

    fn labels(rec: &Record, cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| rec[*c].to_string()).collect()
    }

    #[test]
    fn test_combined_is_logical_and() {
        let ds = Dataset::from_records(vec![
            participant(15, 1),
            participant(15, 3),
            participant(5, 3),
            participant(5, 0),
        ]);
        let out = evaluate(&ds, &two_requirements()).unwrap();
        let cols = ["meets_minutes", "meets_visits", "meets_all"];
        assert_eq!(labels(&out.records[0], &cols), vec!["Sí", "No", "No"]);
        assert_eq!(labels(&out.records[1], &cols), vec!["Sí", "Sí", "Sí"]);
        assert_eq!(labels(&out.records[2], &cols), vec!["No", "Sí", "No"]);
        assert_eq!(labels(&out.records[3], &cols), vec!["No", "No", "No"]);
    }

    #[test]
    fn test_three_requirements_need_all() {
        let mut rec = participant(30, 4);
        rec.insert("surveys".into(), Value::Integer(0));
        let ds = Dataset::from_records(vec![rec]);
        let set = two_requirements()
            .with("surveys", RequirementSpec::new("surveys", ">=", 1.0, "meets_surveys").unwrap())
            .unwrap();
        let out = evaluate(&ds, &set).unwrap();
        assert_eq!(out.records[0]["meets_minutes"], label(true));
        assert_eq!(out.records[0]["meets_visits"], label(true));
        assert_eq!(out.records[0]["meets_surveys"], label(false));
        assert_eq!(out.records[0]["meets_all"], label(false));
    }

    #[test]
    fn test_input_is_left_untouched() {
        let ds = Dataset::from_records(vec![participant(15, 1)]);
        let before = ds.clone();
        let out = evaluate(&ds, &two_requirements()).unwrap();
        assert_eq!(ds, before);
        assert!(out.has_column("meets_all"));
        assert!(!ds.has_column("meets_all"));
    }

    #[test]
    fn test_empty_set_marks_everything_met() {
        let ds = Dataset::from_records(vec![participant(0, 0)]);
        let out = evaluate(&ds, &RequirementSet::new("meets_all")).unwrap();
        assert_eq!(out.records[0]["meets_all"], Value::Text(YES.into()));
    }

    #[test]
    fn test_empty_dataset_keeps_schema() {
        let ds = Dataset::with_schema(Vec::new(), &["minutes".into(), "visits".into()]);
        let out = evaluate(&ds, &two_requirements()).unwrap();
        assert!(out.is_empty());
        assert!(out.has_column("meets_minutes"));
    }

    #[test]
    fn test_unknown_source_field() {
        let ds = Dataset::from_records(vec![participant(15, 1)]);
        let set = RequirementSet::new("meets_all")
            .with("hours", RequirementSpec::new("hours", ">", 1.0, "meets_hours").unwrap())
            .unwrap();
        assert!(matches!(
            evaluate(&ds, &set),
            Err(PipelineError::UnknownField { stage: Stage::Requirement, .. })
        ));
    }

    #[test]
    fn test_duplicate_output_column() {
        let dup = two_requirements().with(
            "again",
            RequirementSpec::new("minutes", ">", 1.0, "meets_minutes").unwrap(),
        );
        assert!(matches!(dup, Err(PipelineError::DuplicateColumn(c)) if c == "meets_minutes"));

        let clash = RequirementSet::new("meets_all")
            .with("x", RequirementSpec::new("minutes", ">", 1.0, "meets_all").unwrap());
        assert!(clash.is_err());
    }
}
