use serde::Serialize;

use super::operator::Operator;
use crate::data::model::{field, Dataset, Value};
use crate::error::{PipelineError, Result, Stage};

// ---------------------------------------------------------------------------
// Filter predicate: one optional condition on a record field
// ---------------------------------------------------------------------------

/// A single `field <op> value` condition. A disabled spec is skipped
/// entirely, it never acts as an always-true or always-false condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpec {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    pub enabled: bool,
}

impl FilterSpec {
    /// Build a spec from a symbolic operator token.
    pub fn new(
        field: impl Into<String>,
        token: &str,
        value: impl Into<Value>,
        enabled: bool,
    ) -> Result<Self> {
        Ok(Self {
            field: field.into(),
            operator: token.parse()?,
            value: value.into(),
            enabled,
        })
    }
}

/// Return indices of records that pass every enabled filter.
///
/// Filters are checked in the order given. Every enabled spec's field must
/// exist in the dataset schema, even when the dataset has no rows.
pub fn filtered_indices(dataset: &Dataset, filters: &[FilterSpec]) -> Result<Vec<usize>> {
    let active: Vec<&FilterSpec> = filters.iter().filter(|f| f.enabled).collect();

    if let Some(missing) = active.iter().find(|f| !dataset.has_column(&f.field)) {
        return Err(PipelineError::UnknownField {
            field: missing.field.clone(),
            stage: Stage::Filter,
        });
    }

    let mut keep = Vec::new();
    'records: for (i, rec) in dataset.records.iter().enumerate() {
        for spec in &active {
            if !spec.operator.compare(field(rec, &spec.field), &spec.value)? {
                continue 'records;
            }
        }
        keep.push(i);
    }
    Ok(keep)
}

/// Apply the enabled filters as a logical AND and return the reduced dataset.
pub fn apply_filters(dataset: &Dataset, filters: &[FilterSpec]) -> Result<Dataset> {
    let keep = filtered_indices(dataset, filters)?;
    log::debug!(
        "filter: {} of {} rows pass {} enabled filter(s)",
        keep.len(),
        dataset.len(),
        filters.iter().filter(|f| f.enabled).count()
    );
    let records = keep
        .into_iter()
        .map(|i| dataset.records[i].clone())
        .collect();
    Ok(Dataset::with_schema(records, &dataset.column_names))
}
