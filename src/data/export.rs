use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    UInt64Array,
};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;

use super::loader::UNIX_EPOCH_DAYS_FROM_CE;
use super::model::{field, Dataset, Value};
use crate::pipeline::aggregate::{AggregateTable, CountTable};

// ---------------------------------------------------------------------------
// Value column → Arrow array
// ---------------------------------------------------------------------------

/// Build a typed array when every non-null value has the same kind,
/// otherwise fall back to text.
fn value_array(values: &[&Value]) -> ArrayRef {
    let kind = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| v.kind())
        .try_fold(None, |acc: Option<&str>, k| match acc {
            Some(prev) if prev != k => Err(()),
            _ => Ok(Some(k)),
        });

    match kind {
        Ok(Some("integer")) => Arc::new(Int64Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        Ok(Some("float")) => Arc::new(Float64Array::from(
            values.iter().map(|v| v.as_f64()).collect::<Vec<_>>(),
        )),
        Ok(Some("bool")) => Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        Ok(Some("date")) => Arc::new(Date32Array::from(
            values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        _ => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_string()))
                .collect::<Vec<_>>(),
        )),
    }
}

fn batch(columns: Vec<(String, ArrayRef)>) -> Result<RecordBatch> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, arr)| Field::new(name, arr.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, arr)| arr).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building record batch")
}

// ---------------------------------------------------------------------------
// Tables → RecordBatch
// ---------------------------------------------------------------------------

/// Columns: group column, category column, `Conteo`, `Porcentaje`.
pub fn count_table_batch(table: &CountTable) -> Result<RecordBatch> {
    let groups: Vec<&Value> = table.rows.iter().map(|r| &r.group).collect();
    let categories: Vec<&Value> = table.rows.iter().map(|r| &r.category).collect();
    let counts: ArrayRef = Arc::new(UInt64Array::from(
        table.rows.iter().map(|r| r.count).collect::<Vec<_>>(),
    ));
    let pcts: ArrayRef = Arc::new(Float64Array::from(
        table.rows.iter().map(|r| r.pct).collect::<Vec<_>>(),
    ));
    batch(vec![
        (table.group_column.clone(), value_array(&groups)),
        (table.category_column.clone(), value_array(&categories)),
        ("Conteo".to_string(), counts),
        ("Porcentaje".to_string(), pcts),
    ])
}

/// Columns: one per grouping column, then `<op>_<value column>`.
pub fn aggregate_table_batch(table: &AggregateTable) -> Result<RecordBatch> {
    let mut columns: Vec<(String, ArrayRef)> = table
        .group_columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let keys: Vec<&Value> = table.rows.iter().map(|r| &r.keys[i]).collect();
            (name.clone(), value_array(&keys))
        })
        .collect();
    let values: Vec<&Value> = table.rows.iter().map(|r| &r.value).collect();
    columns.push((
        format!("{}_{}", table.op, table.value_column),
        value_array(&values),
    ));
    batch(columns)
}

/// One column per dataset column, in schema order.
pub fn dataset_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let columns = dataset
        .column_names
        .iter()
        .map(|name| {
            let values: Vec<&Value> = dataset.records.iter().map(|r| field(r, name)).collect();
            (name.clone(), value_array(&values))
        })
        .collect();
    batch(columns)
}
