//! Grouped counting and aggregation of evaluated datasets.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::model::{field, Dataset, Value};
use crate::error::{PipelineError, Result, Stage};

/// Round a percentage to one decimal place.
fn round_pct(pct: f64) -> f64 {
    (pct * 10.0).round() / 10.0
}

fn require_column(dataset: &Dataset, column: &str) -> Result<()> {
    if dataset.has_column(column) {
        Ok(())
    } else {
        Err(PipelineError::UnknownField {
            field: column.to_string(),
            stage: Stage::Aggregate,
        })
    }
}

// ---------------------------------------------------------------------------
// Value counts per group
// ---------------------------------------------------------------------------

/// Occurrences of one category within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountRow {
    pub group: Value,
    pub category: Value,
    pub count: u64,
    /// Share of `count` within its group, in percent, one decimal.
    pub pct: f64,
}

/// Output of [`count_values`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountTable {
    pub group_column: String,
    pub category_column: String,
    pub rows: Vec<CountRow>,
}

impl CountTable {
    /// Rows sorted by group key, categories kept in their existing order
    /// within each group.
    pub fn sorted_by_group(&self) -> CountTable {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| a.group.cmp(&b.group));
        CountTable {
            rows,
            ..self.clone()
        }
    }

    /// Add zero-count rows so every group lists every category in
    /// `categories`. Categories not in the list are kept after them.
    pub fn densify(&self, categories: &[Value]) -> CountTable {
        let mut groups: Vec<&Value> = Vec::new();
        for row in &self.rows {
            if !groups.contains(&&row.group) {
                groups.push(&row.group);
            }
        }

        let mut rows = Vec::with_capacity(groups.len() * categories.len());
        for group in groups {
            let observed: Vec<&CountRow> = self.rows.iter().filter(|r| &r.group == group).collect();
            for category in categories {
                match observed.iter().find(|r| &r.category == category) {
                    Some(row) => rows.push((*row).clone()),
                    None => rows.push(CountRow {
                        group: group.clone(),
                        category: category.clone(),
                        count: 0,
                        pct: 0.0,
                    }),
                }
            }
            rows.extend(
                observed
                    .into_iter()
                    .filter(|r| !categories.contains(&r.category))
                    .cloned(),
            );
        }

        CountTable {
            rows,
            ..self.clone()
        }
    }

    /// Rows of a single group.
    pub fn group(&self, key: &Value) -> impl Iterator<Item = &CountRow> {
        let key = key.clone();
        self.rows.iter().filter(move |r| r.group == key)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Count the values of `column` within each value of `group_by`.
///
/// One row per observed (group, category) pair; no zero rows are invented
/// (see [`CountTable::densify`]). Groups come out in first-seen order and
/// categories in first-seen order inside their group. Rows with a null group
/// key or null category are skipped.
pub fn count_values(dataset: &Dataset, group_by: &str, column: &str) -> Result<CountTable> {
    require_column(dataset, group_by)?;
    require_column(dataset, column)?;

    // group -> (position, [(category, count)])
    let mut order: Vec<Value> = Vec::new();
    let mut counts: HashMap<Value, Vec<(Value, u64)>> = HashMap::new();

    for rec in &dataset.records {
        let group = field(rec, group_by);
        let category = field(rec, column);
        if group.is_null() || category.is_null() {
            continue;
        }
        let cats = counts.entry(group.clone()).or_insert_with(|| {
            order.push(group.clone());
            Vec::new()
        });
        match cats.iter_mut().find(|(c, _)| c == category) {
            Some((_, n)) => *n += 1,
            None => cats.push((category.clone(), 1)),
        }
    }

    let mut rows = Vec::new();
    for group in order {
        let cats = counts.remove(&group).unwrap_or_default();
        let total: u64 = cats.iter().map(|(_, n)| n).sum();
        for (category, count) in cats {
            rows.push(CountRow {
                group: group.clone(),
                category,
                count,
                pct: round_pct(100.0 * count as f64 / total as f64),
            });
        }
    }

    log::debug!(
        "aggregate: {} ({group_by}, {column}) pairs from {} rows",
        rows.len(),
        dataset.len()
    );
    Ok(CountTable {
        group_column: group_by.to_string(),
        category_column: column.to_string(),
        rows,
    })
}

// ---------------------------------------------------------------------------
// General aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggOp {
    /// Number of non-null values.
    Count,
    Sum,
    Mean,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggOp::Count => "count",
            AggOp::Sum => "sum",
            AggOp::Mean => "mean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// One key per grouping column, in the same order.
    pub keys: Vec<Value>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    pub group_columns: Vec<String>,
    pub value_column: String,
    pub op: AggOp,
    pub rows: Vec<AggregateRow>,
}

/// Running state of one group.
#[derive(Default)]
struct Accumulator {
    count: u64,
    int_sum: i64,
    float_sum: f64,
    any_float: bool,
}

impl Accumulator {
    fn push(&mut self, value: &Value, column: &str, op: AggOp) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        self.count += 1;
        if op == AggOp::Count {
            return Ok(());
        }
        match value {
            Value::Integer(i) => {
                if op == AggOp::Sum {
                    self.int_sum = self
                        .int_sum
                        .checked_add(*i)
                        .ok_or_else(|| PipelineError::Overflow(column.to_string()))?;
                }
                self.float_sum += *i as f64;
            }
            Value::Float(f) => {
                self.any_float = true;
                self.float_sum += f;
            }
            other => {
                return Err(PipelineError::NonNumeric {
                    column: column.to_string(),
                    value: other.to_string(),
                })
            }
        }
        Ok(())
    }

    fn finish(&self, op: AggOp) -> Value {
        match op {
            AggOp::Count => Value::Integer(self.count as i64),
            AggOp::Sum if self.any_float => Value::Float(self.float_sum),
            AggOp::Sum => Value::Integer(self.int_sum),
            AggOp::Mean if self.count == 0 => Value::Null,
            AggOp::Mean => Value::Float(self.float_sum / self.count as f64),
        }
    }
}

/// Aggregate `value_column` with `op` for every distinct tuple of
/// `group_columns`. Tuples come out in first-seen order; rows with a null in
/// any grouping column are skipped.
pub fn aggregate(
    dataset: &Dataset,
    group_columns: &[&str],
    value_column: &str,
    op: AggOp,
) -> Result<AggregateTable> {
    if group_columns.is_empty() {
        return Err(PipelineError::InvalidParameter(
            "aggregate needs at least one grouping column".to_string(),
        ));
    }
    for col in group_columns {
        require_column(dataset, col)?;
    }
    require_column(dataset, value_column)?;

    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut groups: HashMap<Vec<Value>, Accumulator> = HashMap::new();

    for rec in &dataset.records {
        let keys: Vec<Value> = group_columns.iter().map(|c| field(rec, c).clone()).collect();
        if keys.iter().any(Value::is_null) {
            continue;
        }
        if !groups.contains_key(&keys) {
            order.push(keys.clone());
        }
        groups
            .entry(keys)
            .or_default()
            .push(field(rec, value_column), value_column, op)?;
    }

    let rows = order
        .into_iter()
        .map(|keys| {
            let value = groups
                .get(&keys)
                .map(|acc| acc.finish(op))
                .unwrap_or(Value::Null);
            AggregateRow { keys, value }
        })
        .collect();

    Ok(AggregateTable {
        group_columns: group_columns.iter().map(|c| c.to_string()).collect(),
        value_column: value_column.to_string(),
        op,
        rows,
    })
}
