//! Participation report pipeline.
//!
//! Raw participation records (attendance minutes, visit counts, region, sex,
//! date) are normalized, filtered, checked against minimum requirements and
//! counted per date, producing the tables behind the dashboard charts.
//!
//! # Example
//!
//! ```no_run
//! use attendance_report::prelude::*;
//!
//! let raw = load_files(&["PIBSE 2024.csv"]).unwrap();
//! let report = run_report(&raw, &ReportConfig::default()).unwrap();
//! for breakdown in &report.breakdowns {
//!     println!("{}: {} rows", breakdown.column, breakdown.table.rows.len());
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::config::{FilterConfig, ReportConfig, RequirementConfig};
    pub use crate::data::export::{aggregate_table_batch, count_table_batch, dataset_batch};
    pub use crate::data::loader::{load_file, load_files};
    pub use crate::data::model::{Dataset, Record, Sex, Value};
    pub use crate::error::{PipelineError, Result, Stage};
    pub use crate::pipeline::aggregate::{
        aggregate, count_values, AggOp, AggregateRow, AggregateTable, CountRow, CountTable,
    };
    pub use crate::pipeline::filter::{apply_filters, filtered_indices, FilterSpec};
    pub use crate::pipeline::normalize::{normalize, NormalizeConfig};
    pub use crate::pipeline::operator::{comparator, Operator};
    pub use crate::pipeline::requirement::{evaluate, RequirementSet, RequirementSpec, NO, YES};
    pub use crate::pipeline::{run_report, Breakdown, Report};
}
