//! Data layer: core types, loading, and conversion of result tables.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet   (one file per reporting year)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse files → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset  │  Vec<Record>, column index
//!   └──────────┘
//!        │
//!        ▼  (crate::pipeline)
//!   ┌──────────┐
//!   │  export  │  CountTable / AggregateTable / Dataset → Arrow RecordBatch
//!   └──────────┘
//! ```

pub mod export;
pub mod loader;
pub mod model;
