//! Data validation and cleaning.
//!
//! This module takes raw observation tables through schema validation,
//! range masking, missing-value repair, outlier detection, and feature
//! derivation, and computes quality reports over any table snapshot.

pub mod features;
pub mod missing;
pub mod outliers;
pub mod pipeline;
pub mod ranges;
pub mod report;
pub mod schema;
pub mod utility;

pub use features::add_derived_features;
pub use missing::resolve_missing;
pub use outliers::detect_outliers;
pub use pipeline::clean;
pub use ranges::validate_ranges;
pub use report::{ColumnSummary, DateRange, QualityReport, report};
pub use schema::validate_schema;
