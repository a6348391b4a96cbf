//! The cleaning pipeline orchestrator.

use tracing::info;

use crate::cleaning::{features, missing, outliers, ranges, schema};
use crate::config::QualitySettings;
use crate::error::{Error, Result};
use crate::table::Table;

/// Run the full cleaning pipeline on a private copy of `table`.
///
/// Stage order is load-bearing: range validation runs before gap repair so
/// implausible values are treated as absent before carry-forward; outlier
/// detection runs after gap repair so it measures the dataset that ships;
/// feature derivation runs last so derived fields reflect final values.
/// Schema failure is the one hard stop. The input table is never mutated.
pub fn clean(table: &Table, quality: &QualitySettings) -> Result<Table> {
    info!(
        records = table.len(),
        columns = table.columns.len(),
        "starting data cleaning pipeline"
    );

    let (is_valid, errors) = schema::validate_schema(table);
    if !is_valid {
        return Err(Error::Schema(errors));
    }

    let cleaned = ranges::validate_ranges(table.clone(), quality);
    let cleaned = missing::resolve_missing(cleaned);
    let cleaned =
        outliers::detect_outliers(cleaned, &quality.outlier_method, quality.mask_outliers)?;
    let cleaned = features::add_derived_features(cleaned);

    info!(
        records = cleaned.len(),
        columns = cleaned.columns.len(),
        "data cleaning pipeline completed"
    );

    Ok(cleaned)
}
