//! Structural checks run before any cleaning stage.

use tracing::{error, info};

use crate::table::{REQUIRED_COLUMNS, Table};

/// Check that the table has every required column and at least one row.
///
/// Errors are collected rather than short-circuited so a single pass names
/// everything wrong. Pure: the table is not touched.
pub fn validate_schema(table: &Table) -> (bool, Vec<String>) {
    let mut errors = Vec::new();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !table.has_column(c))
        .copied()
        .collect();
    if !missing.is_empty() {
        errors.push(format!("missing required columns: {}", missing.join(", ")));
    }

    if table.is_empty() {
        errors.push("table is empty".to_string());
    }

    let is_valid = errors.is_empty();
    if is_valid {
        info!("schema validation passed");
    } else {
        error!(?errors, "schema validation failed");
    }

    (is_valid, errors)
}
