use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Float64Builder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::reference::DIMENSIONS;

/// Columns that stay text even when every value parses as a number:
/// dimension keys (so fact/reference joins are exact string equality),
/// their labels, and the fiscal year tag.
fn keeps_text(name: &str) -> bool {
    name == "fiscal_year"
        || name.contains("_name")
        || DIMENSIONS.iter().any(|dim| dim.id == name)
}

/// Convert every all-numeric string column of the combined dataset to
/// `Float64`. Empty cells and nulls convert to null; a single non-numeric
/// value keeps the whole column as text.
pub fn convert_amount_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let values = match column.as_any().downcast_ref::<StringArray>() {
            Some(values) if !keeps_text(field.name()) && is_numeric_column(values) => values,
            _ => {
                fields.push(field.as_ref().clone());
                columns.push(column.clone());
                continue;
            }
        };

        let mut builder = Float64Builder::new();
        for cell in values.iter() {
            let parsed = cell
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .and_then(|v| v.parse::<f64>().ok());
            builder.append_option(parsed);
        }
        debug!(column = %field.name(), "converted amount column to f64");
        fields.push(Field::new(field.name(), DataType::Float64, true));
        columns.push(Arc::new(builder.finish()) as ArrayRef);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("converting amount columns")
}

/// A column is numeric when it has at least one non-empty value and every
/// non-empty value parses as a float.
fn is_numeric_column(values: &StringArray) -> bool {
    let mut any = false;
    for cell in values.iter() {
        let value = match cell.map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => continue,
        };
        if value.parse::<f64>().is_err() {
            return false;
        }
        any = true;
    }
    any
}
