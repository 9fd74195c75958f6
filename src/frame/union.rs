use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use arrow::array::{new_null_array, ArrayRef};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::debug;

/// Union all yearly frames into the combined dataset in one pass.
///
/// The combined schema is the first-seen ordered union of column names
/// across frames; a column missing from a frame comes through as nulls for
/// that frame's rows. Inputs are string-typed batches, so no type
/// reconciliation is needed here.
pub fn union_frames(frames: &[RecordBatch]) -> Result<RecordBatch> {
    if frames.is_empty() {
        return Err(anyhow!("no yearly frames to combine"));
    }

    let mut names: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for frame in frames {
        for field in frame.schema_ref().fields() {
            if seen.insert(field.name().clone()) {
                names.push(field.name().clone());
            }
        }
    }

    let fields: Vec<Field> = names
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut aligned = Vec::with_capacity(frames.len());
    for frame in frames {
        let columns: Vec<ArrayRef> = names
            .iter()
            .map(|name| match frame.schema_ref().index_of(name) {
                Ok(idx) => frame.column(idx).clone(),
                Err(_) => new_null_array(&DataType::Utf8, frame.num_rows()),
            })
            .collect();
        aligned.push(
            RecordBatch::try_new(schema.clone(), columns)
                .context("aligning a yearly frame to the combined schema")?,
        );
    }

    let combined = concat_batches(&schema, &aligned).context("concatenating yearly frames")?;
    debug!(
        frames = frames.len(),
        rows = combined.num_rows(),
        columns = combined.num_columns(),
        "combined yearly frames"
    );
    Ok(combined)
}
