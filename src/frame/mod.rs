pub mod convert;
pub mod union;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use arrow::array::{Array, ArrayRef, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;

pub use convert::convert_amount_columns;
pub use union::union_frames;

/// Look up a string column by name, failing fast when it is absent.
pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let idx = batch
        .schema_ref()
        .index_of(name)
        .map_err(|_| anyhow!("missing expected column `{}`", name))?;
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column `{}` is not a string column", name))
}

/// Drop every `*_name` label column. Labels live only in the reference
/// tables; the fact table keeps the stable identifiers.
pub fn strip_label_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| !field.name().contains("_name"))
        .map(|(idx, _)| idx)
        .collect();

    let fields: Vec<Arc<Field>> = keep.iter().map(|&idx| schema.fields()[idx].clone()).collect();
    let columns: Vec<ArrayRef> = keep.iter().map(|&idx| batch.column(idx).clone()).collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("dropping label columns from the fact table")
}
