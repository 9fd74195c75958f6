use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::fiscal::FiscalYear;

/// Lowercase, trim, and snake-case a raw header name.
pub fn clean_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Build the exact source-column → logical-role rename map for one fiscal
/// year. Year-tagged columns land on two fixed roles: the prior-year token
/// becomes `prior_year` and the current-year token becomes `fiscal_year`.
/// The prior-year rule runs first so the current-year rule never touches an
/// already-renamed column. A column left literally named `same` is the
/// account id column in one source format and becomes `account`.
pub fn rename_map(columns: &[String], fiscal_year: FiscalYear) -> HashMap<String, String> {
    let prior = fiscal_year.prior().token();
    let current = fiscal_year.token();

    let mut map = HashMap::with_capacity(columns.len());
    for col in columns {
        let renamed = col.replace(&prior, "prior_year");
        let mut renamed = renamed.replace(&current, "fiscal_year");
        if renamed == "same" {
            renamed = "account".to_string();
        }
        if renamed != *col {
            map.insert(col.clone(), renamed);
        }
    }
    map
}

/// Rebuild `batch` with cleaned, year-normalized column names. Data is
/// untouched; only the schema changes.
pub fn normalize_columns(batch: &RecordBatch, fiscal_year: FiscalYear) -> Result<RecordBatch> {
    let schema = batch.schema();
    let cleaned: Vec<String> = schema.fields().iter().map(|f| clean_name(f.name())).collect();
    let renames = rename_map(&cleaned, fiscal_year);

    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(&cleaned)
        .map(|(field, name)| {
            let name = renames.get(name).unwrap_or(name);
            Field::new(name, field.data_type().clone(), field.is_nullable())
        })
        .collect();

    RecordBatch::try_new(Arc::new(Schema::new(fields)), batch.columns().to_vec())
        .context("rebuilding batch with normalized column names")
}
