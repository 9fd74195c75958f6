use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::frame;

/// A slowly-changing dimension of the budget books: a stable identifier
/// column plus the display-label column that varies across fiscal years.
#[derive(Clone, Copy, Debug)]
pub struct Dimension {
    /// Table name in the output store.
    pub table: &'static str,
    /// Stable identifier column.
    pub id: &'static str,
    /// Display label column.
    pub label: &'static str,
}

/// The four dimensions every budget book carries.
pub const DIMENSIONS: [Dimension; 4] = [
    Dimension {
        table: "units",
        id: "unit",
        label: "unit_name",
    },
    Dimension {
        table: "fund_grants",
        id: "fund_grant",
        label: "fund_grant_name",
    },
    Dimension {
        table: "programs",
        id: "program",
        label: "program_name",
    },
    Dimension {
        table: "accounts",
        id: "account",
        label: "account_name",
    },
];

/// Derive the reference table for one dimension from the combined dataset.
///
/// Identifiers are stable across fiscal years while their display labels
/// drift, so any historical fact row must still resolve to the latest known
/// label without losing the label history. The derivation:
///
/// 1. project onto (id, label, time) and drop exact duplicate rows;
/// 2. compute `max(time)` per identifier;
/// 3. mark every entry whose time equals its identifier's maximum with
///    `current_label = 1`, everything else explicitly `0`.
///
/// Entries with a missing identifier or time are kept but never current.
/// Two distinct labels tied at the same maximum time are both marked
/// current; the tie is a source-data anomaly and is left visible rather
/// than broken arbitrarily.
pub fn reference_table(
    combined: &RecordBatch,
    id: &str,
    label: &str,
    time: &str,
) -> Result<RecordBatch> {
    let ids = frame::string_column(combined, id)?;
    let labels = frame::string_column(combined, label)?;
    let times = frame::string_column(combined, time)?;

    // 1) project + deduplicate, keeping first-seen order
    let mut seen = HashSet::new();
    let mut entries: Vec<(Option<String>, Option<String>, Option<String>)> = Vec::new();
    for row in 0..combined.num_rows() {
        let entry = (cell(ids, row), cell(labels, row), cell(times, row));
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    // 2) latest time observed per identifier; two-digit fiscal year tags
    //    compare lexicographically in year order
    let mut latest: HashMap<String, String> = HashMap::new();
    for (entry_id, _, entry_time) in &entries {
        let (Some(entry_id), Some(entry_time)) = (entry_id, entry_time) else {
            continue;
        };
        match latest.get_mut(entry_id.as_str()) {
            Some(current_max) => {
                if entry_time.as_str() > current_max.as_str() {
                    *current_max = entry_time.clone();
                }
            }
            None => {
                latest.insert(entry_id.clone(), entry_time.clone());
            }
        }
    }

    // 3) flag the latest entries; the fill to 0 is explicit, never null
    let current: Vec<i64> = entries
        .iter()
        .map(|(entry_id, _, entry_time)| {
            match (entry_id.as_deref(), entry_time.as_deref()) {
                (Some(entry_id), Some(entry_time)) => {
                    (latest.get(entry_id).map(String::as_str) == Some(entry_time)) as i64
                }
                _ => 0,
            }
        })
        .collect();

    let id_values: Vec<Option<String>> = entries.iter().map(|e| e.0.clone()).collect();
    let label_values: Vec<Option<String>> = entries.iter().map(|e| e.1.clone()).collect();
    let time_values: Vec<Option<String>> = entries.iter().map(|e| e.2.clone()).collect();

    let schema = Schema::new(vec![
        Field::new(id, DataType::Utf8, true),
        Field::new(label, DataType::Utf8, true),
        Field::new(time, DataType::Utf8, true),
        Field::new("current_label", DataType::Int64, false),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(id_values)),
        Arc::new(StringArray::from(label_values)),
        Arc::new(StringArray::from(time_values)),
        Arc::new(Int64Array::from(current)),
    ];

    let table = RecordBatch::try_new(Arc::new(schema), columns)
        .with_context(|| format!("building reference table for `{}`", id))?;
    debug!(
        dimension = id,
        entries = table.num_rows(),
        "derived reference table"
    );
    Ok(table)
}

/// A cell is absent when null or empty after trimming.
fn cell(values: &StringArray, row: usize) -> Option<String> {
    if values.is_null(row) {
        return None;
    }
    let value = values.value(row).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
