use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::columns;
use crate::fiscal::FiscalYear;

const BATCH_SIZE: usize = 8192;

/// Read one yearly budget book into a string-typed batch, normalize its
/// column names, and tag every row with the file's fiscal year.
pub fn read_year_frame(path: &Path, fiscal_year: FiscalYear) -> Result<RecordBatch> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source file {}", path.display()))?;
    let batch =
        csv_to_string_batch(&content).with_context(|| format!("parsing {}", path.display()))?;
    let batch = columns::normalize_columns(&batch, fiscal_year)?;
    let batch = tag_fiscal_year(&batch, fiscal_year)?;
    debug!(path = %path.display(), rows = batch.num_rows(), "loaded yearly frame");
    Ok(batch)
}

/// Parse CSV content into a single all-`Utf8` batch. The header row names
/// the columns; every cell stays a string until the combined dataset is
/// typed in one pass.
fn csv_to_string_batch(content: &str) -> Result<RecordBatch> {
    let mut header_reader = csv::ReaderBuilder::new().from_reader(Cursor::new(content.as_bytes()));
    let headers: Vec<String> = header_reader
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(anyhow!("source file has no header row"));
    }

    let fields: Vec<Field> = headers
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let cursor = Cursor::new(content.as_bytes());
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .build(cursor)
        .context("creating CSV reader")?;

    let batches: Vec<RecordBatch> = reader
        .collect::<Result<_, _>>()
        .context("reading CSV batches")?;
    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    concat_batches(&schema, &batches).context("concatenating CSV batches")
}

/// Set the `fiscal_year` tag on every row. A source column that normalized
/// to exactly `fiscal_year` is overwritten; otherwise the tag is appended.
fn tag_fiscal_year(batch: &RecordBatch, fiscal_year: FiscalYear) -> Result<RecordBatch> {
    let tag: ArrayRef = Arc::new(StringArray::from(vec![
        fiscal_year.tag();
        batch.num_rows()
    ]));

    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    let mut columns = batch.columns().to_vec();

    match schema.index_of("fiscal_year") {
        Ok(idx) => columns[idx] = tag,
        Err(_) => {
            fields.push(Field::new("fiscal_year", DataType::Utf8, true));
            columns.push(tag);
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("tagging rows with the fiscal year")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame;

    #[test]
    fn reads_and_tags_a_yearly_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("budget_book_23.csv");
        fs::write(
            &path,
            "Unit,Unit Name,FY23 Adopted,FY22 Actual\n100,Parks,5000,4800\n200,Water,900,870\n",
        )?;

        let batch = read_year_frame(&path, FiscalYear::new(23))?;
        assert_eq!(batch.num_rows(), 2);

        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "unit",
                "unit_name",
                "fiscal_year_adopted",
                "prior_year_actual",
                "fiscal_year"
            ]
        );

        let tags = frame::string_column(&batch, "fiscal_year")?;
        assert_eq!(tags.value(0), "FY23");
        assert_eq!(tags.value(1), "FY23");
        Ok(())
    }

    #[test]
    fn overwrites_a_source_column_named_fiscal_year() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("budget_book_23.csv");
        fs::write(&path, "unit,fy23\n100,stale\n")?;

        let batch = read_year_frame(&path, FiscalYear::new(23))?;
        assert_eq!(batch.num_columns(), 2);

        let tags = frame::string_column(&batch, "fiscal_year")?;
        assert_eq!(tags.value(0), "FY23");
        Ok(())
    }

    #[test]
    fn rejects_an_empty_file() {
        assert!(csv_to_string_batch("").is_err());
    }

    /// Full pipeline over two yearly fixture files: discover, read, union,
    /// convert, derive references, load, and query the view.
    #[test]
    fn harmonizes_two_budget_books_end_to_end() -> Result<()> {
        use crate::ingest;
        use crate::reference::{self, DIMENSIONS};
        use crate::store::BudgetStore;

        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("budget_book_22.csv"),
            "Unit,Unit Name,Fund Grant,Fund Grant Name,Program,Program Name,Same,Account Name,FY22 Adopted,FY21 Actual\n\
             100,Parks,F1,General,P1,Upkeep,A1,Wages,5000,4800\n",
        )?;
        fs::write(
            dir.path().join("budget_book_23.csv"),
            "Unit,Unit Name,Fund Grant,Fund Grant Name,Program,Program Name,Account,Account Name,FY23 Adopted,FY22 Actual\n\
             100,Parks & Rec,F1,General,P1,Upkeep,A1,Wages,5600,5100\n",
        )?;

        let sources = ingest::discover_sources(dir.path())?;
        assert_eq!(sources.len(), 2);

        let mut frames = Vec::new();
        for source in &sources {
            frames.push(read_year_frame(&source.path, source.fiscal_year)?);
        }
        let combined = crate::frame::union_frames(&frames)?;
        let combined = crate::frame::convert_amount_columns(&combined)?;

        // year-specific columns landed on the two logical roles
        assert!(combined.schema_ref().index_of("fiscal_year_adopted").is_ok());
        assert!(combined.schema_ref().index_of("prior_year_actual").is_ok());

        let mut store = BudgetStore::open_in_memory()?;
        for dim in &DIMENSIONS {
            let table = reference::reference_table(&combined, dim.id, dim.label, "fiscal_year")?;
            store.write_table(dim.table, &table)?;
        }
        store.write_table("budgets", &crate::frame::strip_label_columns(&combined)?)?;
        store.create_budget_view()?;

        // the FY22 fact resolves to the latest label
        let label: String = store.connection().query_row(
            "SELECT unit_name FROM budget_view WHERE fiscal_year = 'FY22'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(label, "Parks & Rec");

        // amounts came through as numbers
        let adopted: f64 = store.connection().query_row(
            "SELECT fiscal_year_adopted FROM budget_view WHERE fiscal_year = 'FY23'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(adopted, 5600.0);
        Ok(())
    }
}
