use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, Connection};
use tracing::info;

/// SQLite-backed output store for the harmonized budget books. A run
/// rebuilds every table from scratch; there is no append path.
pub struct BudgetStore {
    conn: Connection,
}

impl BudgetStore {
    /// Open (or create) the store at `path`, creating parent directories
    /// as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating store directory {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening budget store {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Open an in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory budget store")?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Recreate `table` from `batch`: drop, create with column types mapped
    /// from the batch schema, and insert every row inside one transaction.
    pub fn write_table(&mut self, table: &str, batch: &RecordBatch) -> Result<()> {
        let schema = batch.schema();

        self.conn
            .execute(&format!("DROP TABLE IF EXISTS \"{}\"", table), [])
            .with_context(|| format!("dropping stale table `{}`", table))?;

        let decls: Vec<String> = schema
            .fields()
            .iter()
            .map(|field| format!("\"{}\" {}", field.name(), sql_type(field.data_type())))
            .collect();
        self.conn
            .execute(
                &format!("CREATE TABLE \"{}\" ({})", table, decls.join(", ")),
                [],
            )
            .with_context(|| format!("creating table `{}`", table))?;

        let placeholders = vec!["?"; batch.num_columns()].join(", ");
        let insert = format!("INSERT INTO \"{}\" VALUES ({})", table, placeholders);

        let tx = self.conn.transaction().context("starting insert transaction")?;
        {
            let mut stmt = tx
                .prepare(&insert)
                .with_context(|| format!("preparing insert for `{}`", table))?;
            for row in 0..batch.num_rows() {
                let values: Vec<Value> = batch
                    .columns()
                    .iter()
                    .map(|column| sql_value(column, row))
                    .collect::<Result<_>>()?;
                stmt.execute(params_from_iter(values))
                    .with_context(|| format!("inserting row {} into `{}`", row, table))?;
            }
        }
        tx.commit()
            .with_context(|| format!("committing inserts into `{}`", table))?;

        info!(table, rows = batch.num_rows(), "wrote table");
        Ok(())
    }

    /// Create the denormalized read view: every fact column plus each
    /// dimension's current label. Left joins keep facts whose keys match
    /// no reference entry; their labels come through null.
    pub fn create_budget_view(&self) -> Result<()> {
        self.conn
            .execute_batch(BUDGET_VIEW_SQL)
            .context("creating budget_view")?;
        info!("created budget_view");
        Ok(())
    }

    /// Record one ingested source file, for inspection after a run.
    pub fn log_load(&self, file_name: &str, fiscal_year: &str, rows: usize) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS load_log (
                    file_name TEXT NOT NULL,
                    fiscal_year TEXT NOT NULL,
                    row_count INTEGER NOT NULL,
                    loaded_at TEXT NOT NULL
                )",
                [],
            )
            .context("creating load_log")?;
        self.conn
            .execute(
                "INSERT INTO load_log (file_name, fiscal_year, row_count, loaded_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![file_name, fiscal_year, rows as i64, Utc::now().to_rfc3339()],
            )
            .context("recording load_log entry")?;
        Ok(())
    }
}

fn sql_type(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Float64 => "REAL",
        DataType::Int64 => "INTEGER",
        _ => "TEXT",
    }
}

fn sql_value(column: &ArrayRef, row: usize) -> Result<Value> {
    if column.is_null(row) {
        return Ok(Value::Null);
    }
    if let Some(values) = column.as_any().downcast_ref::<StringArray>() {
        return Ok(Value::Text(values.value(row).to_string()));
    }
    if let Some(values) = column.as_any().downcast_ref::<Float64Array>() {
        return Ok(Value::Real(values.value(row)));
    }
    if let Some(values) = column.as_any().downcast_ref::<Int64Array>() {
        return Ok(Value::Integer(values.value(row)));
    }
    Err(anyhow!(
        "unsupported column type {:?} for the budget store",
        column.data_type()
    ))
}

const BUDGET_VIEW_SQL: &str = r#"
DROP VIEW IF EXISTS budget_view;
CREATE VIEW
    budget_view
AS SELECT
    b.*,
    u.unit_name,
    fg.fund_grant_name,
    p.program_name,
    a.account_name
FROM
    budgets b
LEFT JOIN
    fund_grants fg
ON
    fg.fund_grant = b.fund_grant
    AND fg.current_label = 1
LEFT JOIN
    programs p
ON
    p.program = b.program
    AND p.current_label = 1
LEFT JOIN
    accounts a
ON
    a.account = b.account
    AND a.current_label = 1
LEFT JOIN
    units u
ON
    u.unit = b.unit
    AND u.current_label = 1;
"#;
