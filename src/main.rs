use anyhow::Result;
use budgetbook::{
    config::Config,
    frame, ingest,
    reference::{self, DIMENSIONS},
    store::BudgetStore,
};
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) load config ──────────────────────────────────────────────
    let config = Config::load(Path::new("budgetbook.yaml"))?;
    info!(
        raw_dir = %config.raw_dir.display(),
        db = %config.db_path.display(),
        "configured"
    );

    // ─── 3) discover yearly budget books ─────────────────────────────
    let sources = ingest::discover_sources(&config.raw_dir)?;
    if sources.is_empty() {
        info!("no source files; exit");
        return Ok(());
    }
    info!("{} budget books to load", sources.len());

    // ─── 4) read and normalize each year, in order ───────────────────
    let mut store = BudgetStore::open(&config.db_path)?;
    let mut frames = Vec::with_capacity(sources.len());
    for source in &sources {
        info!(year = %source.fiscal_year, path = %source.path.display(), "loading");
        let frame = ingest::read_year_frame(&source.path, source.fiscal_year)?;
        let file_name = source
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        store.log_load(&file_name, &source.fiscal_year.tag(), frame.num_rows())?;
        frames.push(frame);
    }

    // ─── 5) union into the combined dataset ──────────────────────────
    let combined = frame::union_frames(&frames)?;
    info!(
        rows = combined.num_rows(),
        columns = combined.num_columns(),
        "combined dataset"
    );

    // ─── 6) convert amount columns to numbers ────────────────────────
    let combined = frame::convert_amount_columns(&combined)?;

    // ─── 7) derive and write the reference tables ────────────────────
    for dim in &DIMENSIONS {
        let table = reference::reference_table(&combined, dim.id, dim.label, "fiscal_year")?;
        store.write_table(dim.table, &table)?;
    }

    // ─── 8) write the facts and the read view ────────────────────────
    let facts = frame::strip_label_columns(&combined)?;
    store.write_table("budgets", &facts)?;
    store.create_budget_view()?;

    info!("all done");
    Ok(())
}
