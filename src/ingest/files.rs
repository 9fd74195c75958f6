use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

use crate::fiscal::FiscalYear;

/// One yearly budget book discovered on disk.
#[derive(Debug, Clone)]
pub struct YearlySource {
    pub path: PathBuf,
    pub fiscal_year: FiscalYear,
}

/// Discover yearly source files under `raw_dir`, in file-name order. Each
/// file name must carry its two-digit fiscal year just before the
/// extension.
pub fn discover_sources(raw_dir: &Path) -> Result<Vec<YearlySource>> {
    let pattern = format!("{}/*.csv", raw_dir.display());

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern for source discovery")? {
        let path = entry.context("reading glob entry")?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let fiscal_year = FiscalYear::from_file_name(&path)?;
        sources.push(YearlySource { path, fiscal_year });
    }
    Ok(sources)
}
