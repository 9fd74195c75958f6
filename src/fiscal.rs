use std::fmt;
use std::path::Path;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing two-digit year in a source file stem, e.g. `budget_book_23`.
static STEM_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2})$").unwrap());

/// A two-digit fiscal year code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiscalYear(u8);

impl FiscalYear {
    pub fn new(year: u8) -> Self {
        FiscalYear(year % 100)
    }

    /// Extract the fiscal year encoded in the last characters of a source
    /// file name, before the extension.
    pub fn from_file_name(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("file name is not valid UTF-8: {:?}", path))?;

        let caps = STEM_YEAR.captures(stem).ok_or_else(|| {
            anyhow!(
                "no two-digit fiscal year at the end of file name `{}`",
                stem
            )
        })?;
        let year: u8 = caps[1].parse()?;
        Ok(FiscalYear(year))
    }

    /// Lowercase column token, e.g. `fy23`.
    pub fn token(&self) -> String {
        format!("fy{:02}", self.0)
    }

    /// Row tag, e.g. `FY23`.
    pub fn tag(&self) -> String {
        format!("FY{:02}", self.0)
    }

    /// The immediately prior fiscal year.
    pub fn prior(&self) -> FiscalYear {
        FiscalYear((self.0 + 99) % 100)
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{:02}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_year_from_file_name() -> Result<()> {
        let fy = FiscalYear::from_file_name(Path::new("raw/budget_book_23.csv"))?;
        assert_eq!(fy, FiscalYear::new(23));
        assert_eq!(fy.token(), "fy23");
        assert_eq!(fy.tag(), "FY23");
        Ok(())
    }

    #[test]
    fn rejects_file_name_without_year() {
        assert!(FiscalYear::from_file_name(Path::new("raw/budget_book.csv")).is_err());
    }

    #[test]
    fn prior_year_steps_back_one() {
        assert_eq!(FiscalYear::new(23).prior(), FiscalYear::new(22));
        assert_eq!(FiscalYear::new(0).prior(), FiscalYear::new(99));
    }

    #[test]
    fn single_digit_years_are_zero_padded() {
        let fy = FiscalYear::new(7);
        assert_eq!(fy.token(), "fy07");
        assert_eq!(fy.tag(), "FY07");
    }
}
