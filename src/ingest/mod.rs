pub mod files;
pub mod read;

pub use files::{discover_sources, YearlySource};
pub use read::read_year_frame;
