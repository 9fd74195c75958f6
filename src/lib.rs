pub mod columns;
pub mod config;
pub mod fiscal;
pub mod frame;
pub mod ingest;
pub mod reference;
pub mod store;

pub use config::Config;
pub use fiscal::FiscalYear;
pub use reference::{Dimension, DIMENSIONS};
pub use store::BudgetStore;
