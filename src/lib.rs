pub mod config;
pub mod consolidate;
pub mod error;
pub mod export;
pub mod extract;
pub mod heatmap;
pub mod loader;
pub mod locate;
pub mod process;
pub mod schema;

pub use config::LoaderConfig;
pub use consolidate::ConsolidatedDataset;
pub use error::{DateError, HeatmapError};
pub use loader::{corrections_loader, load_corrections, FileOutcome, FileResult, LoadReport};
pub use process::date_parser::DateInput;
