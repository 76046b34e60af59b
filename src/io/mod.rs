pub mod export;
pub mod import;

pub use export::{DataSnapshot, Exporter};
pub use import::{ImportError, ImportOptions, ImportResult, Importer};
