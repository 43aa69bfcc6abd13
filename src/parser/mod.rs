//! Parsing and classification of Go test sources.

pub mod extractor;
pub mod go;
pub mod lower;

pub use extractor::{classify, is_integration_file, parse_file, parse_source, scan_usage, UsageScan};
