pub mod scan;
pub mod engine;

pub use scan::{RecordFilter, RecordLookup, ScanEngine, DEFAULT_PAGE_SIZE};
pub use engine::QueryEngine;
