pub mod csv_to_jsonl;
pub mod summary;

pub use csv_to_jsonl::convert;
pub use summary::{CsvSummary, summarize};
