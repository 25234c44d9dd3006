//! Core library for summa: bounded-concurrency mapper, CSV group summaries,
//! JSON shape summaries and config. Used by the CLI binary.

pub mod config;
pub mod csv_summary;
pub mod error;
pub mod json_summary;
pub mod task_queue;

// Re-export main API for CLI
pub use config::{load_config, resolve_concurrency, Config};
pub use csv_summary::{
    summarize_csv_file, summarize_csv_files, summarize_csv_str, CsvOptions, CsvSummary, GroupStats,
};
pub use error::{MapError, SummaError};
pub use json_summary::{
    summarize_json_file, summarize_json_files, summarize_json_str, JsonShape, JsonSummary,
};
#[cfg(feature = "async")]
pub use json_summary::{summarize_json_file_async, summarize_json_files_async};
pub use task_queue::{map_limit, BoundedMapper};
#[cfg(feature = "async")]
pub use task_queue::map_limit_async;
