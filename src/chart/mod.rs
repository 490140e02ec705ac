pub mod aggregate;
pub mod classify;
pub mod exec;
pub mod fetch;
pub mod layout;
pub mod output;

pub use aggregate::aggregate;
pub use classify::{classify, percentile_rank, RankCache};
pub use exec::{exec, exec_stats, OutputFormat};
pub use fetch::fetch_changes;
pub use layout::{render, DEFAULT_SCALE_WIDTH};
pub use output::{write_chart, write_json, write_ndjson, write_stats, Painter};
