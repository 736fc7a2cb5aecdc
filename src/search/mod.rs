//! Retrieval pipeline: multi-source fan-out, semantic ranking, and report formatting.

pub(crate) mod engine;
pub(crate) mod format;
pub(crate) mod rank;

pub use engine::{SearchError, SearchRequest, retrieve};
pub use format::{FormatRegistry, format_json};
pub use rank::RankOptions;
