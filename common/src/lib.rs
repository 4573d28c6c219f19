//! Shared runtime plumbing for the trade-flow workspace: logging setup,
//! correlation ids and span helpers.

pub mod logger;

pub use logger::{TraceId, analyzer_span, init_logger, init_logger_json, task_span, warn_if_slow};
