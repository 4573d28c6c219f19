mod init;
mod span;
mod trace_id;

pub use init::{init_logger, init_logger_json};
pub use span::{analyzer_span, task_span, warn_if_slow};
pub use trace_id::TraceId;
