pub use pushline_types::error::{ClResult, Error};
pub use pushline_types::types::{Timestamp, UserId};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
