pub use pushline_types::error::{ClResult, Error};
pub use pushline_types::types::{Timestamp, UserId};

pub use tracing::{debug, error, info, warn};

// vim: ts=4
