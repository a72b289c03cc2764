//! Common scalar types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the user owning a set of push subscriptions
pub type UserId = Box<str>;

/// Unix timestamp in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
	/// Milliseconds since the Unix epoch, as carried in push envelopes
	pub fn now_millis() -> i64 {
		chrono::Utc::now().timestamp_millis()
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

// vim: ts=4
