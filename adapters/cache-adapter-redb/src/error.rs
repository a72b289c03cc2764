//! Error types for the redb cache adapter

use std::fmt;

/// Cache adapter-specific errors
#[derive(Debug)]
pub enum Error {
	/// Database operation error
	DbError(String),

	/// I/O error
	IoError(String),

	/// The adapter was disposed
	Closed,

	/// A blocking storage task did not complete
	TaskFailed(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::DbError(msg) => write!(f, "Database error: {}", msg),
			Error::IoError(msg) => write!(f, "I/O error: {}", msg),
			Error::Closed => write!(f, "Cache closed"),
			Error::TaskFailed(msg) => write!(f, "Storage task failed: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<tokio::task::JoinError> for Error {
	fn from(e: tokio::task::JoinError) -> Self {
		Error::TaskFailed(e.to_string())
	}
}

impl From<Error> for pushline::error::Error {
	fn from(err: Error) -> Self {
		match err {
			Error::Closed => pushline::error::Error::ServiceUnavailable("redb cache closed".into()),
			Error::DbError(_) | Error::IoError(_) | Error::TaskFailed(_) => {
				pushline::error::Error::DbError
			}
		}
	}
}

// vim: ts=4
