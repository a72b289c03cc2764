//! Error type shared by every pushline crate

use std::fmt;

pub type ClResult<T> = std::result::Result<T, Error>;

/// Workspace-wide error
///
/// Kept `Clone` so a single-flight fetch result can be handed to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
	NotFound,
	DbError,
	Parse,
	ConfigError(String),
	ServiceUnavailable(String),
	NetworkError(String),
	Internal(String),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::NotFound => write!(f, "not found"),
			Error::DbError => write!(f, "database error"),
			Error::Parse => write!(f, "parse error"),
			Error::ConfigError(msg) => write!(f, "configuration error: {}", msg),
			Error::ServiceUnavailable(msg) => write!(f, "service unavailable: {}", msg),
			Error::NetworkError(msg) => write!(f, "network error: {}", msg),
			Error::Internal(msg) => write!(f, "internal error: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		tracing::warn!("JSON error: {}", err);
		Error::Parse
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Error::Internal(format!("I/O error: {}", err))
	}
}


// vim: ts=4
