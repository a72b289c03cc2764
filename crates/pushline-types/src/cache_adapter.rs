//! Adapter for the shared (cross-process) cache tier.
//!
//! Values are opaque strings; the cache above it is responsible for encoding.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::prelude::*;

#[async_trait]
pub trait CacheAdapter: Debug + Send + Sync {
	/// Reads a value. Expired entries must be reported as `None`.
	async fn get(&self, key: &str) -> ClResult<Option<Box<str>>>;

	/// Stores a value that expires after `ttl`
	async fn set(&self, key: &str, value: &str, ttl: Duration) -> ClResult<()>;

	/// Removes a value. Removing a missing key is not an error.
	async fn delete(&self, key: &str) -> ClResult<()>;

	/// Releases connection handles. Must be idempotent.
	async fn dispose(&self) {}
}

// vim: ts=4
