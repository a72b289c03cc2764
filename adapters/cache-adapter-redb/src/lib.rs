//! Redb-based shared cache tier
//!
//! Implements `CacheAdapter` on a single redb file so cached subscription lists survive
//! process restarts and can be shared by processes on the same host.
//!
//! # Storage Layout
//!
//! - `cache_entries` - key -> (expires_at, value), `expires_at` in Unix milliseconds
//!
//! Expired entries are dropped when read and by [`CacheAdapterRedb::purge_expired`]. Storage
//! work runs on the blocking thread pool.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use async_trait::async_trait;
use redb::{ReadableDatabase, ReadableTable};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use pushline::cache_adapter::CacheAdapter;
use pushline::error::{ClResult, Error as ClError};
use pushline::prelude::{Timestamp, debug, info};

mod error;
pub use error::Error;

// Storage table definitions
mod tables {
	use redb::TableDefinition;

	/// Cached values: key -> (expires_at_ms, value)
	pub const TABLE_ENTRIES: TableDefinition<&str, (i64, &str)> =
		TableDefinition::new("cache_entries");
}

use tables::TABLE_ENTRIES;

fn db_error(what: &str, err: impl std::fmt::Display) -> ClError {
	ClError::from(Error::DbError(format!("{}: {}", what, err)))
}

fn expires_at(ttl: Duration) -> i64 {
	let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
	Timestamp::now_millis().saturating_add(ttl_ms)
}

/// Runs redb work on the blocking thread pool
async fn blocking<R, F>(f: F) -> ClResult<R>
where
	R: Send + 'static,
	F: FnOnce() -> ClResult<R> + Send + 'static,
{
	tokio::task::spawn_blocking(f).await.map_err(|e| ClError::from(Error::from(e)))?
}

/// Shared cache tier using redb for storage
#[derive(Debug)]
pub struct CacheAdapterRedb {
	/// `None` once disposed
	db: RwLock<Option<Arc<redb::Database>>>,
}

impl CacheAdapterRedb {
	/// Opens (or creates) the cache database at `path`
	pub async fn new(path: impl AsRef<Path>) -> ClResult<Self> {
		let path = path.as_ref().to_path_buf();
		if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(dir).await.map_err(|e| {
				ClError::from(Error::IoError(format!("Failed to create storage directory: {}", e)))
			})?;
		}

		let db_path = path.clone();
		let db = blocking(move || {
			let db = redb::Database::create(&db_path)
				.map_err(|e| db_error("Failed to open database", e))?;

			// Create table if it doesn't exist
			let tx =
				db.begin_write().map_err(|e| db_error("Failed to begin write transaction", e))?;
			tx.open_table(TABLE_ENTRIES).map_err(|e| db_error("Failed to create table", e))?;
			tx.commit().map_err(|e| db_error("Failed to commit table creation", e))?;
			Ok(db)
		})
		.await?;

		info!("Opened redb cache at {:?}", path);
		Ok(Self { db: RwLock::new(Some(Arc::new(db))) })
	}

	async fn db(&self) -> ClResult<Arc<redb::Database>> {
		self.db.read().await.as_ref().map(Arc::clone).ok_or_else(|| ClError::from(Error::Closed))
	}

	fn remove(db: &redb::Database, key: &str) -> ClResult<()> {
		let tx = db.begin_write().map_err(|e| db_error("Failed to begin write transaction", e))?;
		{
			let mut table =
				tx.open_table(TABLE_ENTRIES).map_err(|e| db_error("Failed to open table", e))?;
			table.remove(key).map_err(|e| db_error("Failed to remove entry", e))?;
		}
		tx.commit().map_err(|e| db_error("Failed to commit removal", e))?;
		Ok(())
	}

	/// Removes every expired entry, returns how many were removed
	pub async fn purge_expired(&self) -> ClResult<usize> {
		let db = self.db().await?;

		let purged = blocking(move || {
			let now = Timestamp::now_millis();
			let tx =
				db.begin_write().map_err(|e| db_error("Failed to begin write transaction", e))?;
			let mut purged = 0;
			{
				let mut table =
					tx.open_table(TABLE_ENTRIES).map_err(|e| db_error("Failed to open table", e))?;
				table
					.retain(|_, (expires_at, _)| {
						let keep = expires_at > now;
						if !keep {
							purged += 1;
						}
						keep
					})
					.map_err(|e| db_error("Failed to purge entries", e))?;
			}
			tx.commit().map_err(|e| db_error("Failed to commit purge", e))?;
			Ok(purged)
		})
		.await?;

		debug!("Purged {} expired cache entries", purged);
		Ok(purged)
	}
}

#[async_trait]
impl CacheAdapter for CacheAdapterRedb {
	async fn get(&self, key: &str) -> ClResult<Option<Box<str>>> {
		let db = self.db().await?;
		let key = key.to_string();

		blocking(move || {
			let entry = {
				let tx =
					db.begin_read().map_err(|e| db_error("Failed to begin read transaction", e))?;
				let table =
					tx.open_table(TABLE_ENTRIES).map_err(|e| db_error("Failed to open table", e))?;
				let value = table.get(key.as_str()).map_err(|e| db_error("Failed to read entry", e))?;
				value.map(|guard| {
					let (expires_at, value) = guard.value();
					(expires_at, Box::<str>::from(value))
				})
			};

			match entry {
				Some((expires_at, value)) if expires_at > Timestamp::now_millis() => Ok(Some(value)),
				Some(_) => {
					Self::remove(&db, &key)?;
					Ok(None)
				}
				None => Ok(None),
			}
		})
		.await
	}

	async fn set(&self, key: &str, value: &str, ttl: Duration) -> ClResult<()> {
		let db = self.db().await?;
		let key = key.to_string();
		let value = value.to_string();
		let expires_at = expires_at(ttl);

		blocking(move || {
			let tx =
				db.begin_write().map_err(|e| db_error("Failed to begin write transaction", e))?;
			{
				let mut table =
					tx.open_table(TABLE_ENTRIES).map_err(|e| db_error("Failed to open table", e))?;
				table
					.insert(key.as_str(), (expires_at, value.as_str()))
					.map_err(|e| db_error("Failed to insert entry", e))?;
			}
			tx.commit().map_err(|e| db_error("Failed to commit entry", e))?;
			Ok(())
		})
		.await
	}

	async fn delete(&self, key: &str) -> ClResult<()> {
		let db = self.db().await?;
		let key = key.to_string();
		blocking(move || Self::remove(&db, &key)).await
	}

	async fn dispose(&self) {
		if self.db.write().await.take().is_some() {
			debug!("redb cache closed");
		}
	}
}

// vim: ts=4
