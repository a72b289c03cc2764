//! SQLite subscription store
//!
//! Keeps the service worker subscriptions registered by users. Records are written by the
//! registration flow through [`SubscriptionAdapterSqlite::create`] and read or pruned by the
//! dispatch pipeline through [`SubscriptionAdapter`].

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool};
use std::path::Path;

use pushline::prelude::*;
use pushline::subscription_adapter::{SubscriptionAdapter, SwSubscription};

mod schema;
mod subscription;

#[derive(Debug)]
pub struct SubscriptionAdapterSqlite {
	db: SqlitePool,
}

impl SubscriptionAdapterSqlite {
	/// Opens (or creates) the database file at `path`
	pub async fn new(path: impl AsRef<Path>) -> ClResult<Self> {
		let opts = sqlite::SqliteConnectOptions::new()
			.filename(path.as_ref())
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.or(Err(Error::DbError))?;

		schema::init_db(&db)
			.await
			.inspect_err(|err| error!("DbError: {:#?}", err))
			.or(Err(Error::DbError))?;

		info!(path = %path.as_ref().display(), "Subscription database opened");
		Ok(Self { db })
	}

	/// Registers a subscription. Re-registering an identical one is a no-op.
	pub async fn create(&self, subscription: &SwSubscription) -> ClResult<()> {
		subscription::create(&self.db, subscription).await
	}
}

#[async_trait]
impl SubscriptionAdapter for SubscriptionAdapterSqlite {
	async fn list_by_user(&self, user_id: &str) -> ClResult<Vec<SwSubscription>> {
		subscription::list_by_user(&self.db, user_id).await
	}

	async fn delete_exact(
		&self,
		user_id: &str,
		endpoint: &str,
		auth: &str,
		publickey: &str,
	) -> ClResult<()> {
		subscription::delete_exact(&self.db, user_id, endpoint, auth, publickey).await
	}
}

// vim: ts=4
