//! Service worker subscription database operations

use pushline::prelude::*;
use pushline::subscription_adapter::SwSubscription;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

fn from_row(row: &SqliteRow) -> Result<SwSubscription, sqlx::Error> {
	Ok(SwSubscription {
		id: row.try_get::<String, _>("id")?.into(),
		user_id: row.try_get::<String, _>("user_id")?.into(),
		endpoint: row.try_get::<String, _>("endpoint")?.into(),
		auth: row.try_get::<String, _>("auth")?.into(),
		publickey: row.try_get::<String, _>("publickey")?.into(),
		send_read_message: row.try_get("send_read_message")?,
		created_at: Timestamp(row.try_get("created_at")?),
	})
}

/// List the subscriptions of a user, oldest first
pub async fn list_by_user(db: &SqlitePool, user_id: &str) -> ClResult<Vec<SwSubscription>> {
	let rows = sqlx::query(
		"SELECT id, user_id, endpoint, auth, publickey, send_read_message, created_at
		 FROM sw_subscriptions
		 WHERE user_id = ?
		 ORDER BY created_at, id",
	)
	.bind(user_id)
	.fetch_all(db)
	.await
	.inspect_err(inspect)
	.or(Err(Error::DbError))?;

	rows.iter()
		.map(|row| from_row(row).inspect_err(inspect).or(Err(Error::DbError)))
		.collect()
}

/// Store a new subscription
///
/// Registering the same (user, endpoint, auth, publickey) again is a no-op. A registration of
/// a known endpoint with new keys replaces the old record.
pub async fn create(db: &SqlitePool, subscription: &SwSubscription) -> ClResult<()> {
	let mut tx = db.begin().await.inspect_err(inspect).or(Err(Error::DbError))?;

	let existing = sqlx::query(
		"SELECT id FROM sw_subscriptions
		 WHERE user_id = ? AND endpoint = ? AND auth = ? AND publickey = ?",
	)
	.bind(&*subscription.user_id)
	.bind(&*subscription.endpoint)
	.bind(&*subscription.auth)
	.bind(&*subscription.publickey)
	.fetch_optional(&mut *tx)
	.await
	.inspect_err(inspect)
	.or(Err(Error::DbError))?;

	if existing.is_none() {
		sqlx::query("DELETE FROM sw_subscriptions WHERE user_id = ? AND endpoint = ?")
			.bind(&*subscription.user_id)
			.bind(&*subscription.endpoint)
			.execute(&mut *tx)
			.await
			.inspect_err(inspect)
			.or(Err(Error::DbError))?;

		sqlx::query(
			"INSERT INTO sw_subscriptions
			 (id, user_id, endpoint, auth, publickey, send_read_message, created_at)
			 VALUES (?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(&*subscription.id)
		.bind(&*subscription.user_id)
		.bind(&*subscription.endpoint)
		.bind(&*subscription.auth)
		.bind(&*subscription.publickey)
		.bind(subscription.send_read_message)
		.bind(subscription.created_at.0)
		.execute(&mut *tx)
		.await
		.inspect_err(inspect)
		.or(Err(Error::DbError))?;
	}

	tx.commit().await.inspect_err(inspect).or(Err(Error::DbError))?;
	Ok(())
}

/// Delete the subscription matching all four fields
pub async fn delete_exact(
	db: &SqlitePool,
	user_id: &str,
	endpoint: &str,
	auth: &str,
	publickey: &str,
) -> ClResult<()> {
	let res = sqlx::query(
		"DELETE FROM sw_subscriptions
		 WHERE user_id = ? AND endpoint = ? AND auth = ? AND publickey = ?",
	)
	.bind(user_id)
	.bind(endpoint)
	.bind(auth)
	.bind(publickey)
	.execute(db)
	.await
	.inspect_err(inspect)
	.or(Err(Error::DbError))?;

	debug!(user_id = %user_id, endpoint = %endpoint, deleted = res.rows_affected(), "Deleted subscription");
	Ok(())
}

// vim: ts=4
