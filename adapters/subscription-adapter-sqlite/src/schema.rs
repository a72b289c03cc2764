//! Database schema initialization

use sqlx::SqlitePool;

/// Creates the subscription table and its indexes if they don't exist yet
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Service worker subscriptions
	//******************************
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS sw_subscriptions (
		id text NOT NULL,
		user_id text NOT NULL,
		endpoint text NOT NULL,
		auth text NOT NULL,
		publickey text NOT NULL,
		send_read_message integer NOT NULL DEFAULT 0,
		created_at integer NOT NULL DEFAULT (unixepoch()),
		PRIMARY KEY(id)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE UNIQUE INDEX IF NOT EXISTS idx_sw_subscriptions_endpoint
		ON sw_subscriptions(user_id, endpoint)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_sw_subscriptions_user
		ON sw_subscriptions(user_id, created_at)",
	)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;
	Ok(())
}

// vim: ts=4
