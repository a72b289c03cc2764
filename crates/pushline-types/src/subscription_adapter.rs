//! Adapter that owns the durable set of service worker push subscriptions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::prelude::*;

/// One registered push endpoint of a user
///
/// Identity is `(user_id, endpoint)`. Records are created by the registration flow and are
/// never mutated by the dispatch pipeline, only deleted when the endpoint is reported gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwSubscription {
	pub id: Box<str>,
	pub user_id: UserId,
	/// Push service URL of the client
	pub endpoint: Box<str>,
	/// Auth secret (base64url)
	pub auth: Box<str>,
	/// Client P-256 public key, `p256dh` in the browser API (base64url)
	pub publickey: Box<str>,
	/// Whether `readAllNotifications` events are delivered to this endpoint
	#[serde(default)]
	pub send_read_message: bool,
	pub created_at: Timestamp,
}

/// Durable subscription store
///
/// Every `SubscriptionAdapter` implementation is required to implement this trait.
#[async_trait]
pub trait SubscriptionAdapter: Debug + Send + Sync {
	/// Lists every subscription of a user, in a stable order (possibly empty)
	async fn list_by_user(&self, user_id: &str) -> ClResult<Vec<SwSubscription>>;

	/// Deletes the subscription matching all of the given fields.
	///
	/// Deleting a record that no longer exists is not an error.
	async fn delete_exact(
		&self,
		user_id: &str,
		endpoint: &str,
		auth: &str,
		publickey: &str,
	) -> ClResult<()>;
}

// vim: ts=4
