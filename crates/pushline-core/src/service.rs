//! Push notification dispatch
//!
//! One call fans out one delivery task per subscription of the user. Each task handles its own
//! failure: a gone endpoint is deleted from the store and the user's cache entry invalidated,
//! anything else is logged. Nothing is retried.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::cache::SubscriptionCache;
use crate::gate;
use crate::opts::PushServiceOpts;
use crate::prelude::*;
use crate::summary::Summarizer;
use crate::truncate;
use pushline_types::meta_provider::MetaProvider;
use pushline_types::notification::{PushEvent, PushEventKind};
use pushline_types::push_transport::{
	PushEndpoint, PushKeys, PushResult, PushTransport, SendOptions,
};
use pushline_types::subscription_adapter::{SubscriptionAdapter, SwSubscription};

/// Message body delivered to the service worker
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushEnvelope<'a> {
	#[serde(rename = "type")]
	typ: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	body: Option<Value>,
	user_id: &'a str,
	/// Milliseconds since the Unix epoch
	date_time: i64,
}

/// Whether `subscription` wants events of `kind`
fn accepts(kind: PushEventKind, subscription: &SwSubscription) -> bool {
	match kind {
		PushEventKind::ReadAllNotifications => subscription.send_read_message,
		PushEventKind::Notification | PushEventKind::UnreadAntennaNote => true,
	}
}

/// Delivery tasks issued by one dispatch call
///
/// Dropping the handle detaches the tasks; they still run to completion.
#[derive(Debug, Default)]
pub struct DispatchHandle {
	tasks: Vec<JoinHandle<()>>,
}

impl DispatchHandle {
	/// Number of delivery attempts issued
	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	/// Waits until every attempt, including its cleanup, has finished
	pub async fn join(self) {
		for task in self.tasks {
			if let Err(err) = task.await {
				error!(error = %err, "Push delivery task failed");
			}
		}
	}
}

/// One delivery attempt to one subscription
struct Delivery {
	user_id: Box<str>,
	subscription: SwSubscription,
	payload: Arc<str>,
	send_opts: SendOptions,
	transport: Arc<dyn PushTransport>,
	store: Arc<dyn SubscriptionAdapter>,
	cache: Arc<SubscriptionCache>,
}

impl Delivery {
	async fn run(self) {
		let endpoint = PushEndpoint {
			endpoint: self.subscription.endpoint.clone(),
			keys: PushKeys {
				auth: self.subscription.auth.clone(),
				p256dh: self.subscription.publickey.clone(),
			},
		};
		debug!(user_id = %self.user_id, endpoint = %endpoint.endpoint, "Sending push to subscription");

		match self.transport.send(&endpoint, &self.payload, &self.send_opts).await {
			PushResult::Success => {
				debug!(user_id = %self.user_id, endpoint = %endpoint.endpoint, "Push notification sent");
			}
			PushResult::SubscriptionGone { status } => {
				warn!(
					user_id = %self.user_id,
					endpoint = %endpoint.endpoint,
					status = status,
					"Push subscription gone, deleting"
				);
				self.prune().await;
			}
			PushResult::Failed(failure) => {
				warn!(
					user_id = %self.user_id,
					endpoint = %endpoint.endpoint,
					status = ?failure.status,
					headers = ?failure.headers,
					body = %failure.body,
					"Push notification failed"
				);
			}
		}
	}

	/// Deletes the exact record, then drops the user's cached subscription list
	async fn prune(&self) {
		let sub = &self.subscription;
		let res =
			self.store.delete_exact(&self.user_id, &sub.endpoint, &sub.auth, &sub.publickey).await;
		match res {
			Ok(()) => self.cache.invalidate(&self.user_id).await,
			Err(err) => {
				error!(
					user_id = %self.user_id,
					endpoint = %sub.endpoint,
					error = %err,
					"Failed to delete gone push subscription"
				);
			}
		}
	}
}

pub struct PushNotificationService {
	opts: PushServiceOpts,
	meta: Arc<dyn MetaProvider>,
	store: Arc<dyn SubscriptionAdapter>,
	transport: Arc<dyn PushTransport>,
	summarizer: Arc<dyn Summarizer>,
	cache: Arc<SubscriptionCache>,
}

impl PushNotificationService {
	pub fn new(
		opts: PushServiceOpts,
		meta: Arc<dyn MetaProvider>,
		store: Arc<dyn SubscriptionAdapter>,
		transport: Arc<dyn PushTransport>,
		summarizer: Arc<dyn Summarizer>,
		cache: Arc<SubscriptionCache>,
	) -> Self {
		Self { opts, meta, store, transport, summarizer, cache }
	}

	pub fn cache(&self) -> &Arc<SubscriptionCache> {
		&self.cache
	}

	/// Serialized payload shared by every delivery of one dispatch
	///
	/// `dateTime` is stamped once here, so all recipients of a dispatch see the same time rather
	/// than the moment of their own send.
	fn envelope(&self, user_id: &str, event: &PushEvent) -> ClResult<Arc<str>> {
		let envelope = PushEnvelope {
			typ: event.kind().as_str(),
			body: truncate::shape_event(event, self.summarizer.as_ref()),
			user_id,
			date_time: Timestamp::now_millis(),
		};
		Ok(serde_json::to_string(&envelope)?.into())
	}

	/// Pushes `event` to every subscription of `user_id`
	///
	/// Returns once the delivery attempts are issued. Fails only if the subscription list can't
	/// be obtained; per-subscription failures are handled by the attempts themselves.
	pub async fn push_notification(
		&self,
		user_id: &str,
		event: &PushEvent,
	) -> ClResult<DispatchHandle> {
		let Some(vapid) = gate::check(self.meta.as_ref(), &self.opts.server_url).await? else {
			debug!(user_id = %user_id, "Service worker push disabled");
			return Ok(DispatchHandle::default());
		};

		if let Err(err) =
			self.transport.set_vapid_details(&vapid.subject, &vapid.public_key, &vapid.private_key)
		{
			error!(error = %err, "Invalid VAPID configuration, push skipped");
			return Ok(DispatchHandle::default());
		}

		let subscriptions = self.cache.fetch(user_id).await?;
		info!(user_id = %user_id, subscriptions = subscriptions.len(), "Start push notification");

		let kind = event.kind();
		let mut shaped: Option<Arc<str>> = None;
		let mut handle = DispatchHandle::default();

		for subscription in subscriptions {
			if !accepts(kind, &subscription) {
				debug!(user_id = %user_id, endpoint = %subscription.endpoint, "Skip {}", kind.as_str());
				continue;
			}

			let payload = match shaped.clone() {
				Some(payload) => payload,
				None => {
					let payload = self.envelope(user_id, event)?;
					shaped = Some(Arc::clone(&payload));
					payload
				}
			};

			let delivery = Delivery {
				user_id: user_id.into(),
				subscription,
				payload,
				send_opts: SendOptions { proxy: self.opts.proxy.clone() },
				transport: Arc::clone(&self.transport),
				store: Arc::clone(&self.store),
				cache: Arc::clone(&self.cache),
			};
			handle.tasks.push(tokio::spawn(delivery.run()));
		}

		Ok(handle)
	}

	/// Drops the cached subscriptions of a user and loads them again
	pub async fn refresh_cache(&self, user_id: &str) -> ClResult<()> {
		self.cache.refresh(user_id).await.map(|_| ())
	}

	/// Releases the subscription cache. Call after dispatching has stopped.
	pub async fn dispose(&self) {
		self.cache.dispose().await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn subscription(send_read_message: bool) -> SwSubscription {
		SwSubscription {
			id: "s1".into(),
			user_id: "u1".into(),
			endpoint: "https://push.example.com/1".into(),
			auth: "auth".into(),
			publickey: "key".into(),
			send_read_message,
			created_at: Timestamp(0),
		}
	}

	#[test]
	fn test_accepts() {
		let opted_out = subscription(false);
		let opted_in = subscription(true);
		assert!(!accepts(PushEventKind::ReadAllNotifications, &opted_out));
		assert!(accepts(PushEventKind::ReadAllNotifications, &opted_in));
		assert!(accepts(PushEventKind::Notification, &opted_out));
		assert!(accepts(PushEventKind::UnreadAntennaNote, &opted_out));
	}

	#[test]
	fn test_envelope_shape() {
		let envelope = PushEnvelope {
			typ: "readAllNotifications",
			body: None,
			user_id: "u1",
			date_time: 1_700_000_000_000,
		};
		assert_eq!(
			serde_json::to_value(&envelope).unwrap(),
			json!({ "type": "readAllNotifications", "userId": "u1", "dateTime": 1_700_000_000_000_i64 })
		);
	}
}

// vim: ts=4
