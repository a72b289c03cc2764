//! End-to-end dispatch scenarios against recording collaborators

mod common;

use common::*;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use pushline_core::cache::SUBSCRIPTIONS_CACHE_NAME;
use pushline_core::{CacheOpts, PushNotificationService, PushServiceOpts, SubscriptionCache};
use pushline_types::cache_adapter::CacheAdapter;
use pushline_types::error::Error;
use pushline_types::meta_provider::{MetaProvider, ServerMeta};
use pushline_types::notification::{AntennaNote, AntennaRef, PushEvent};
use pushline_types::push_transport::{PushFailure, PushResult, PushTransport};
use pushline_types::subscription_adapter::{SubscriptionAdapter, SwSubscription};

const USER: &str = "user1";
const SERVER_URL: &str = "https://social.example.com";

struct Harness {
	log: EventLog,
	meta: Arc<MockMeta>,
	store: Arc<MockStore>,
	shared: Arc<MockShared>,
	transport: Arc<MockTransport>,
	summarizer: Arc<FixedSummarizer>,
	service: PushNotificationService,
}

impl Harness {
	fn new(meta: MockMeta, subscriptions: Vec<SwSubscription>) -> Self {
		Self::with_opts(meta, subscriptions, PushServiceOpts {
			server_url: SERVER_URL.into(),
			..PushServiceOpts::default()
		})
	}

	fn with_opts(meta: MockMeta, subscriptions: Vec<SwSubscription>, opts: PushServiceOpts) -> Self {
		setup_test_logging();
		let log: EventLog = Arc::new(Mutex::new(Vec::new()));
		let meta = Arc::new(meta);
		let store = Arc::new(MockStore::with(&log, USER, subscriptions));
		let shared = Arc::new(MockShared::new(&log));
		let transport = Arc::new(MockTransport::default());
		let summarizer = Arc::new(FixedSummarizer::default());

		let store_dyn: Arc<dyn SubscriptionAdapter> = store.clone();
		let shared_dyn: Arc<dyn CacheAdapter> = shared.clone();
		let cache = Arc::new(
			SubscriptionCache::subscriptions(Arc::clone(&store_dyn), shared_dyn, CacheOpts::default())
				.unwrap(),
		);

		let meta_dyn: Arc<dyn MetaProvider> = meta.clone();
		let transport_dyn: Arc<dyn PushTransport> = transport.clone();
		let service = PushNotificationService::new(
			opts,
			meta_dyn,
			store_dyn,
			transport_dyn,
			summarizer.clone(),
			cache,
		);

		Self { log, meta, store, shared, transport, summarizer, service }
	}

	async fn push(&self, event: &PushEvent) {
		self.service.push_notification(USER, event).await.unwrap().join().await;
	}

	/// Store deletes and shared tier deletes, in order
	fn cleanup_log(&self) -> Vec<String> {
		self.log
			.lock()
			.iter()
			.filter(|entry| entry.starts_with("store.delete") || entry.starts_with("shared.delete"))
			.cloned()
			.collect()
	}
}

fn mention() -> PushEvent {
	PushEvent::Notification(json!({
		"id": "n1",
		"type": "mention",
		"user": { "id": "u2", "username": "bob" },
		"note": {
			"id": "note1",
			"text": "hey @alice, look at this",
			"cw": null,
			"user": { "id": "u2", "username": "bob" },
			"reply": { "id": "note0", "text": "earlier" },
			"visibility": "public",
		},
	}))
}

fn sent_payload(transport: &MockTransport, n: usize) -> Value {
	let sends = transport.sends.lock();
	serde_json::from_str(&sends[n].1).unwrap()
}

#[tokio::test]
async fn test_no_subscriptions_sends_nothing() {
	let h = Harness::new(MockMeta::enabled(), Vec::new());

	let handle = h.service.push_notification(USER, &mention()).await.unwrap();
	assert!(handle.is_empty());
	handle.join().await;

	assert_eq!(h.transport.send_count(), 0);
	assert_eq!(h.store.list_calls(), 1);
}

#[tokio::test]
async fn test_sends_to_every_subscription() {
	let h = Harness::new(MockMeta::enabled(), vec![
		subscription(USER, 1, false),
		subscription(USER, 2, true),
	]);

	let handle = h.service.push_notification(USER, &mention()).await.unwrap();
	assert_eq!(handle.len(), 2);
	handle.join().await;

	assert_eq!(h.transport.sent_endpoints(), vec![
		"https://push.example.com/send/1".to_string(),
		"https://push.example.com/send/2".to_string(),
	]);
	assert_eq!(*h.transport.vapid.lock(), vec![(
		SERVER_URL.to_string(),
		"vapid-public".to_string(),
		"vapid-private".to_string(),
	)]);
}

#[tokio::test]
async fn test_recipients_share_one_timestamp() {
	let h = Harness::new(MockMeta::enabled(), vec![
		subscription(USER, 1, false),
		subscription(USER, 2, false),
		subscription(USER, 3, false),
	]);

	h.push(&mention()).await;

	let stamps: Vec<Value> =
		(0..3).map(|n| sent_payload(&h.transport, n)["dateTime"].clone()).collect();
	assert!(stamps[0].is_i64());
	assert!(stamps.iter().all(|stamp| *stamp == stamps[0]));
}

#[tokio::test]
async fn test_read_all_respects_opt_out() {
	let h = Harness::new(MockMeta::enabled(), vec![
		subscription(USER, 1, false),
		subscription(USER, 2, true),
	]);

	h.push(&PushEvent::ReadAllNotifications).await;
	assert_eq!(h.transport.sent_endpoints(), vec!["https://push.example.com/send/2".to_string()]);
	assert_eq!(sent_payload(&h.transport, 0)["type"], "readAllNotifications");
	assert!(sent_payload(&h.transport, 0).get("body").is_none());

	h.push(&mention()).await;
	assert_eq!(h.transport.send_count(), 3);
}

#[tokio::test]
async fn test_gone_subscription_is_deleted_then_invalidated() {
	let gone = subscription(USER, 1, false);
	let h = Harness::new(MockMeta::enabled(), vec![gone.clone(), subscription(USER, 2, false)]);
	h.transport.respond(&gone.endpoint, PushResult::SubscriptionGone { status: 410 });

	h.push(&mention()).await;

	assert_eq!(*h.store.deletes.lock(), vec![(
		USER.to_string(),
		gone.endpoint.to_string(),
		gone.auth.to_string(),
		gone.publickey.to_string(),
	)]);
	let shared_key = format!("{}:{}", SUBSCRIPTIONS_CACHE_NAME, USER);
	assert_eq!(h.cleanup_log(), vec![
		format!("store.delete:{}", USER),
		format!("shared.delete:{}", shared_key),
	]);

	// The next dispatch sees the store without the gone endpoint
	h.push(&mention()).await;
	assert_eq!(h.store.list_calls(), 2);
	assert_eq!(h.transport.send_count(), 3);
}

#[tokio::test]
async fn test_failed_delete_keeps_cache() {
	let gone = subscription(USER, 1, false);
	let h = Harness::new(MockMeta::enabled(), vec![gone.clone()]);
	h.transport.respond(&gone.endpoint, PushResult::SubscriptionGone { status: 410 });
	h.store.fail_delete.store(true, Ordering::SeqCst);

	h.push(&mention()).await;

	assert_eq!(h.cleanup_log(), vec![format!("store.delete:{}", USER)]);
	assert_eq!(h.shared.deletes_of(&format!("{}:{}", SUBSCRIPTIONS_CACHE_NAME, USER)), 0);
}

#[tokio::test]
async fn test_transient_failure_keeps_subscription() {
	let failing = subscription(USER, 1, false);
	let h = Harness::new(MockMeta::enabled(), vec![failing.clone()]);
	h.transport.respond(
		&failing.endpoint,
		PushResult::Failed(PushFailure {
			status: Some(500),
			headers: vec![("retry-after".into(), "30".into())],
			body: "upstream error".into(),
		}),
	);

	h.push(&mention()).await;
	h.push(&mention()).await;

	assert!(h.store.deletes.lock().is_empty());
	assert!(h.cleanup_log().is_empty());
	assert_eq!(h.transport.send_count(), 2);
	assert_eq!(h.store.list_calls(), 1);
}

#[tokio::test]
async fn test_disabled_push_touches_nothing() {
	let h = Harness::new(MockMeta::disabled(), vec![subscription(USER, 1, true)]);

	let handle = h.service.push_notification(USER, &mention()).await.unwrap();
	assert!(handle.is_empty());

	assert_eq!(h.meta.calls.load(Ordering::SeqCst), 1);
	assert_eq!(h.store.list_calls(), 0);
	assert_eq!(h.shared.gets(), 0);
	assert_eq!(h.summarizer.calls(), 0);
	assert_eq!(h.transport.send_count(), 0);
	assert!(h.transport.vapid.lock().is_empty());
}

#[tokio::test]
async fn test_missing_vapid_key_disables_push() {
	let meta = MockMeta {
		meta: ServerMeta { sw_private_key: None, ..MockMeta::enabled().meta },
		calls: Default::default(),
	};
	let h = Harness::new(meta, vec![subscription(USER, 1, true)]);

	h.push(&mention()).await;
	assert_eq!(h.store.list_calls(), 0);
	assert_eq!(h.transport.send_count(), 0);
}

#[tokio::test]
async fn test_notification_payload_is_shaped() {
	let h = Harness::new(MockMeta::enabled(), vec![subscription(USER, 1, false)]);

	h.push(&mention()).await;

	let mut payload = sent_payload(&h.transport, 0);
	assert!(payload["dateTime"].as_i64().is_some_and(|ms| ms > 1_600_000_000_000));
	payload.as_object_mut().unwrap().remove("dateTime");
	assert_eq!(
		payload,
		json!({
			"type": "notification",
			"userId": USER,
			"body": {
				"id": "n1",
				"type": "mention",
				"user": { "id": "u2", "username": "bob" },
				"note": { "id": "note1", "text": FixedSummarizer::SUMMARY, "visibility": "public" },
			},
		})
	);
}

#[tokio::test]
async fn test_antenna_note_keeps_author() {
	let h = Harness::new(MockMeta::enabled(), vec![subscription(USER, 1, false)]);
	let event = PushEvent::UnreadAntennaNote(AntennaNote {
		antenna: AntennaRef { id: "a1".into(), name: "rust".into() },
		note: json!({ "id": "note1", "text": "new crate", "user": { "id": "u3" } }),
	});

	h.push(&event).await;

	let payload = sent_payload(&h.transport, 0);
	assert_eq!(payload["type"], "unreadAntennaNote");
	assert_eq!(payload["body"]["antenna"]["name"], "rust");
	assert_eq!(payload["body"]["note"]["user"]["id"], "u3");
	assert_eq!(payload["body"]["note"]["text"], FixedSummarizer::SUMMARY);
}

#[tokio::test]
async fn test_payload_is_shaped_once_per_dispatch() {
	let h = Harness::new(MockMeta::enabled(), vec![
		subscription(USER, 1, false),
		subscription(USER, 2, false),
		subscription(USER, 3, false),
	]);

	h.push(&mention()).await;

	assert_eq!(h.summarizer.calls(), 1);
	let sends = h.transport.sends.lock();
	assert!(sends.iter().all(|send| send.1 == sends[0].1));
}

#[tokio::test]
async fn test_proxy_is_handed_to_transport() {
	let h = Harness::with_opts(MockMeta::enabled(), vec![subscription(USER, 1, false)], PushServiceOpts {
		server_url: SERVER_URL.into(),
		proxy: Some("http://proxy.internal:3128".into()),
		..PushServiceOpts::default()
	});

	h.push(&mention()).await;
	assert_eq!(h.transport.sends.lock()[0].2.as_deref(), Some("http://proxy.internal:3128"));
}

#[tokio::test]
async fn test_store_error_fails_dispatch() {
	let h = Harness::new(MockMeta::enabled(), vec![subscription(USER, 1, false)]);
	h.store.fail_list.store(true, Ordering::SeqCst);

	let res = h.service.push_notification(USER, &mention()).await;
	assert!(matches!(res, Err(Error::DbError)));
	assert_eq!(h.transport.send_count(), 0);
}

#[tokio::test]
async fn test_refresh_cache_reloads() {
	let h = Harness::new(MockMeta::enabled(), vec![subscription(USER, 1, false)]);

	h.push(&mention()).await;
	h.store.subscriptions.lock().get_mut(USER).unwrap().push(subscription(USER, 2, false));
	h.service.refresh_cache(USER).await.unwrap();
	h.push(&mention()).await;

	assert_eq!(h.store.list_calls(), 2);
	assert_eq!(h.transport.send_count(), 3);
}

#[tokio::test]
async fn test_dispatch_after_dispose_fails() {
	let h = Harness::new(MockMeta::enabled(), vec![subscription(USER, 1, false)]);

	h.service.dispose().await;
	let res = h.service.push_notification(USER, &mention()).await;

	assert!(matches!(res, Err(Error::ServiceUnavailable(_))));
	assert_eq!(h.transport.send_count(), 0);
}

// vim: ts=4
