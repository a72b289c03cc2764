//! Mock collaborators for the dispatch pipeline tests
//!
//! Every mock records what it was asked to do; the mocks of one test share an `EventLog` so
//! ordering across collaborators can be asserted.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use pushline_core::{MemoryCacheAdapter, Summarizer};
use pushline_types::cache_adapter::CacheAdapter;
use pushline_types::error::{ClResult, Error};
use pushline_types::meta_provider::{MetaProvider, ServerMeta};
use pushline_types::push_transport::{PushEndpoint, PushResult, PushTransport, SendOptions};
use pushline_types::subscription_adapter::{SubscriptionAdapter, SwSubscription};
use pushline_types::types::Timestamp;

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn setup_test_logging() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn subscription(user_id: &str, n: u32, send_read_message: bool) -> SwSubscription {
	SwSubscription {
		id: format!("sub{}", n).into(),
		user_id: user_id.into(),
		endpoint: format!("https://push.example.com/send/{}", n).into(),
		auth: format!("auth{}", n).into(),
		publickey: format!("p256dh{}", n).into(),
		send_read_message,
		created_at: Timestamp(1_700_000_000),
	}
}

/// Durable store
#[derive(Debug, Default)]
pub struct MockStore {
	pub subscriptions: Mutex<HashMap<String, Vec<SwSubscription>>>,
	pub list_calls: AtomicUsize,
	pub deletes: Mutex<Vec<(String, String, String, String)>>,
	pub fail_list: AtomicBool,
	pub fail_delete: AtomicBool,
	/// When set, `list_by_user` waits for a permit
	pub gate: Mutex<Option<Arc<Semaphore>>>,
	pub log: EventLog,
}

impl MockStore {
	pub fn new(log: &EventLog) -> Self {
		Self { log: Arc::clone(log), ..Self::default() }
	}

	pub fn with(log: &EventLog, user_id: &str, subscriptions: Vec<SwSubscription>) -> Self {
		let store = Self::new(log);
		store.subscriptions.lock().insert(user_id.into(), subscriptions);
		store
	}

	/// Makes `list_by_user` wait for a permit of the returned semaphore
	pub fn hold(&self) -> Arc<Semaphore> {
		let gate = Arc::new(Semaphore::new(0));
		*self.gate.lock() = Some(Arc::clone(&gate));
		gate
	}

	pub fn list_calls(&self) -> usize {
		self.list_calls.load(Ordering::SeqCst)
	}

	/// Waits until `list_by_user` has been entered `n` times
	pub async fn wait_for_list_calls(&self, n: usize) {
		for _ in 0..500 {
			if self.list_calls() >= n {
				return;
			}
			tokio::time::sleep(Duration::from_millis(2)).await;
		}
		panic!("list_by_user was not called {} times", n);
	}
}

#[async_trait]
impl SubscriptionAdapter for MockStore {
	async fn list_by_user(&self, user_id: &str) -> ClResult<Vec<SwSubscription>> {
		self.list_calls.fetch_add(1, Ordering::SeqCst);
		self.log.lock().push(format!("store.list:{}", user_id));

		let gate = self.gate.lock().clone();
		if let Some(gate) = gate {
			gate.acquire().await.map_err(|_| Error::DbError)?.forget();
		}

		if self.fail_list.load(Ordering::SeqCst) {
			return Err(Error::DbError);
		}
		Ok(self.subscriptions.lock().get(user_id).cloned().unwrap_or_default())
	}

	async fn delete_exact(
		&self,
		user_id: &str,
		endpoint: &str,
		auth: &str,
		publickey: &str,
	) -> ClResult<()> {
		self.log.lock().push(format!("store.delete:{}", user_id));
		if self.fail_delete.load(Ordering::SeqCst) {
			return Err(Error::DbError);
		}
		self.deletes.lock().push((user_id.into(), endpoint.into(), auth.into(), publickey.into()));
		if let Some(list) = self.subscriptions.lock().get_mut(user_id) {
			list.retain(|s| {
				!(&*s.endpoint == endpoint && &*s.auth == auth && &*s.publickey == publickey)
			});
		}
		Ok(())
	}
}

/// Shared tier backed by `MemoryCacheAdapter`, logging every call
#[derive(Debug, Default)]
pub struct MockShared {
	pub inner: MemoryCacheAdapter,
	pub gets: AtomicUsize,
	pub sets: AtomicUsize,
	pub disposed: AtomicUsize,
	/// When set, `delete` sleeps this long before removing the entry
	pub delete_delay: Mutex<Option<Duration>>,
	pub fail_delete: AtomicBool,
	pub log: EventLog,
}

impl MockShared {
	pub fn new(log: &EventLog) -> Self {
		Self { log: Arc::clone(log), ..Self::default() }
	}

	pub fn gets(&self) -> usize {
		self.gets.load(Ordering::SeqCst)
	}

	pub fn deletes_of(&self, key: &str) -> usize {
		let wanted = format!("shared.delete:{}", key);
		self.log.lock().iter().filter(|entry| **entry == wanted).count()
	}
}

#[async_trait]
impl CacheAdapter for MockShared {
	async fn get(&self, key: &str) -> ClResult<Option<Box<str>>> {
		self.gets.fetch_add(1, Ordering::SeqCst);
		self.inner.get(key).await
	}

	async fn set(&self, key: &str, value: &str, ttl: Duration) -> ClResult<()> {
		self.sets.fetch_add(1, Ordering::SeqCst);
		self.log.lock().push(format!("shared.set:{}", key));
		self.inner.set(key, value, ttl).await
	}

	async fn delete(&self, key: &str) -> ClResult<()> {
		self.log.lock().push(format!("shared.delete:{}", key));
		let delay = *self.delete_delay.lock();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		if self.fail_delete.load(Ordering::SeqCst) {
			return Err(Error::ServiceUnavailable("shared tier down".into()));
		}
		self.inner.delete(key).await
	}

	async fn dispose(&self) {
		self.disposed.fetch_add(1, Ordering::SeqCst);
		self.inner.dispose().await;
	}
}

/// Transport answering `Success` unless told otherwise per endpoint
#[derive(Debug, Default)]
pub struct MockTransport {
	pub results: Mutex<HashMap<String, PushResult>>,
	pub sends: Mutex<Vec<(String, String, Option<Box<str>>)>>,
	pub vapid: Mutex<Vec<(String, String, String)>>,
}

impl MockTransport {
	pub fn respond(&self, endpoint: &str, result: PushResult) {
		self.results.lock().insert(endpoint.into(), result);
	}

	pub fn send_count(&self) -> usize {
		self.sends.lock().len()
	}

	pub fn sent_endpoints(&self) -> Vec<String> {
		let mut endpoints: Vec<String> = self.sends.lock().iter().map(|s| s.0.clone()).collect();
		endpoints.sort();
		endpoints
	}
}

#[async_trait]
impl PushTransport for MockTransport {
	fn set_vapid_details(&self, subject: &str, public_key: &str, private_key: &str) -> ClResult<()> {
		self.vapid.lock().push((subject.into(), public_key.into(), private_key.into()));
		Ok(())
	}

	async fn send(&self, endpoint: &PushEndpoint, payload: &str, opts: &SendOptions) -> PushResult {
		self.sends.lock().push((endpoint.endpoint.to_string(), payload.into(), opts.proxy.clone()));
		self.results.lock().get(&*endpoint.endpoint).cloned().unwrap_or(PushResult::Success)
	}
}

/// Summarizer returning a fixed string
#[derive(Debug, Default)]
pub struct FixedSummarizer {
	pub calls: AtomicUsize,
}

impl FixedSummarizer {
	pub const SUMMARY: &'static str = "FIXED SUMMARY";

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}

impl Summarizer for FixedSummarizer {
	fn summarize(&self, _note: &serde_json::Value) -> String {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Self::SUMMARY.into()
	}
}

#[derive(Debug)]
pub struct MockMeta {
	pub meta: ServerMeta,
	pub calls: AtomicUsize,
}

impl MockMeta {
	pub fn enabled() -> Self {
		Self {
			meta: ServerMeta {
				enable_service_worker: true,
				sw_public_key: Some("vapid-public".into()),
				sw_private_key: Some("vapid-private".into()),
			},
			calls: AtomicUsize::new(0),
		}
	}

	pub fn disabled() -> Self {
		Self {
			meta: ServerMeta { enable_service_worker: false, ..Self::enabled().meta },
			calls: AtomicUsize::new(0),
		}
	}
}

#[async_trait]
impl MetaProvider for MockMeta {
	async fn fetch_meta(&self) -> ClResult<ServerMeta> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.meta.clone())
	}
}

// vim: ts=4
