//! Two-tier key/value cache with pull-through loading
//!
//! Lookups go through a process-local LRU tier, then a shared tier (`CacheAdapter`), and
//! finally the fetcher (the durable store), populating both tiers on the way back. The local
//! tier expires sooner than the shared one and is a latency optimization only.
//!
//! Concurrent lookups of a cold key share one load (single-flight). `invalidate` always wins
//! over a load that started before it: such a load never writes the local tier, removes what
//! it wrote to the shared tier, and later loads of the key bypass the shared tier until both it
//! and the shared delete of `invalidate` have finished.

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::opts::CacheOpts;
use crate::prelude::*;
use pushline_types::cache_adapter::CacheAdapter;
use pushline_types::subscription_adapter::{SubscriptionAdapter, SwSubscription};

/// Shared tier namespace of the subscription cache
pub const SUBSCRIPTIONS_CACHE_NAME: &str = "userSwSubscriptions";

/// Loads the authoritative value of a key
pub type Fetcher<T> = Arc<dyn Fn(Box<str>) -> BoxFuture<'static, ClResult<T>> + Send + Sync>;

/// Per-user subscription lists
pub type SubscriptionCache = TieredCache<Vec<SwSubscription>>;

type Load<T> = Shared<BoxFuture<'static, ClResult<T>>>;

struct LocalEntry<T> {
	value: T,
	expires_at: Instant,
}

/// An in-progress load of one key
struct Flight<T> {
	id: u64,
	/// Set by `invalidate`; the load must not publish its result
	invalidated: Arc<AtomicBool>,
	load: Load<T>,
}

struct State<T> {
	local: LruCache<Box<str>, LocalEntry<T>>,
	flights: HashMap<Box<str>, Flight<T>>,
	/// Keys with invalidated loads that may still touch the shared tier
	tainted: HashMap<Box<str>, usize>,
}

struct Inner<T> {
	name: Box<str>,
	opts: CacheOpts,
	shared: Arc<dyn CacheAdapter>,
	fetcher: Fetcher<T>,
	state: Mutex<State<T>>,
	next_flight: AtomicU64,
	disposed: AtomicBool,
	gc_task: Mutex<Option<JoinHandle<()>>>,
}

fn disposed_error() -> Error {
	Error::ServiceUnavailable("cache disposed".into())
}

pub struct TieredCache<T> {
	inner: Arc<Inner<T>>,
}

impl<T> TieredCache<T>
where
	T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
	pub fn new(
		name: impl Into<Box<str>>,
		shared: Arc<dyn CacheAdapter>,
		opts: CacheOpts,
		fetcher: Fetcher<T>,
	) -> ClResult<Self> {
		opts.validate()?;
		let capacity = NonZeroUsize::new(opts.memory_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

		Ok(Self {
			inner: Arc::new(Inner {
				name: name.into(),
				opts,
				shared,
				fetcher,
				state: Mutex::new(State {
					local: LruCache::new(capacity),
					flights: HashMap::new(),
					tainted: HashMap::new(),
				}),
				next_flight: AtomicU64::new(0),
				disposed: AtomicBool::new(false),
				gc_task: Mutex::new(None),
			}),
		})
	}

	/// Returns the value of `key`, loading it on a miss
	pub async fn fetch(&self, key: &str) -> ClResult<T> {
		if self.inner.disposed.load(Ordering::Acquire) {
			return Err(disposed_error());
		}

		let load = {
			let mut state = self.inner.state.lock();

			if let Some(entry) = state.local.get(key) {
				if entry.expires_at > Instant::now() {
					return Ok(entry.value.clone());
				}
				state.local.pop(key);
			}

			if let Some(flight) = state.flights.get(key) {
				debug!(cache = %self.inner.name, key = %key, "Joining in-flight load");
				flight.load.clone()
			} else {
				let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
				let invalidated = Arc::new(AtomicBool::new(false));
				let skip_shared = state.tainted.contains_key(key);
				let load = Inner::load(
					Arc::clone(&self.inner),
					key.into(),
					id,
					Arc::clone(&invalidated),
					skip_shared,
				)
				.boxed()
				.shared();
				state
					.flights
					.insert(key.into(), Flight { id, invalidated, load: load.clone() });
				load
			}
		};

		load.await
	}

	/// Removes `key` from both tiers
	///
	/// The key stays tainted until the shared delete has completed, so loads started meanwhile
	/// go straight to the store.
	pub async fn invalidate(&self, key: &str) {
		let _taint = {
			let mut state = self.inner.state.lock();
			state.local.pop(key);
			if let Some(flight) = state.flights.remove(key) {
				flight.invalidated.store(true, Ordering::Release);
				*state.tainted.entry(key.into()).or_insert(0) += 1;
			}
			*state.tainted.entry(key.into()).or_insert(0) += 1;
			TaintGuard { inner: Arc::clone(&self.inner), key: key.into() }
		};

		if self.inner.disposed.load(Ordering::Acquire) {
			return;
		}
		if let Err(err) = self.inner.shared.delete(&self.inner.shared_key(key)).await {
			warn!(cache = %self.inner.name, key = %key, error = %err, "Shared cache delete failed");
		}
	}

	/// Drops `key` and loads it again from the store
	pub async fn refresh(&self, key: &str) -> ClResult<T> {
		self.invalidate(key).await;
		self.fetch(key).await
	}

	/// Starts the periodic eviction of expired local entries
	pub fn spawn_gc(&self) {
		let weak = Arc::downgrade(&self.inner);
		let interval = self.inner.opts.gc_interval;
		let handle = tokio::spawn(gc_loop(weak, interval));

		if let Some(old) = self.inner.gc_task.lock().replace(handle) {
			old.abort();
		}
	}

	/// Number of live entries in the local tier
	pub fn local_len(&self) -> usize {
		self.inner.state.lock().local.len()
	}

	/// Evicts expired local entries
	pub fn gc(&self) {
		self.inner.evict_expired();
	}

	/// Releases the cache. Safe to call more than once.
	pub async fn dispose(&self) {
		if self.inner.disposed.swap(true, Ordering::AcqRel) {
			return;
		}
		if let Some(task) = self.inner.gc_task.lock().take() {
			task.abort();
		}
		{
			let mut state = self.inner.state.lock();
			state.local.clear();
			for (_, flight) in state.flights.drain() {
				flight.invalidated.store(true, Ordering::Release);
			}
			state.tainted.clear();
		}
		self.inner.shared.dispose().await;
		debug!(cache = %self.inner.name, "Cache disposed");
	}
}

impl TieredCache<Vec<SwSubscription>> {
	/// Subscription cache pulling through `store.list_by_user`
	pub fn subscriptions(
		store: Arc<dyn SubscriptionAdapter>,
		shared: Arc<dyn CacheAdapter>,
		opts: CacheOpts,
	) -> ClResult<Self> {
		let fetcher: Fetcher<Vec<SwSubscription>> = Arc::new(move |user_id: Box<str>| {
			let store = Arc::clone(&store);
			async move { store.list_by_user(&user_id).await }.boxed()
		});
		Self::new(SUBSCRIPTIONS_CACHE_NAME, shared, opts, fetcher)
	}
}

async fn gc_loop<T>(weak: Weak<Inner<T>>, interval: Duration)
where
	T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
	let mut ticker = tokio::time::interval(interval);
	ticker.tick().await;
	loop {
		ticker.tick().await;
		let Some(inner) = weak.upgrade() else { break };
		if inner.disposed.load(Ordering::Acquire) {
			break;
		}
		inner.evict_expired();
	}
}

impl<T> Inner<T>
where
	T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
	fn shared_key(&self, key: &str) -> String {
		format!("{}:{}", self.name, key)
	}

	fn evict_expired(&self) {
		let now = Instant::now();
		let mut state = self.state.lock();
		let expired: Vec<Box<str>> = state
			.local
			.iter()
			.filter(|(_, entry)| entry.expires_at <= now)
			.map(|(key, _)| key.clone())
			.collect();
		for key in &expired {
			state.local.pop(key);
		}
		if !expired.is_empty() {
			debug!(cache = %self.name, evicted = expired.len(), "Evicted expired entries");
		}
	}

	/// Reads the shared tier. Errors and undecodable values count as a miss.
	async fn read_shared(&self, shared_key: &str) -> Option<T> {
		let raw = match self.shared.get(shared_key).await {
			Ok(raw) => raw?,
			Err(err) => {
				warn!(cache = %self.name, key = %shared_key, error = %err, "Shared cache read failed");
				return None;
			}
		};

		match serde_json::from_str(&raw) {
			Ok(value) => Some(value),
			Err(err) => {
				warn!(cache = %self.name, key = %shared_key, error = %err, "Dropping undecodable shared cache value");
				if let Err(err) = self.shared.delete(shared_key).await {
					warn!(cache = %self.name, key = %shared_key, error = %err, "Shared cache delete failed");
				}
				None
			}
		}
	}

	/// Writes the shared tier, returns whether a value was stored
	async fn write_shared(&self, shared_key: &str, value: &T) -> bool {
		let encoded = match serde_json::to_string(value) {
			Ok(encoded) => encoded,
			Err(err) => {
				error!(cache = %self.name, error = %err, "Failed to encode cache value");
				return false;
			}
		};
		match self.shared.set(shared_key, &encoded, self.opts.lifetime).await {
			Ok(()) => true,
			Err(err) => {
				warn!(cache = %self.name, key = %shared_key, error = %err, "Shared cache write failed");
				false
			}
		}
	}

	async fn load(
		self: Arc<Self>,
		key: Box<str>,
		flight_id: u64,
		invalidated: Arc<AtomicBool>,
		skip_shared: bool,
	) -> ClResult<T> {
		let shared_key = self.shared_key(&key);

		let cached = if skip_shared { None } else { self.read_shared(&shared_key).await };
		let (value, wrote_shared) = if let Some(value) = cached {
			debug!(cache = %self.name, key = %key, "Shared cache hit");
			(value, false)
		} else {
			debug!(cache = %self.name, key = %key, "Cache miss, loading from store");
			let loaded = if self.disposed.load(Ordering::Acquire) {
				Err(disposed_error())
			} else {
				(self.fetcher)(key.clone()).await
			};
			match loaded {
				Ok(value) => {
					let wrote = !invalidated.load(Ordering::Acquire)
						&& !self.disposed.load(Ordering::Acquire)
						&& self.write_shared(&shared_key, &value).await;
					(value, wrote)
				}
				Err(err) => {
					self.finish(&key, flight_id, &invalidated, None, false).await;
					return Err(err);
				}
			}
		};

		self.finish(&key, flight_id, &invalidated, Some(&value), wrote_shared).await;
		if self.disposed.load(Ordering::Acquire) {
			return Err(disposed_error());
		}
		Ok(value)
	}

	/// Retires a flight.
	///
	/// A valid flight publishes `value` to the local tier. An invalidated one undoes its shared
	/// tier write instead, then releases its hold on the key.
	async fn finish(
		&self,
		key: &str,
		flight_id: u64,
		invalidated: &AtomicBool,
		value: Option<&T>,
		wrote_shared: bool,
	) {
		{
			let mut state = self.state.lock();
			if state.flights.get(key).is_some_and(|flight| flight.id == flight_id) {
				state.flights.remove(key);
			}
			if self.disposed.load(Ordering::Acquire) {
				return;
			}
			if !invalidated.load(Ordering::Acquire) {
				if let Some(value) = value {
					state.local.put(
						key.into(),
						LocalEntry {
							value: value.clone(),
							expires_at: Instant::now() + self.opts.memory_lifetime,
						},
					);
				}
				return;
			}
		}

		if wrote_shared {
			if let Err(err) = self.shared.delete(&self.shared_key(key)).await {
				warn!(cache = %self.name, key = %key, error = %err, "Failed to undo stale shared cache write");
			}
		}

		self.release_taint(key);
	}

	fn release_taint(&self, key: &str) {
		let mut state = self.state.lock();
		if let Some(count) = state.tainted.get_mut(key) {
			*count = count.saturating_sub(1);
			if *count == 0 {
				state.tainted.remove(key);
			}
		}
	}
}

/// Holds a taint on a key while `invalidate` runs, released on drop
struct TaintGuard<T>
where
	T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
	inner: Arc<Inner<T>>,
	key: Box<str>,
}

impl<T> Drop for TaintGuard<T>
where
	T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
	fn drop(&mut self) {
		self.inner.release_taint(&self.key);
	}
}

// vim: ts=4
