//! Process-local `CacheAdapter`
//!
//! Stands in for the shared tier on single-node deployments where no cross-process cache is
//! available. Entries expire lazily on read.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::prelude::*;
use pushline_types::cache_adapter::CacheAdapter;

#[derive(Debug, Default)]
pub struct MemoryCacheAdapter {
	entries: Mutex<HashMap<Box<str>, (Box<str>, Instant)>>,
	disposed: AtomicBool,
}

impl MemoryCacheAdapter {
	pub fn new() -> Self {
		Self::default()
	}

	fn check_open(&self) -> ClResult<()> {
		if self.disposed.load(Ordering::Acquire) {
			return Err(Error::ServiceUnavailable("memory cache disposed".into()));
		}
		Ok(())
	}
}

#[async_trait]
impl CacheAdapter for MemoryCacheAdapter {
	async fn get(&self, key: &str) -> ClResult<Option<Box<str>>> {
		self.check_open()?;
		let mut entries = self.entries.lock();
		let now = Instant::now();
		let Some(fresh) = entries
			.get(key)
			.map(|(value, expires_at)| (*expires_at > now).then(|| value.clone()))
		else {
			return Ok(None);
		};
		if fresh.is_none() {
			entries.remove(key);
		}
		Ok(fresh)
	}

	async fn set(&self, key: &str, value: &str, ttl: Duration) -> ClResult<()> {
		self.check_open()?;
		self.entries.lock().insert(key.into(), (value.into(), Instant::now() + ttl));
		Ok(())
	}

	async fn delete(&self, key: &str) -> ClResult<()> {
		self.check_open()?;
		self.entries.lock().remove(key);
		Ok(())
	}

	async fn dispose(&self) {
		self.disposed.store(true, Ordering::Release);
		self.entries.lock().clear();
	}
}


// vim: ts=4
