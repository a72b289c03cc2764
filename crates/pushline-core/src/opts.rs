//! Pipeline configuration

use std::time::Duration;

use crate::prelude::*;

/// Lifetime of a subscription list in the shared tier
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Lifetime of a subscription list in process memory
pub const DEFAULT_MEMORY_LIFETIME: Duration = Duration::from_secs(3 * 60); // 3 minutes

/// Limits memory for cached subscription lists (one entry per user)
pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// Tiered cache settings
#[derive(Debug, Clone)]
pub struct CacheOpts {
	/// Shared tier expiration
	pub lifetime: Duration,
	/// Local tier expiration, never longer than `lifetime`
	pub memory_lifetime: Duration,
	pub memory_capacity: usize,
	pub gc_interval: Duration,
}

impl CacheOpts {
	pub fn validate(&self) -> ClResult<()> {
		if self.memory_lifetime > self.lifetime {
			return Err(Error::ConfigError(format!(
				"memory lifetime ({:?}) exceeds shared lifetime ({:?})",
				self.memory_lifetime, self.lifetime
			)));
		}
		if self.lifetime.is_zero() {
			return Err(Error::ConfigError("cache lifetime must be positive".into()));
		}
		Ok(())
	}
}

impl Default for CacheOpts {
	fn default() -> Self {
		Self {
			lifetime: DEFAULT_LIFETIME,
			memory_lifetime: DEFAULT_MEMORY_LIFETIME,
			memory_capacity: DEFAULT_MEMORY_CAPACITY,
			gc_interval: DEFAULT_GC_INTERVAL,
		}
	}
}

/// Dispatch service settings
#[derive(Debug, Clone)]
pub struct PushServiceOpts {
	/// Public URL of this server, used as VAPID subject
	pub server_url: Box<str>,
	/// Outbound HTTP proxy handed to the transport
	pub proxy: Option<Box<str>>,
	pub cache: CacheOpts,
}

impl Default for PushServiceOpts {
	fn default() -> Self {
		Self { server_url: "http://localhost".into(), proxy: None, cache: CacheOpts::default() }
	}
}


// vim: ts=4
