//! Service builder - wires collaborators into a `PushNotificationService`

use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;
use pushline_core::{
	MemoryCacheAdapter, NoteSummarizer, PushNotificationService, PushServiceOpts,
	SubscriptionCache, Summarizer,
};
use pushline_types::cache_adapter::CacheAdapter;
use pushline_types::meta_provider::{MetaProvider, ServerMeta, StaticMeta};
use pushline_types::push_transport::PushTransport;
use pushline_types::subscription_adapter::SubscriptionAdapter;
use pushline_webpush::{WebPushOpts, WebPushTransport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collaborators of the service. Unset optional ones get defaults at build time.
#[derive(Default)]
pub struct Adapters {
	pub meta_provider: Option<Arc<dyn MetaProvider>>,
	pub subscription_adapter: Option<Arc<dyn SubscriptionAdapter>>,
	pub cache_adapter: Option<Arc<dyn CacheAdapter>>,
	pub transport: Option<Arc<dyn PushTransport>>,
	pub summarizer: Option<Arc<dyn Summarizer>>,
}

pub struct PushServiceBuilder {
	opts: PushServiceOpts,
	webpush: WebPushOpts,
	adapters: Adapters,
}

impl PushServiceBuilder {
	/// Creates a builder with default options and installs the log subscriber unless the host
	/// already installed one
	pub fn new() -> Self {
		let _ = tracing_subscriber::fmt()
			.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
			.with_target(false)
			.try_init();
		PushServiceBuilder {
			opts: PushServiceOpts::default(),
			webpush: WebPushOpts::default(),
			adapters: Adapters::default(),
		}
	}

	// Opts
	pub fn server_url(&mut self, server_url: impl Into<Box<str>>) -> &mut Self {
		self.opts.server_url = server_url.into();
		self
	}
	pub fn proxy(&mut self, proxy: impl Into<Box<str>>) -> &mut Self {
		self.opts.proxy = Some(proxy.into());
		self
	}
	pub fn cache_lifetime(&mut self, lifetime: Duration) -> &mut Self {
		self.opts.cache.lifetime = lifetime;
		self
	}
	pub fn memory_cache_lifetime(&mut self, lifetime: Duration) -> &mut Self {
		self.opts.cache.memory_lifetime = lifetime;
		self
	}
	pub fn memory_cache_capacity(&mut self, capacity: usize) -> &mut Self {
		self.opts.cache.memory_capacity = capacity;
		self
	}
	pub fn cache_gc_interval(&mut self, interval: Duration) -> &mut Self {
		self.opts.cache.gc_interval = interval;
		self
	}
	pub fn push_ttl(&mut self, ttl: Duration) -> &mut Self {
		self.webpush.ttl = ttl;
		self
	}
	pub fn push_timeout(&mut self, timeout: Duration) -> &mut Self {
		self.webpush.request_timeout = timeout;
		self
	}

	// Adapters
	pub fn meta_provider(&mut self, meta_provider: Arc<dyn MetaProvider>) -> &mut Self {
		self.adapters.meta_provider = Some(meta_provider);
		self
	}
	/// Uses a fixed server configuration instead of a meta provider
	pub fn static_meta(&mut self, meta: ServerMeta) -> &mut Self {
		self.adapters.meta_provider = Some(Arc::new(StaticMeta(meta)));
		self
	}
	pub fn subscription_adapter(
		&mut self,
		subscription_adapter: Arc<dyn SubscriptionAdapter>,
	) -> &mut Self {
		self.adapters.subscription_adapter = Some(subscription_adapter);
		self
	}
	pub fn cache_adapter(&mut self, cache_adapter: Arc<dyn CacheAdapter>) -> &mut Self {
		self.adapters.cache_adapter = Some(cache_adapter);
		self
	}
	pub fn transport(&mut self, transport: Arc<dyn PushTransport>) -> &mut Self {
		self.adapters.transport = Some(transport);
		self
	}
	pub fn summarizer(&mut self, summarizer: Arc<dyn Summarizer>) -> &mut Self {
		self.adapters.summarizer = Some(summarizer);
		self
	}

	/// Builds the service and starts the cache maintenance task
	///
	/// Must run inside a tokio runtime.
	pub async fn build(self) -> ClResult<PushNotificationService> {
		info!("pushline V{}", VERSION);

		let Some(meta) = self.adapters.meta_provider else {
			error!("FATAL: No meta provider configured");
			return Err(Error::ConfigError("No meta provider configured".into()));
		};
		let Some(store) = self.adapters.subscription_adapter else {
			error!("FATAL: No subscription adapter configured");
			return Err(Error::ConfigError("No subscription adapter configured".into()));
		};
		let shared: Arc<dyn CacheAdapter> = match self.adapters.cache_adapter {
			Some(shared) => shared,
			None => {
				info!("No shared cache adapter configured, using process memory");
				Arc::new(MemoryCacheAdapter::new())
			}
		};
		let transport: Arc<dyn PushTransport> = match self.adapters.transport {
			Some(transport) => transport,
			None => Arc::new(WebPushTransport::new(self.webpush).inspect_err(|err| {
				error!("FATAL: Failed to create Web Push transport: {}", err);
			})?),
		};
		let summarizer: Arc<dyn Summarizer> = match self.adapters.summarizer {
			Some(summarizer) => summarizer,
			None => Arc::new(NoteSummarizer::default()),
		};

		let cache = Arc::new(
			SubscriptionCache::subscriptions(Arc::clone(&store), shared, self.opts.cache.clone())
				.inspect_err(|err| error!("FATAL: Invalid cache configuration: {}", err))?,
		);
		cache.spawn_gc();

		info!(
			server_url = %self.opts.server_url,
			proxy = ?self.opts.proxy,
			"Push notification service ready"
		);
		Ok(PushNotificationService::new(self.opts, meta, store, transport, summarizer, cache))
	}
}

impl Default for PushServiceBuilder {
	fn default() -> Self {
		Self::new()
	}
}

// vim: ts=4
