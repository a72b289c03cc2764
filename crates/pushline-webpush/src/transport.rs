//! Web Push delivery over HTTP/2 (RFC 8030)

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::StatusCode;
use hyper_rustls::builderstates::WantsSchemes;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::proxy::Tunnel;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::{Client, ResponseFuture};
use hyper_util::rt::TokioExecutor;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::crypto::{self, VapidSigner};
use crate::prelude::*;
use pushline_types::push_transport::{
	PushEndpoint, PushFailure, PushResult, PushTransport, SendOptions,
};

/// How long the push service keeps an undelivered message
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 3600);

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response bodies are only kept for diagnostics
const MAX_FAILURE_BODY: usize = 4096;

type DirectClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;
type ProxiedClient = Client<HttpsConnector<Tunnel<HttpConnector>>, Full<Bytes>>;

/// How a response status is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
	Delivered,
	/// The subscription expired or was unsubscribed
	Gone,
	Failed,
}

pub fn disposition(status: StatusCode) -> Disposition {
	if status.is_success() {
		Disposition::Delivered
	} else if status == StatusCode::GONE {
		Disposition::Gone
	} else {
		Disposition::Failed
	}
}

fn failure(body: impl Into<Box<str>>) -> PushResult {
	PushResult::Failed(PushFailure { status: None, headers: Vec::new(), body: body.into() })
}

fn https_builder() -> ClResult<HttpsConnectorBuilder<WantsSchemes>> {
	HttpsConnectorBuilder::new()
		.with_native_roots()
		.map_err(|e| Error::ConfigError(format!("TLS error: {}", e)))
}

#[derive(Debug, Clone, Copy)]
pub struct WebPushOpts {
	pub ttl: Duration,
	pub request_timeout: Duration,
}

impl Default for WebPushOpts {
	fn default() -> Self {
		Self { ttl: DEFAULT_TTL, request_timeout: DEFAULT_REQUEST_TIMEOUT }
	}
}

/// `PushTransport` delivering encrypted messages with VAPID authentication
pub struct WebPushTransport {
	opts: WebPushOpts,
	signer: RwLock<Option<Arc<VapidSigner>>>,
	direct: DirectClient,
	/// Clients tunneling through an HTTP proxy, by proxy URL
	proxied: Mutex<HashMap<Box<str>, ProxiedClient>>,
}

impl std::fmt::Debug for WebPushTransport {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WebPushTransport")
			.field("opts", &self.opts)
			.field("signer", &self.signer.read())
			.finish_non_exhaustive()
	}
}

impl WebPushTransport {
	pub fn new(opts: WebPushOpts) -> ClResult<Self> {
		let connector = https_builder()?.https_only().enable_http2().build();
		let direct = Client::builder(TokioExecutor::new()).http2_only(true).build(connector);

		Ok(Self { opts, signer: RwLock::new(None), direct, proxied: Mutex::new(HashMap::new()) })
	}

	fn proxied_client(&self, proxy: &str) -> ClResult<ProxiedClient> {
		if let Some(client) = self.proxied.lock().get(proxy) {
			return Ok(client.clone());
		}

		let proxy_uri: hyper::Uri = proxy
			.parse()
			.map_err(|e| Error::ConfigError(format!("invalid proxy URL {}: {}", proxy, e)))?;
		if proxy_uri.scheme_str() != Some("http") {
			return Err(Error::ConfigError(format!("unsupported proxy scheme: {}", proxy)));
		}
		let tunnel = Tunnel::new(proxy_uri, HttpConnector::new());
		let connector = https_builder()?.https_only().enable_http2().wrap_connector(tunnel);
		let client: ProxiedClient =
			Client::builder(TokioExecutor::new()).http2_only(true).build(connector);

		debug!(proxy = %proxy, "Created proxied push client");
		self.proxied.lock().insert(proxy.into(), client.clone());
		Ok(client)
	}

	fn request(
		&self,
		request: hyper::Request<Full<Bytes>>,
		opts: &SendOptions,
	) -> ClResult<ResponseFuture> {
		match opts.proxy.as_deref() {
			Some(proxy) => Ok(self.proxied_client(proxy)?.request(request)),
			None => Ok(self.direct.request(request)),
		}
	}

	async fn read_failure(response: hyper::Response<hyper::body::Incoming>) -> PushFailure {
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.map(|(name, value)| {
				(name.as_str().into(), String::from_utf8_lossy(value.as_bytes()).into())
			})
			.collect();
		let body = match response.into_body().collect().await {
			Ok(collected) => {
				let bytes = collected.to_bytes();
				let text = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_FAILURE_BODY)]);
				text.into_owned().into()
			}
			Err(e) => format!("Failed to read response body: {}", e).into(),
		};
		PushFailure { status: Some(status), headers, body }
	}
}

#[async_trait]
impl PushTransport for WebPushTransport {
	fn set_vapid_details(&self, subject: &str, public_key: &str, private_key: &str) -> ClResult<()> {
		{
			let current = self.signer.read();
			if let Some(signer) = current.as_ref() {
				if signer.subject() == subject && signer.public_key() == public_key {
					return Ok(());
				}
			}
		}

		let signer = VapidSigner::new(subject, public_key, private_key)?;
		*self.signer.write() = Some(Arc::new(signer));
		info!(subject = %subject, "VAPID details updated");
		Ok(())
	}

	async fn send(&self, endpoint: &PushEndpoint, payload: &str, opts: &SendOptions) -> PushResult {
		let Some(signer) = self.signer.read().clone() else {
			return failure("VAPID details not set");
		};

		let body = match crypto::encrypt_payload(payload, &endpoint.keys.p256dh, &endpoint.keys.auth)
		{
			Ok(body) => body,
			Err(e) => return failure(format!("Encryption error: {}", e)),
		};
		let authorization = match signer.authorization(&endpoint.endpoint) {
			Ok(authorization) => authorization,
			Err(e) => return failure(format!("VAPID JWT error: {}", e)),
		};

		let request = match hyper::Request::builder()
			.method(hyper::Method::POST)
			.uri(&*endpoint.endpoint)
			.header("Content-Type", "application/octet-stream")
			.header("Content-Encoding", "aes128gcm")
			.header("TTL", self.opts.ttl.as_secs().to_string())
			.header("Authorization", authorization)
			.body(Full::new(Bytes::from(body)))
		{
			Ok(request) => request,
			Err(e) => return failure(format!("Request build error: {}", e)),
		};

		let pending = match self.request(request, opts) {
			Ok(pending) => pending,
			Err(e) => return failure(e.to_string()),
		};

		let response = match tokio::time::timeout(self.opts.request_timeout, pending).await {
			Ok(Ok(response)) => response,
			Ok(Err(e)) => return failure(format!("Network error: {}", e)),
			Err(_) => return failure("Request timed out"),
		};

		let status = response.status();
		match disposition(status) {
			Disposition::Delivered => PushResult::Success,
			Disposition::Gone => PushResult::SubscriptionGone { status: status.as_u16() },
			Disposition::Failed => PushResult::Failed(Self::read_failure(response).await),
		}
	}
}


// vim: ts=4
