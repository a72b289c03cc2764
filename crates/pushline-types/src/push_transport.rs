//! Push transport capability: delivers one message to one endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::prelude::*;

/// Browser `PushSubscription` keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
	pub auth: Box<str>,
	pub p256dh: Box<str>,
}

/// Address of a single push endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEndpoint {
	pub endpoint: Box<str>,
	pub keys: PushKeys,
}

/// Per-send options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
	/// Outbound HTTP proxy URL
	pub proxy: Option<Box<str>>,
}

/// Details of a failed delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushFailure {
	/// HTTP status, `None` when the request never got a response
	pub status: Option<u16>,
	pub headers: Vec<(Box<str>, Box<str>)>,
	pub body: Box<str>,
}

impl fmt::Display for PushFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.status {
			Some(status) => write!(f, "HTTP {}: {}", status, self.body),
			None => write!(f, "{}", self.body),
		}
	}
}

/// Result of sending a push notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushResult {
	/// Successfully sent
	Success,
	/// Subscription is no longer valid and never will be (HTTP 410)
	SubscriptionGone { status: u16 },
	/// Any other failure. Not retried.
	Failed(PushFailure),
}

#[async_trait]
pub trait PushTransport: Debug + Send + Sync {
	/// Sets the VAPID signing identity used by subsequent sends
	fn set_vapid_details(&self, subject: &str, public_key: &str, private_key: &str)
	-> ClResult<()>;

	/// Delivers `payload` to a single endpoint
	async fn send(&self, endpoint: &PushEndpoint, payload: &str, opts: &SendOptions)
	-> PushResult;
}

// vim: ts=4
