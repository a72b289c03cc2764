//! Server-wide feature configuration consumed by the dispatch pipeline

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;

/// Service worker push related server settings
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMeta {
	pub enable_service_worker: bool,
	/// VAPID public key (base64url, uncompressed P-256 point)
	pub sw_public_key: Option<Box<str>>,
	/// VAPID private key (base64url, raw 32-byte scalar)
	pub sw_private_key: Option<Box<str>>,
}

/// Source of `ServerMeta`.
///
/// Implementations may cache; every call is treated as authoritative for that dispatch.
#[async_trait]
pub trait MetaProvider: Debug + Send + Sync {
	async fn fetch_meta(&self) -> ClResult<ServerMeta>;
}

/// Provider returning a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct StaticMeta(pub ServerMeta);

#[async_trait]
impl MetaProvider for StaticMeta {
	async fn fetch_meta(&self) -> ClResult<ServerMeta> {
		Ok(self.0.clone())
	}
}

// vim: ts=4
