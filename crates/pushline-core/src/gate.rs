//! Feature gate for service worker push

use crate::prelude::*;
use pushline_types::meta_provider::{MetaProvider, ServerMeta};

/// Signing identity for one dispatch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VapidDetails {
	/// Contact URL of this server
	pub subject: Box<str>,
	pub public_key: Box<str>,
	pub private_key: Box<str>,
}

fn non_empty(key: Option<&str>) -> Option<&str> {
	key.filter(|key| !key.trim().is_empty())
}

/// VAPID details if push is enabled and both keys are configured
pub fn vapid_details(meta: &ServerMeta, server_url: &str) -> Option<VapidDetails> {
	if !meta.enable_service_worker {
		return None;
	}
	let public_key = non_empty(meta.sw_public_key.as_deref())?;
	let private_key = non_empty(meta.sw_private_key.as_deref())?;

	Some(VapidDetails {
		subject: server_url.into(),
		public_key: public_key.into(),
		private_key: private_key.into(),
	})
}

/// Reads the meta once and decides whether a dispatch proceeds
pub async fn check(meta: &dyn MetaProvider, server_url: &str) -> ClResult<Option<VapidDetails>> {
	let meta = meta.fetch_meta().await?;
	Ok(vapid_details(&meta, server_url))
}


// vim: ts=4
