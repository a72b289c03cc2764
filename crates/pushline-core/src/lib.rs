//! Push dispatch core
//!
//! Delivers notification events to every registered service worker endpoint of a user.
//!
//! # Pipeline
//!
//! 1. [`gate`] checks that service worker push is enabled and VAPID keys exist
//! 2. [`cache`] looks up the user's subscriptions (local LRU tier, shared tier, store)
//! 3. [`truncate`] shapes the payload to fit push message size limits
//! 4. [`service`] fans out one delivery task per subscription and prunes gone endpoints
//!
//! # Shutdown
//!
//! The host stops issuing dispatch calls, then calls [`service::PushNotificationService::dispose`].

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod gate;
pub mod memory_cache;
pub mod opts;
pub mod service;
pub mod summary;
pub mod truncate;

mod prelude;

pub use cache::{SubscriptionCache, TieredCache};
pub use memory_cache::MemoryCacheAdapter;
pub use opts::{CacheOpts, PushServiceOpts};
pub use service::{DispatchHandle, PushNotificationService};
pub use summary::{NoteSummarizer, Summarizer};

// vim: ts=4
