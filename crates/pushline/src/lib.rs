//! pushline delivers notification events to the service workers of a user through Web Push.
//!
//! # Features
//!
//! - Subscription lookup through a two-tier cache
//!     - process-local LRU tier with a short lifetime
//!     - shared tier (redb, or in memory) with a longer one
//!     - single-flight loading, invalidation that beats stale loads
//! - Payload shaping to fit push message limits
//! - Per-subscription delivery with automatic removal of gone endpoints
//! - RFC 8291 encryption and RFC 8292 VAPID authentication
//!
//! # Usage
//!
//! Build a [`PushNotificationService`] with [`PushServiceBuilder`], call
//! [`PushNotificationService::push_notification`] for each event, and
//! [`PushNotificationService::dispose`] on shutdown.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

// Re-export shared types and collaborator traits from pushline-types
pub use pushline_types::cache_adapter;
pub use pushline_types::error;
pub use pushline_types::meta_provider;
pub use pushline_types::notification;
pub use pushline_types::push_transport;
pub use pushline_types::subscription_adapter;
pub use pushline_types::types;

// Pipeline crate re-exports
pub use pushline_core as pipeline;
pub use pushline_webpush as webpush;

pub use pushline_core::{DispatchHandle, PushNotificationService};

// Local modules
pub mod app;
pub mod prelude;

pub use app::PushServiceBuilder;

// vim: ts=4
