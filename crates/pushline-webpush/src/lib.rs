//! Web Push transport
//!
//! Delivers one encrypted message per call to a browser push service.
//!
//! # Protocol
//!
//! - RFC 8030: HTTP/2 POST to the subscription endpoint
//! - RFC 8188 / RFC 8291: `aes128gcm` payload encryption with the subscription keys
//! - RFC 8292: VAPID authentication with an ES256 token per request
//!
//! A 410 response means the subscription is gone. Every other non-success response, 404
//! included, is reported as a failure carrying the status, headers and body. Requests can be tunneled through
//! an HTTP proxy given per send.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod crypto;
pub mod transport;

mod prelude;

pub use transport::{WebPushOpts, WebPushTransport};

// vim: ts=4
