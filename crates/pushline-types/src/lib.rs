//! Shared types, collaborator traits, and core utilities for the pushline pipeline.
//!
//! This crate contains the foundational types that are shared between the
//! dispatch core, the Web Push transport and all adapter implementations.
//! Keeping them in a separate crate lets the adapters compile without pulling
//! in the dispatch machinery.

pub mod cache_adapter;
pub mod error;
pub mod meta_provider;
pub mod notification;
pub mod prelude;
pub mod push_transport;
pub mod subscription_adapter;
pub mod types;

// vim: ts=4
