//! Push notification events
//!
//! The event kinds mirror what the service worker on the client understands. Bodies are the
//! packed (JSON) representations of notifications and notes, kept as `serde_json::Value`
//! because the packers live outside this pipeline.

use serde::{Deserialize, Serialize};

/// Antenna reference carried by `unreadAntennaNote`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntennaRef {
	pub id: Box<str>,
	pub name: Box<str>,
}

/// Body of `unreadAntennaNote`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaNote {
	pub antenna: AntennaRef,
	/// Packed note
	pub note: serde_json::Value,
}

/// Discriminant of a `PushEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushEventKind {
	Notification,
	UnreadAntennaNote,
	ReadAllNotifications,
}

impl PushEventKind {
	/// Wire name used in the `type` field of the push envelope
	pub fn as_str(self) -> &'static str {
		match self {
			PushEventKind::Notification => "notification",
			PushEventKind::UnreadAntennaNote => "unreadAntennaNote",
			PushEventKind::ReadAllNotifications => "readAllNotifications",
		}
	}
}

/// Event pushed to a user's service workers
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
	/// A packed notification, which may embed a `note`
	Notification(serde_json::Value),
	UnreadAntennaNote(AntennaNote),
	/// Marker event without a body
	ReadAllNotifications,
}

impl PushEvent {
	pub fn kind(&self) -> PushEventKind {
		match self {
			PushEvent::Notification(_) => PushEventKind::Notification,
			PushEvent::UnreadAntennaNote(_) => PushEventKind::UnreadAntennaNote,
			PushEvent::ReadAllNotifications => PushEventKind::ReadAllNotifications,
		}
	}

	/// JSON body as sent to clients, `None` for marker events
	pub fn to_body(&self) -> Option<serde_json::Value> {
		match self {
			PushEvent::Notification(body) => Some(body.clone()),
			PushEvent::UnreadAntennaNote(body) => serde_json::to_value(body).ok(),
			PushEvent::ReadAllNotifications => None,
		}
	}
}


// vim: ts=4
