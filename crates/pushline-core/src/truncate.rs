//! Payload shaping
//!
//! Push services cap the size of a single message, so embedded notes are reduced to a summary
//! before sending: the text is replaced by a bounded summary, content warning and nested
//! reply/renote objects are dropped, and the author is dropped where the notification itself
//! already identifies it.

use serde_json::{Map, Value};

use crate::summary::Summarizer;
use pushline_types::notification::{PushEvent, PushEventKind};

/// Shaped JSON body of `event`, or the original body for kinds that are not shaped
pub fn shape_event(event: &PushEvent, summarizer: &dyn Summarizer) -> Option<Value> {
	let body = event.to_body()?;
	match event.kind() {
		PushEventKind::Notification | PushEventKind::UnreadAntennaNote => {
			Some(truncate_body(event.kind(), &body, summarizer))
		}
		PushEventKind::ReadAllNotifications => Some(body),
	}
}

/// Reduces the note embedded in `body`. Non-object bodies are returned unchanged.
pub fn truncate_body(kind: PushEventKind, body: &Value, summarizer: &dyn Summarizer) -> Value {
	let Some(fields) = body.as_object() else {
		return body.clone();
	};
	let Some(note_value) = fields.get("note") else {
		return body.clone();
	};
	let Some(note) = note_value.as_object() else {
		return body.clone();
	};

	let is_renote = fields.get("type").and_then(Value::as_str) == Some("renote");
	let source = if is_renote {
		note.get("renote").filter(|renote| renote.is_object()).unwrap_or(note_value)
	} else {
		note_value
	};

	let mut shaped_note: Map<String, Value> = note.clone();
	shaped_note.insert("text".into(), Value::String(summarizer.summarize(source)));
	shaped_note.remove("cw");
	shaped_note.remove("reply");
	shaped_note.remove("renote");
	match kind {
		PushEventKind::Notification => {
			shaped_note.remove("user");
		}
		PushEventKind::UnreadAntennaNote | PushEventKind::ReadAllNotifications => {}
	}

	let mut shaped = fields.clone();
	shaped.insert("note".into(), Value::Object(shaped_note));
	Value::Object(shaped)
}


// vim: ts=4
