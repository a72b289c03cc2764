//! Note summaries for push payloads

use serde_json::Value;

/// Default upper bound of a summary, in characters
pub const DEFAULT_SUMMARY_CHARS: usize = 280;

/// Produces bounded plain text standing in for a packed note
pub trait Summarizer: Send + Sync {
	fn summarize(&self, note: &Value) -> String;
}

/// Summarizer following the usual note rendering rules
///
/// Deleted and hidden notes collapse to a marker. Otherwise the content warning wins over the
/// text, followed by attachment and poll markers and the summaries of an embedded reply and
/// renote.
#[derive(Debug, Clone)]
pub struct NoteSummarizer {
	pub max_chars: usize,
}

impl Default for NoteSummarizer {
	fn default() -> Self {
		Self { max_chars: DEFAULT_SUMMARY_CHARS }
	}
}

impl NoteSummarizer {
	fn summary_of(note: &Value) -> String {
		if note.get("deletedAt").is_some_and(|v| !v.is_null()) {
			return "(❌⛔)".into();
		}
		if note.get("isHidden").and_then(Value::as_bool).unwrap_or(false) {
			return "(⛔)".into();
		}

		let mut summary = String::new();
		match note.get("cw").and_then(Value::as_str) {
			Some(cw) => summary.push_str(cw),
			None => summary.push_str(note.get("text").and_then(Value::as_str).unwrap_or("")),
		}

		let files = note.get("files").and_then(Value::as_array).map_or(0, Vec::len);
		if files > 0 {
			summary.push_str(&format!(" (📎{})", files));
		}
		if note.get("poll").is_some_and(|v| !v.is_null()) {
			summary.push_str(" (📊)");
		}

		if has_id(note, "replyId") {
			match note.get("reply").filter(|v| v.is_object()) {
				Some(reply) => summary.push_str(&format!("\n\nRE: {}", Self::summary_of(reply))),
				None => summary.push_str("\n\nRE: ..."),
			}
		}
		if has_id(note, "renoteId") {
			match note.get("renote").filter(|v| v.is_object()) {
				Some(renote) => summary.push_str(&format!("\n\nRN: {}", Self::summary_of(renote))),
				None => summary.push_str("\n\nRN: ..."),
			}
		}

		summary.trim().to_string()
	}
}

fn has_id(note: &Value, field: &str) -> bool {
	note.get(field).and_then(Value::as_str).is_some_and(|id| !id.is_empty())
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with an ellipsis
pub fn bound_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	let mut bounded: String = text.chars().take(max_chars.saturating_sub(1)).collect();
	bounded.push('…');
	bounded
}

impl Summarizer for NoteSummarizer {
	fn summarize(&self, note: &Value) -> String {
		bound_chars(&Self::summary_of(note), self.max_chars)
	}
}


// vim: ts=4
